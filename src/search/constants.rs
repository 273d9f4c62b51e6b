//! I2S clock tree constants.
//!
//! This module contains constants that define the register field ranges and
//! physical limits of the PLLI2S and of the I2S clock generator found in the
//! STM32F4 and STM32F7 families (RM0090 sections 6.3.23 and 28.4.4, RM0385
//! sections 5.3.23 and 32.7.5).

use std::ops::RangeInclusive;

/// Valid values of the PLLI2SN multiplication factor.
pub const MULTIPLIER_RANGE: RangeInclusive<u32> = 50..=432;

/// Valid values of the PLLI2SR division factor.
pub const OUTPUT_DIVIDER_RANGE: RangeInclusive<u32> = 2..=7;

/// Values of the I2SDIV prescaler that are searched.
///
/// The register is 8 bits wide, but 0 and 1 are forbidden values and 255 is
/// left out of the search.
pub const FINE_DIVIDER_RANGE: RangeInclusive<u32> = 1..=254;

/// Values of the ODD prescaler bit.
pub const ODD_BITS: [u32; 2] = [0, 1];

/// Upper limit (exclusive) for the PLLI2S output clock, in Hz.
///
/// PLLI2SR must be chosen so that the clock fed to the I2S peripheral stays
/// strictly below this value.
pub const MAX_PLL_OUTPUT_CLOCK: f64 = 192e6;

/// Number of bit clocks per stereo frame in 16-bit mode.
///
/// A frame takes `BITS_PER_FRAME * (CHLEN + 1)` bit clocks.
pub const BITS_PER_FRAME: u32 = 32;

/// Default acceptance threshold for the relative error, in percent.
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.002;

/// Default oscillator (HSE) frequency, in Hz.
pub const DEFAULT_INPUT_FREQUENCY: f64 = 12e6;

/// Default PLLM pre-divider.
pub const DEFAULT_INPUT_DIVIDER: i64 = 12;

/// Standard audio sampling rates, in Hz.
pub const STANDARD_SAMPLE_RATES: [f64; 9] = [
    8_000.0, 11_025.0, 12_000.0, 16_000.0, 22_050.0, 24_000.0, 32_000.0, 44_100.0, 48_000.0,
];
