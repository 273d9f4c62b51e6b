//! Search configuration.
//!
//! This module contains the [`SearchConfig`] record that holds every input of
//! a search, and the [`BitWidth`] of the I2S channel slots.

use crate::{
    error::DomainError,
    search::constants::{
        DEFAULT_ERROR_THRESHOLD, DEFAULT_INPUT_DIVIDER, DEFAULT_INPUT_FREQUENCY,
        STANDARD_SAMPLE_RATES,
    },
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// I2S channel length.
///
/// This corresponds to the CHLEN bit of the SPI_I2SCFGR register. It is
/// serialized as the number of bits (16 or 32).
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u32", into = "u32")]
pub enum BitWidth {
    /// 16 bits per channel (CHLEN = 0).
    Sixteen,
    /// 32 bits per channel (CHLEN = 1).
    ThirtyTwo,
}

impl BitWidth {
    /// All the channel lengths, in ascending order.
    pub const ALL: [BitWidth; 2] = [BitWidth::Sixteen, BitWidth::ThirtyTwo];

    /// Returns the value of the CHLEN bit for this channel length.
    pub fn channel_factor(self) -> u32 {
        match self {
            BitWidth::Sixteen => 0,
            BitWidth::ThirtyTwo => 1,
        }
    }

    /// Returns the number of bits per channel.
    pub fn bits(self) -> u32 {
        match self {
            BitWidth::Sixteen => 16,
            BitWidth::ThirtyTwo => 32,
        }
    }
}

impl TryFrom<u32> for BitWidth {
    type Error = DomainError;

    fn try_from(bits: u32) -> Result<BitWidth, DomainError> {
        match bits {
            16 => Ok(BitWidth::Sixteen),
            32 => Ok(BitWidth::ThirtyTwo),
            _ => Err(DomainError::BitWidth(bits)),
        }
    }
}

impl From<BitWidth> for u32 {
    fn from(width: BitWidth) -> u32 {
        width.bits()
    }
}

impl std::str::FromStr for BitWidth {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<BitWidth> {
        let bits: u32 = s
            .trim()
            .parse()
            .with_context(|| format!("bit width {s:?} is not an integer"))?;
        Ok(BitWidth::try_from(bits)?)
    }
}

impl std::fmt::Display for BitWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.bits())
    }
}

/// Search configuration.
///
/// The default configuration is a 12 MHz oscillator with a PLLM pre-divider
/// of 12, the nine standard audio rates, both channel lengths and a 0.002 %
/// acceptance threshold. Fields missing from a JSON configuration file take
/// their default values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Oscillator (HSE) frequency in Hz.
    pub input_frequency: f64,
    /// PLLM pre-divider.
    pub input_divider: i64,
    /// Sampling frequencies to search for, in Hz.
    ///
    /// The order of this list determines the order of the results. Repeated
    /// values are searched only once.
    pub target_frequencies: Vec<f64>,
    /// Channel lengths to search.
    ///
    /// This is treated as a set: results are always given in ascending order
    /// of bit width.
    pub bit_widths: Vec<BitWidth>,
    /// Relative error, in percent, below which a candidate is accepted.
    pub error_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> SearchConfig {
        SearchConfig {
            input_frequency: DEFAULT_INPUT_FREQUENCY,
            input_divider: DEFAULT_INPUT_DIVIDER,
            target_frequencies: STANDARD_SAMPLE_RATES.to_vec(),
            bit_widths: vec![BitWidth::Sixteen, BitWidth::ThirtyTwo],
            error_threshold: DEFAULT_ERROR_THRESHOLD,
        }
    }
}

impl SearchConfig {
    /// Reads a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<SearchConfig> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Checks that the configuration gives well-defined clock formulas.
    ///
    /// An empty list of targets or bit widths is valid and yields an empty
    /// search.
    pub fn validate(&self) -> Result<(), DomainError> {
        if !is_positive(self.input_frequency) {
            return Err(DomainError::InputFrequency(self.input_frequency));
        }
        if self.input_divider <= 0 {
            return Err(DomainError::InputDivider(self.input_divider));
        }
        if let Some(&freq) = self
            .target_frequencies
            .iter()
            .find(|&&freq| !is_positive(freq))
        {
            return Err(DomainError::TargetFrequency(freq));
        }
        if !is_positive(self.error_threshold) {
            return Err(DomainError::ErrorThreshold(self.error_threshold));
        }
        Ok(())
    }

    /// Returns the frequency at the input of the PLLI2S VCO, in Hz.
    pub fn vco_input_frequency(&self) -> f64 {
        self.input_frequency / self.input_divider as f64
    }
}

fn is_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}
