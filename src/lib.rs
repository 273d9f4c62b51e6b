//! i2s-pll-calc computes settings for the PLLI2S and the I2S clock generator
//! of STM32F4 and STM32F7 microcontrollers. Given the oscillator frequency and
//! the PLLM pre-divider, it searches all the PLLI2SN, PLLI2SR, I2SDIV and ODD
//! register values and reports those that give an I2S sampling frequency close
//! enough to a standard audio rate.

#![warn(missing_docs)]

pub mod app;
pub mod args;
pub mod config;
pub mod error;
pub mod report;
pub mod search;
