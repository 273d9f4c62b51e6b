//! i2s-pll-calc CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the
//! i2s-pll-calc application. Every search setting is optional on the command
//! line and overrides the value from the configuration file, if one is given,
//! or the default configuration.

use crate::{config::BitWidth, report::Format};
use clap::Parser;
use std::path::PathBuf;

/// i2s-pll-calc CLI arguments.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file with the search configuration
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Oscillator (HSE) frequency in Hz [default: 12000000]
    #[clap(long, allow_negative_numbers = true)]
    pub input_frequency: Option<f64>,
    /// PLLM pre-divider [default: 12]
    #[clap(long, allow_negative_numbers = true)]
    pub input_divider: Option<i64>,
    /// Comma-separated list of target sampling frequencies in Hz
    /// [default: standard audio rates from 8000 to 48000]
    #[clap(long, value_delimiter = ',', num_args = 1.., allow_negative_numbers = true)]
    pub targets: Option<Vec<f64>>,
    /// Comma-separated list of channel lengths (16 or 32) [default: 16,32]
    #[clap(long, value_delimiter = ',', num_args = 1..)]
    pub bit_widths: Option<Vec<BitWidth>>,
    /// Relative error threshold in percent [default: 0.002]
    #[clap(long, allow_negative_numbers = true)]
    pub error_threshold: Option<f64>,
    /// Report format
    #[clap(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
    /// Only report the lowest error settings for each bit width and target
    #[clap(long)]
    pub best: bool,
    /// Run the search using multiple threads
    #[clap(long)]
    pub parallel: bool,
}
