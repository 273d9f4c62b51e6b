//! Search reports.
//!
//! This module formats the accepted candidates either as text meant to be
//! pasted into a C table of PLLI2S settings, or as JSON.

use crate::{config::SearchConfig, search::AcceptedCandidate};
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Report format.
#[derive(clap::ValueEnum, Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum Format {
    /// One line per candidate, laid out as a C initializer.
    #[default]
    Text,
    /// JSON object with the configuration and the list of candidates.
    Json,
}

/// Formats a candidate as a line of the text report.
///
/// The line lists the bit width, the target frequency, PLLI2SN and PLLI2SR as
/// C initializer values, followed by a comment with I2SDIV, ODD and the error.
///
/// # Examples
/// ```
/// use i2s_pll_calc::{config::SearchConfig, report::ReportLine, search::search};
/// let config = SearchConfig { target_frequencies: vec![48e3], ..Default::default() };
/// let found = search(&config).unwrap();
/// assert_eq!(
///     ReportLine(&found[0]).to_string(),
///     "16, 48000, 192, 5, /* i2sdiv: 12, odd: 1, error%: 0.0000 */"
/// );
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ReportLine<'a>(pub &'a AcceptedCandidate);

impl std::fmt::Display for ReportLine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        let c = &self.0.candidate;
        write!(
            f,
            "{}, {}, {}, {}, /* i2sdiv: {}, odd: {}, error%: {:.4} */",
            c.bit_width,
            c.target_frequency,
            c.multiplier,
            c.output_divider,
            c.fine_divider,
            c.odd,
            self.0.relative_error_percent
        )
    }
}

/// Writes the text report.
///
/// The report starts with a header giving the input frequency and the PLLM
/// pre-divider, followed by an empty line and one line per candidate.
pub fn write_text<W: Write>(
    mut writer: W,
    config: &SearchConfig,
    candidates: &[AcceptedCandidate],
) -> Result<()> {
    writeln!(writer, "input frequency: {} Hz", config.input_frequency)?;
    writeln!(writer, "PLLM: {}", config.input_divider)?;
    writeln!(writer)?;
    for candidate in candidates {
        writeln!(writer, "{}", ReportLine(candidate))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize, Debug)]
struct JsonReport<'a> {
    config: &'a SearchConfig,
    candidates: &'a [AcceptedCandidate],
}

/// Writes the JSON report.
pub fn write_json<W: Write>(
    mut writer: W,
    config: &SearchConfig,
    candidates: &[AcceptedCandidate],
) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, &JsonReport { config, candidates })?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes a report in the given format.
pub fn write<W: Write>(
    writer: W,
    format: Format,
    config: &SearchConfig,
    candidates: &[AcceptedCandidate],
) -> Result<()> {
    match format {
        Format::Text => write_text(writer, config, candidates),
        Format::Json => write_json(writer, config, candidates),
    }
}
