//! i2s-pll-calc application.
//!
//! This module contains a top-level structure [`App`] that represents a run of
//! the i2s-pll-calc application: it resolves the search configuration, runs
//! the search and writes the report.

use crate::{
    args::Args,
    config::SearchConfig,
    report::{self, Format},
    search::{self, AcceptedCandidate},
};
use anyhow::Result;
use std::io::Write;

/// i2s-pll-calc application.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    config: SearchConfig,
    format: Format,
    best: bool,
    parallel: bool,
}

impl App {
    /// Creates a new application.
    ///
    /// The search configuration is built from the defaults, then from the
    /// configuration file given in `args`, if any, and finally from the
    /// individual settings given in `args`. An error is returned if the file
    /// cannot be read or if the resulting configuration is invalid.
    #[tracing::instrument(name = "App::new", level = "debug")]
    pub fn new(args: &Args) -> Result<App> {
        let mut config = match &args.config {
            Some(path) => SearchConfig::from_json_file(path)?,
            None => SearchConfig::default(),
        };
        if let Some(input_frequency) = args.input_frequency {
            config.input_frequency = input_frequency;
        }
        if let Some(input_divider) = args.input_divider {
            config.input_divider = input_divider;
        }
        if let Some(targets) = &args.targets {
            config.target_frequencies.clone_from(targets);
        }
        if let Some(bit_widths) = &args.bit_widths {
            config.bit_widths.clone_from(bit_widths);
        }
        if let Some(error_threshold) = args.error_threshold {
            config.error_threshold = error_threshold;
        }
        config.validate()?;
        tracing::debug!(
            ?config,
            vco_input_frequency = config.vco_input_frequency(),
            "search configuration"
        );
        Ok(App {
            config,
            format: args.format,
            best: args.best,
            parallel: args.parallel,
        })
    }

    /// Returns the search configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs the search and returns the candidates to report.
    pub fn search(&self) -> Result<Vec<AcceptedCandidate>> {
        let found = if self.parallel {
            search::search_parallel(&self.config)?
        } else {
            search::search(&self.config)?
        };
        Ok(if self.best {
            search::best_per_target(&found)
        } else {
            found
        })
    }

    /// Runs the application, writing the report to `writer`.
    ///
    /// Nothing is written if the search fails.
    #[tracing::instrument(name = "App::run", level = "debug", skip_all)]
    pub fn run<W: Write>(&self, writer: W) -> Result<()> {
        let candidates = self.search()?;
        report::write(writer, self.format, &self.config, &candidates)
    }
}
