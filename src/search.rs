//! PLLI2S parameter search.
//!
//! This module enumerates every combination of the PLLI2SN, PLLI2SR, I2SDIV
//! and ODD register fields, computes the resulting I2S sampling frequency and
//! keeps the combinations whose relative error with respect to a target
//! frequency is below a threshold.
//!
//! The I2S clock chain is
//!
//! ```text
//! FI2SxCLK = FIN / PLLM * PLLI2SN / PLLI2SR
//! Fs = FI2SxCLK / (32 * (CHLEN + 1) * (2 * I2SDIV + ODD))
//! ```
//!
//! where `FI2SxCLK` must stay below
//! [`MAX_PLL_OUTPUT_CLOCK`](constants::MAX_PLL_OUTPUT_CLOCK).

use crate::{
    config::{BitWidth, SearchConfig},
    error::DomainError,
};
use constants::{
    BITS_PER_FRAME, FINE_DIVIDER_RANGE, MAX_PLL_OUTPUT_CLOCK, MULTIPLIER_RANGE, ODD_BITS,
    OUTPUT_DIVIDER_RANGE,
};
use serde::Serialize;

pub mod constants;

/// Set of register values for the I2S clock chain.
#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct Candidate {
    /// Channel length.
    pub bit_width: BitWidth,
    /// Sampling frequency that is searched for, in Hz.
    pub target_frequency: f64,
    /// PLLI2SN multiplication factor.
    pub multiplier: u32,
    /// PLLI2SR division factor.
    pub output_divider: u32,
    /// I2SDIV linear prescaler.
    pub fine_divider: u32,
    /// ODD prescaler bit.
    pub odd: u32,
}

/// Candidate whose sampling frequency is within the error threshold.
#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct AcceptedCandidate {
    /// Register values.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// PLLI2S output clock (FI2SxCLK), in Hz.
    pub pll_output_clock: f64,
    /// Sampling frequency obtained with these register values, in Hz.
    pub achieved_frequency: f64,
    /// Relative error of the achieved frequency, in percent.
    pub relative_error_percent: f64,
}

/// Computes the PLLI2S output clock, in Hz.
///
/// The operations are done in the order in which the clock flows through the
/// pre-divider, the VCO and the output divider.
pub fn pll_output_clock(
    input_frequency: f64,
    input_divider: i64,
    multiplier: u32,
    output_divider: u32,
) -> f64 {
    input_frequency / input_divider as f64 * f64::from(multiplier) / f64::from(output_divider)
}

/// Computes the I2S sampling frequency produced from a PLLI2S output clock,
/// in Hz.
pub fn sampling_frequency(
    pll_output_clock: f64,
    bit_width: BitWidth,
    fine_divider: u32,
    odd: u32,
) -> f64 {
    let divisor = BITS_PER_FRAME * (bit_width.channel_factor() + 1) * (2 * fine_divider + odd);
    pll_output_clock / f64::from(divisor)
}

/// Computes the relative error of a frequency with respect to a target, in
/// percent.
pub fn relative_error_percent(achieved_frequency: f64, target_frequency: f64) -> f64 {
    (achieved_frequency - target_frequency).abs() / target_frequency * 100.0
}

// Portion of the search for a single channel length and target frequency.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Job {
    input_frequency: f64,
    input_divider: i64,
    error_threshold: f64,
    bit_width: BitWidth,
    target_frequency: f64,
}

impl Job {
    fn candidates(self) -> impl Iterator<Item = AcceptedCandidate> {
        MULTIPLIER_RANGE
            .flat_map(move |multiplier| {
                OUTPUT_DIVIDER_RANGE.filter_map(move |output_divider| {
                    let clock = pll_output_clock(
                        self.input_frequency,
                        self.input_divider,
                        multiplier,
                        output_divider,
                    );
                    // too fast for the I2S peripheral, whatever the prescaler
                    (clock < MAX_PLL_OUTPUT_CLOCK).then_some((multiplier, output_divider, clock))
                })
            })
            .flat_map(move |(multiplier, output_divider, clock)| {
                FINE_DIVIDER_RANGE
                    .flat_map(|fine_divider| {
                        ODD_BITS.into_iter().map(move |odd| (fine_divider, odd))
                    })
                    .filter_map(move |(fine_divider, odd)| {
                        let achieved_frequency =
                            sampling_frequency(clock, self.bit_width, fine_divider, odd);
                        let error =
                            relative_error_percent(achieved_frequency, self.target_frequency);
                        (error < self.error_threshold).then_some(AcceptedCandidate {
                            candidate: Candidate {
                                bit_width: self.bit_width,
                                target_frequency: self.target_frequency,
                                multiplier,
                                output_divider,
                                fine_divider,
                                odd,
                            },
                            pll_output_clock: clock,
                            achieved_frequency,
                            relative_error_percent: error,
                        })
                    })
            })
    }

    fn run(self) -> Vec<AcceptedCandidate> {
        let found = self.candidates().collect::<Vec<_>>();
        tracing::debug!(
            bit_width = %self.bit_width,
            target_frequency = self.target_frequency,
            found = found.len(),
            "searched target"
        );
        found
    }
}

// Bit widths are enumerated in ascending order and targets in the order of
// their first appearance, each one only once.
fn jobs(config: &SearchConfig) -> impl Iterator<Item = Job> + '_ {
    BitWidth::ALL
        .into_iter()
        .filter(move |bit_width| config.bit_widths.contains(bit_width))
        .flat_map(move |bit_width| {
            config
                .target_frequencies
                .iter()
                .enumerate()
                .filter(move |&(n, target)| !config.target_frequencies[..n].contains(target))
                .map(move |(_, &target_frequency)| Job {
                    input_frequency: config.input_frequency,
                    input_divider: config.input_divider,
                    error_threshold: config.error_threshold,
                    bit_width,
                    target_frequency,
                })
        })
}

/// Returns a lazy iterator over all the accepted candidates.
///
/// The candidates are produced in enumeration order: by ascending bit width,
/// by target frequency in the order in which they appear in `config`, and
/// then by ascending multiplier, output divider, fine divider and odd bit.
/// Repeated bit widths and target frequencies are searched only once.
///
/// The configuration is not validated. Use [`search`] unless `config` is known
/// to be valid.
pub fn candidates(config: &SearchConfig) -> impl Iterator<Item = AcceptedCandidate> + '_ {
    jobs(config).flat_map(Job::candidates)
}

/// Searches for all the candidates that meet the error threshold.
///
/// The configuration is validated before the search starts, and a
/// [`DomainError`] is returned if it is invalid. Otherwise the accepted
/// candidates are returned in the same order as [`candidates`].
///
/// # Examples
/// ```
/// use i2s_pll_calc::{config::{BitWidth, SearchConfig}, search::search};
/// let config = SearchConfig {
///     target_frequencies: vec![48e3],
///     bit_widths: vec![BitWidth::Sixteen],
///     ..Default::default()
/// };
/// let found = search(&config).unwrap();
/// assert_eq!(found[0].candidate.multiplier, 192);
/// ```
#[tracing::instrument(level = "debug", skip_all)]
pub fn search(config: &SearchConfig) -> Result<Vec<AcceptedCandidate>, DomainError> {
    config.validate()?;
    let found = jobs(config).flat_map(Job::run).collect::<Vec<_>>();
    tracing::info!(found = found.len(), "search finished");
    Ok(found)
}

/// Searches for all the candidates that meet the error threshold using
/// multiple threads.
///
/// The work is split by bit width and target frequency among at most as many
/// threads as [`std::thread::available_parallelism`] reports. The result is
/// identical to that of [`search`].
#[tracing::instrument(level = "debug", skip_all)]
pub fn search_parallel(config: &SearchConfig) -> Result<Vec<AcceptedCandidate>, DomainError> {
    config.validate()?;
    let workers = std::thread::available_parallelism().map_or(1, |n| n.get());
    let found = run_jobs(&jobs(config).collect::<Vec<_>>(), workers);
    tracing::info!(found = found.len(), workers, "search finished");
    Ok(found)
}

fn worker_chunk_len(num_jobs: usize, workers: usize) -> usize {
    num_jobs.div_ceil(workers.max(1)).max(1)
}

fn run_jobs(jobs: &[Job], workers: usize) -> Vec<AcceptedCandidate> {
    std::thread::scope(|scope| {
        let handles = jobs
            .chunks(worker_chunk_len(jobs.len(), workers))
            .map(|chunk| {
                scope.spawn(move || chunk.iter().flat_map(|job| job.run()).collect::<Vec<_>>())
            })
            .collect::<Vec<_>>();
        // chunks are contiguous and joined in spawn order, so the output keeps
        // the enumeration order
        handles
            .into_iter()
            .flat_map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect::<Vec<AcceptedCandidate>>()
    })
}

/// Keeps only the lowest error candidate for each bit width and target
/// frequency.
///
/// `candidates` must be in enumeration order, as returned by [`search`], where
/// the candidates of each bit width and target frequency are contiguous. Ties
/// are resolved in favour of the candidate that appears first.
pub fn best_per_target(candidates: &[AcceptedCandidate]) -> Vec<AcceptedCandidate> {
    candidates
        .chunk_by(|a, b| {
            a.candidate.bit_width == b.candidate.bit_width
                && a.candidate.target_frequency == b.candidate.target_frequency
        })
        .filter_map(|group| {
            group.iter().copied().reduce(|best, c| {
                if c.relative_error_percent < best.relative_error_percent {
                    c
                } else {
                    best
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    fn config_48k() -> SearchConfig {
        SearchConfig {
            input_frequency: 12e6,
            input_divider: 12,
            target_frequencies: vec![48e3],
            bit_widths: vec![BitWidth::Sixteen],
            ..Default::default()
        }
    }

    #[test]
    fn formulas() {
        let clock = pll_output_clock(12e6, 12, 192, 5);
        assert_eq!(clock, 38.4e6);
        assert_eq!(sampling_frequency(clock, BitWidth::Sixteen, 12, 1), 48e3);
        assert_eq!(sampling_frequency(clock, BitWidth::ThirtyTwo, 12, 1), 24e3);
        assert_eq!(relative_error_percent(48e3, 48e3), 0.0);
        assert!((relative_error_percent(48.048e3, 48e3) - 0.1).abs() < 1e-9);
        assert!((relative_error_percent(47.952e3, 48e3) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn finds_48k() {
        let found = search(&config_48k()).unwrap();
        assert_eq!(found.len(), 2);
        let first = found[0];
        assert_eq!(
            first.candidate,
            Candidate {
                bit_width: BitWidth::Sixteen,
                target_frequency: 48e3,
                multiplier: 192,
                output_divider: 5,
                fine_divider: 12,
                odd: 1,
            }
        );
        assert!(relative_error_percent(first.achieved_frequency, 48e3) < 0.002);
        assert_eq!(found[1].candidate.multiplier, 384);
        assert_eq!(found[1].candidate.fine_divider, 25);
        assert_eq!(found[1].candidate.odd, 0);
    }

    #[test]
    fn invariants() {
        let config = SearchConfig::default();
        let found = search(&config).unwrap();
        assert!(!found.is_empty());
        for c in &found {
            assert!(c.relative_error_percent < config.error_threshold);
            assert!(c.pll_output_clock < MAX_PLL_OUTPUT_CLOCK);
            assert!(MULTIPLIER_RANGE.contains(&c.candidate.multiplier));
            assert!(OUTPUT_DIVIDER_RANGE.contains(&c.candidate.output_divider));
            assert!(FINE_DIVIDER_RANGE.contains(&c.candidate.fine_divider));
            assert!(ODD_BITS.contains(&c.candidate.odd));
        }
    }

    #[test]
    fn pll_limit_is_exclusive() {
        // 1 MHz * 384 / 2 is exactly 192 MHz and would give 48 kHz exactly
        // with I2SDIV = 62 and ODD = 1, but it is not below the PLL limit
        let found = search(&config_48k()).unwrap();
        assert!(!found
            .iter()
            .any(|c| c.candidate.multiplier == 384 && c.candidate.output_divider == 2));
    }

    #[test]
    fn unreachable_target() {
        let config = SearchConfig {
            target_frequencies: vec![1.0],
            ..config_48k()
        };
        assert_eq!(search(&config), Ok(Vec::new()));
    }

    #[test]
    fn zero_divider() {
        let config = SearchConfig {
            input_divider: 0,
            ..config_48k()
        };
        assert_eq!(search(&config), Err(DomainError::InputDivider(0)));
        assert_eq!(search_parallel(&config), Err(DomainError::InputDivider(0)));
    }

    #[test]
    fn lazy_matches_search() {
        let config = config_48k();
        let lazy = candidates(&config).collect::<Vec<_>>();
        assert_eq!(lazy, search(&config).unwrap());
    }

    #[test]
    fn parallel_matches_search() {
        let config = SearchConfig {
            target_frequencies: vec![44.1e3, 8e3, 48e3],
            ..Default::default()
        };
        assert_eq!(search_parallel(&config), search(&config));
    }

    #[test]
    fn repeated_bit_widths_and_targets() {
        let config = SearchConfig {
            target_frequencies: vec![48e3, 44.1e3, 48e3],
            bit_widths: vec![BitWidth::ThirtyTwo, BitWidth::Sixteen, BitWidth::Sixteen],
            ..Default::default()
        };
        let unique = SearchConfig {
            target_frequencies: vec![48e3, 44.1e3],
            bit_widths: vec![BitWidth::Sixteen, BitWidth::ThirtyTwo],
            ..Default::default()
        };
        let found = search(&config).unwrap();
        assert_eq!(found, search(&unique).unwrap());
        assert_eq!(found[0].candidate.bit_width, BitWidth::Sixteen);
        assert_eq!(search_parallel(&config).unwrap(), found);

        let best = best_per_target(&found);
        assert_eq!(best.len(), 4);
        assert_eq!(
            best.iter()
                .map(|c| (c.candidate.bit_width, c.candidate.target_frequency))
                .collect::<Vec<_>>(),
            [
                (BitWidth::Sixteen, 48e3),
                (BitWidth::Sixteen, 44.1e3),
                (BitWidth::ThirtyTwo, 48e3),
                (BitWidth::ThirtyTwo, 44.1e3),
            ]
        );
    }

    #[test]
    fn repeated_target_best() {
        let config = SearchConfig {
            target_frequencies: vec![48e3, 48e3],
            ..config_48k()
        };
        let found = search(&config).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(best_per_target(&found).len(), 1);
    }

    #[test]
    fn worker_chunks() {
        assert_eq!(worker_chunk_len(18, 4), 5);
        assert_eq!(worker_chunk_len(4, 8), 1);
        assert_eq!(worker_chunk_len(0, 4), 1);
        assert_eq!(worker_chunk_len(7, 0), 7);
        for (num_jobs, workers) in [(18, 4), (1000, 8), (3, 16), (9, 9)] {
            let chunk_len = worker_chunk_len(num_jobs, workers);
            assert!(num_jobs.div_ceil(chunk_len) <= workers);
        }
    }

    #[test]
    fn run_jobs_keeps_order() {
        let config = SearchConfig {
            target_frequencies: vec![8e3, 11.025e3, 44.1e3],
            ..Default::default()
        };
        let jobs = jobs(&config).collect::<Vec<_>>();
        assert_eq!(jobs.len(), 6);
        let expected = search(&config).unwrap();
        for workers in [1, 2, 4, 16] {
            assert_eq!(run_jobs(&jobs, workers), expected);
        }
    }

    #[test]
    fn best() {
        let config = SearchConfig {
            target_frequencies: vec![8e3, 44.1e3],
            bit_widths: vec![BitWidth::Sixteen, BitWidth::ThirtyTwo],
            ..Default::default()
        };
        let found = search(&config).unwrap();
        let best = best_per_target(&found);
        assert_eq!(best.len(), 4);
        // exact solutions exist for 8 kHz, so the first exact one is kept
        assert_eq!(best[0].candidate.multiplier, 64);
        assert_eq!(best[0].candidate.output_divider, 2);
        assert_eq!(best[0].relative_error_percent, 0.0);
        for b in &best {
            assert!(found
                .iter()
                .filter(|c| c.candidate.bit_width == b.candidate.bit_width
                    && c.candidate.target_frequency == b.candidate.target_frequency)
                .all(|c| c.relative_error_percent >= b.relative_error_percent));
        }
        assert!(best_per_target(&[]).is_empty());
    }
}
