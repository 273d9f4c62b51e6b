//! Configuration errors.

/// Error raised when the search configuration makes the clock formulas
/// undefined.
///
/// Each variant names the offending field and carries the value that was
/// supplied. A target frequency that is valid but cannot be reached is not an
/// error; it simply produces no candidates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// The input frequency is zero, negative or not finite.
    #[error("invalid input_frequency {0}: must be a positive finite frequency in Hz")]
    InputFrequency(f64),
    /// The input pre-divider is zero or negative.
    #[error("invalid input_divider {0}: must be a positive integer")]
    InputDivider(i64),
    /// A target frequency is zero, negative or not finite.
    #[error("invalid target_frequency {0}: must be a positive finite frequency in Hz")]
    TargetFrequency(f64),
    /// The error threshold is zero, negative or not finite.
    #[error("invalid error_threshold {0}: must be a positive finite percentage")]
    ErrorThreshold(f64),
    /// The bit width is neither 16 nor 32.
    #[error("invalid bit_width {0}: must be 16 or 32")]
    BitWidth(u32),
}
