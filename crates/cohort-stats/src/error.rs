//! Error types for the statistical kernels.

use thiserror::Error;

/// Errors raised when a statistic cannot be computed from its inputs.
#[derive(Debug, Error)]
pub enum StatsError {
    /// A sample required by the computation has no values.
    #[error("sample '{sample}' is empty")]
    EmptySample { sample: &'static str },

    /// Not enough observations for the requested statistic.
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// The statistic's variance is zero, so the test is undefined.
    #[error("variance is zero; the test statistic is undefined")]
    ZeroVariance,

    /// An expected cell frequency of zero makes the chi-square statistic undefined.
    #[error("expected frequency is zero at row '{row}', column '{column}'")]
    ZeroExpectedFrequency { row: String, column: String },

    /// Odds ratios are only defined for 2x2 tables.
    #[error("odds ratio requires a 2x2 table, got {rows}x{columns}")]
    NotTwoByTwo { rows: usize, columns: usize },

    /// Durations must be finite and non-negative.
    #[error("invalid duration {value} at observation {index}")]
    InvalidDuration { index: usize, value: f64 },
}

/// Result type for statistical kernels.
pub type Result<T> = std::result::Result<T, StatsError>;
