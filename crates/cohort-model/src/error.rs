//! Error types for cohort datasets.

use thiserror::Error;

/// Errors raised while reading columns out of a [`crate::Dataset`].
#[derive(Debug, Error)]
pub enum DatasetError {
    /// Column not found in the DataFrame.
    #[error("column '{column}' not found in DataFrame")]
    ColumnNotFound { column: String },

    /// Column has no non-missing values.
    #[error("column '{column}' has no non-missing values")]
    EmptyColumn { column: String },

    /// A required value is missing.
    #[error("column '{column}' is missing a value at row {row}")]
    MissingValue { column: String, row: usize },

    /// Durations must be finite and non-negative.
    #[error("column '{column}' has invalid duration {value} at row {row}")]
    InvalidDuration { column: String, row: usize, value: f64 },

    /// Event indicators must be boolean or 0/1.
    #[error("column '{column}' has invalid event indicator '{value}' at row {row}")]
    InvalidEvent {
        column: String,
        row: usize,
        value: String,
    },

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for DatasetError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
