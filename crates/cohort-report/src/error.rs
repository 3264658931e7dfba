//! Error types for cohort reporting.

use cohort_model::DatasetError;
use cohort_stats::StatsError;
use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    // === Input Errors ===
    /// Column lookup or value extraction failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// A statistic could not be computed for one variable.
    #[error("statistics failed for '{variable}': {source}")]
    Statistics {
        variable: String,
        #[source]
        source: StatsError,
    },

    // === Reporter State Errors ===
    /// Plotting or log-rank testing was requested before `fit`.
    #[error("no covariate fitted; call fit() first")]
    NotFitted,

    /// More groups than distinct line styles.
    #[error("{groups} groups exceed the {styles} available line styles")]
    TooManyGroups { groups: usize, styles: usize },

    // === Output Errors ===
    /// The drawing backend failed.
    #[error("plotting failed: {message}")]
    Plot { message: String },

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    /// Failed JSON serialization.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<polars::prelude::PolarsError> for ReportError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl ReportError {
    /// Wraps a kernel error with the variable it was computed for.
    pub(crate) fn statistics(variable: impl Into<String>) -> impl FnOnce(StatsError) -> Self {
        let variable = variable.into();
        move |source| Self::Statistics { variable, source }
    }
}

/// Result type for reporting operations.
pub type Result<T> = std::result::Result<T, ReportError>;
