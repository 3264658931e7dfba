//! Statistical kernels for cohort reporting.
//!
//! Pure functions over `f64` slices and count tables. Nothing in this crate
//! knows about DataFrames; the model and report crates feed it plain values.
//!
//! - [`distribution`]: special functions and distribution tails
//! - [`descriptive`]: mean, standard deviation, rounding
//! - [`testing`]: Mann-Whitney U and t-tests
//! - [`contingency`]: chi-square test of independence and odds ratios
//! - [`survival`]: Kaplan-Meier estimator and log-rank test

pub mod contingency;
pub mod descriptive;
pub mod distribution;
pub mod error;
pub mod survival;
pub mod testing;

pub use contingency::{Chi2Result, ContingencyTable, OddsRatioKind, chi2_contingency, odds_ratio};
pub use descriptive::{SampleSummary, round_to};
pub use error::{Result, StatsError};
pub use survival::{KaplanMeierCurve, Observation, log_rank_test};
pub use testing::{MannWhitneyMethod, TestResult, mann_whitney_u, t_test};
