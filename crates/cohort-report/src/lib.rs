//! Cohort reporting.
//!
//! Two reporters sit on top of a Polars `DataFrame`:
//!
//! - [`SurvivalCurveReporter`] fits Kaplan-Meier curves per level of a
//!   covariate, draws them onto a [`PlotSurface`], and runs pairwise log-rank
//!   tests between levels.
//! - [`GroupComparisonReporter`] builds "Table 1" style comparisons between a
//!   reference group and everyone else: mean ± sd with a two-sample test for
//!   continuous columns, counts and percentages with a chi-square test for
//!   categorical columns.
//!
//! # Example
//!
//! ```no_run
//! use cohort_report::{GroupComparisonReporter, SurvivalCurveReporter};
//! use polars::prelude::*;
//!
//! # fn main() -> cohort_report::Result<()> {
//! let frame = df! {
//!     "age" => [34.0, 45.0, 52.0, 61.0],
//!     "status" => ["alive", "alive", "dead", "dead"],
//!     "time" => [5.0, 8.0, 3.0, 4.0],
//!     "event" => [0, 1, 1, 1],
//! }?;
//!
//! let reporter = GroupComparisonReporter::new(frame.clone(), "status", &[])?;
//! println!("{}", reporter.demographic(None, false)?);
//!
//! let mut survival = SurvivalCurveReporter::new(frame, "time", "event")?;
//! survival.fit("status")?;
//! println!("{}", survival.print_logrank()?);
//! # Ok(())
//! # }
//! ```

pub mod comparison;
pub mod error;
pub mod logging;
pub mod options;
pub mod plot;
mod render;
pub mod survival;
pub mod table;

pub use comparison::GroupComparisonReporter;
pub use error::{ReportError, Result};
pub use options::{ComparisonOptions, LineStyleOverflow, PlotOptions, TwoSampleTest};
pub use plot::{ChartSurface, CurveStyle, LineStyle, PlotSurface, Rgb, render_svg};
pub use survival::{GroupCurve, LogRankComparison, LogRankSummary, SurvivalCurveReporter};
pub use table::{ComparisonRow, ComparisonTable, TableKind};
