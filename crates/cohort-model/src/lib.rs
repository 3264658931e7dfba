//! Cohort dataset model.
//!
//! Wraps a Polars `DataFrame` with the column-level views the reporters need:
//! per-column kind classification, textual labels and numeric values, level
//! ordering, and reference-group selection.

pub mod dataset;
pub mod error;
pub mod kind;
pub mod polars;

pub use crate::polars::{format_numeric, parse_f64};
pub use dataset::{Dataset, ReferenceGroupKey};
pub use error::{DatasetError, Result};
pub use kind::ColumnKind;
