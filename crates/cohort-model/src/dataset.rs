//! Cohort dataset over a Polars `DataFrame`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{DatasetError, Result};
use crate::kind::ColumnKind;
use crate::polars::{column_f64, column_labels, is_numeric_dtype, parse_f64};

/// The level of a separator column that defines the reference group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceGroupKey {
    /// Label of the level.
    pub label: String,
    /// Rows carrying the level.
    pub count: usize,
}

impl fmt::Display for ReferenceGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A tabular cohort with a kind assigned to every column.
///
/// Kinds default to [`ColumnKind::from_dtype`] and can be overridden per
/// column with [`Dataset::with_kind`].
#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    kinds: Vec<(String, ColumnKind)>,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        let kinds = frame
            .get_columns()
            .iter()
            .map(|column| {
                (
                    column.name().to_string(),
                    ColumnKind::from_dtype(column.dtype()),
                )
            })
            .collect();
        Self { frame, kinds }
    }

    /// Overrides the inferred kind of one column.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::ColumnNotFound`] if the column does not exist.
    pub fn with_kind(mut self, column: &str, kind: ColumnKind) -> Result<Self> {
        let entry = self
            .kinds
            .iter_mut()
            .find(|(name, _)| name == column)
            .ok_or_else(|| DatasetError::ColumnNotFound {
                column: column.to_string(),
            })?;
        debug!(column, from = %entry.1, to = %kind, "column kind overridden");
        entry.1 = kind;
        Ok(self)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.kinds.iter().any(|(column, _)| column == name)
    }

    /// Looks up a column, failing with [`DatasetError::ColumnNotFound`].
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.frame
            .column(name)
            .map_err(|_| DatasetError::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// Column names with their kinds, in frame order.
    pub fn classification(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.kinds.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Names of the columns with the given kind, in frame order.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<&str> {
        self.classification()
            .filter(|(_, k)| *k == kind)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.classification()
            .find(|(column, _)| *column == name)
            .map(|(_, kind)| kind)
    }

    /// Whether the column is stored as integers or floats.
    pub fn is_numeric(&self, name: &str) -> Result<bool> {
        Ok(is_numeric_dtype(self.require_column(name)?.dtype()))
    }

    /// Per-row display labels; `None` marks a missing value.
    pub fn labels(&self, name: &str) -> Result<Vec<Option<String>>> {
        Ok(column_labels(self.require_column(name)?)?)
    }

    /// Per-row numeric values; nulls and NaN are `None`.
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        Ok(column_f64(self.require_column(name)?)?)
    }

    /// Distinct non-missing labels in ascending order.
    ///
    /// Numeric columns order by value, so `2` precedes `10`; other columns
    /// order lexicographically.
    pub fn levels(&self, name: &str) -> Result<Vec<String>> {
        if self.is_numeric(name)? {
            let mut values: Vec<f64> = self.numeric(name)?.into_iter().flatten().collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            return Ok(values.into_iter().map(crate::format_numeric).collect());
        }
        let levels: BTreeSet<String> = self.labels(name)?.into_iter().flatten().collect();
        Ok(levels.into_iter().collect())
    }

    /// Occurrences of each level, in level order.
    pub fn value_counts(&self, name: &str) -> Result<Vec<(String, usize)>> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for label in self.labels(name)?.into_iter().flatten() {
            *counts.entry(label).or_default() += 1;
        }
        Ok(self
            .levels(name)?
            .into_iter()
            .map(|level| {
                let count = counts.get(&level).copied().unwrap_or(0);
                (level, count)
            })
            .collect())
    }

    /// The most frequent non-missing level of a column.
    ///
    /// Ties go to the level that sorts first.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::EmptyColumn`] when every value is missing.
    pub fn reference_key(&self, name: &str) -> Result<ReferenceGroupKey> {
        let mut best: Option<(String, usize)> = None;
        for (level, count) in self.value_counts(name)? {
            if best.as_ref().is_none_or(|(_, top)| count > *top) {
                best = Some((level, count));
            }
        }
        best.map(|(label, count)| ReferenceGroupKey { label, count })
            .ok_or_else(|| DatasetError::EmptyColumn {
                column: name.to_string(),
            })
    }

    /// Reads `(duration, event observed)` pairs for every row.
    ///
    /// Durations must be present, finite and non-negative. Event indicators
    /// may be boolean, numeric 0/1, or the strings `0`, `1`, `true`, `false`.
    pub fn survival_observations(&self, duration: &str, event: &str) -> Result<Vec<(f64, bool)>> {
        let durations = self.numeric(duration)?;
        let events = self.events(event)?;

        durations
            .into_iter()
            .zip(events)
            .enumerate()
            .map(|(row, (value, observed))| {
                let value = value.ok_or_else(|| DatasetError::MissingValue {
                    column: duration.to_string(),
                    row,
                })?;
                if !value.is_finite() || value < 0.0 {
                    return Err(DatasetError::InvalidDuration {
                        column: duration.to_string(),
                        row,
                        value,
                    });
                }
                Ok((value, observed))
            })
            .collect()
    }

    fn events(&self, name: &str) -> Result<Vec<bool>> {
        let column = self.require_column(name)?;
        let missing = |row| DatasetError::MissingValue {
            column: name.to_string(),
            row,
        };
        let invalid = |row, value: String| DatasetError::InvalidEvent {
            column: name.to_string(),
            row,
            value,
        };

        if column.dtype() == &DataType::Boolean {
            return column
                .bool()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| value.ok_or_else(|| missing(row)))
                .collect();
        }

        if is_numeric_dtype(column.dtype()) {
            return column_f64(column)?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value {
                    None => Err(missing(row)),
                    Some(v) if v == 0.0 => Ok(false),
                    Some(v) if v == 1.0 => Ok(true),
                    Some(v) => Err(invalid(row, crate::format_numeric(v))),
                })
                .collect();
        }

        column_labels(column)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                let value = value.ok_or_else(|| missing(row))?;
                match value.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(true),
                    "false" => Ok(false),
                    other => match parse_f64(other) {
                        Some(v) if v == 0.0 => Ok(false),
                        Some(v) if v == 1.0 => Ok(true),
                        _ => Err(invalid(row, value)),
                    },
                }
            })
            .collect()
    }
}
