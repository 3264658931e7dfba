//! Column classification.

use polars::prelude::DataType;
use serde::{Deserialize, Serialize};

use crate::polars::is_numeric_dtype;

/// How a column takes part in group comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Numeric values summarized by mean and standard deviation.
    Continuous,
    /// Discrete levels summarized by counts and percentages.
    Categorical,
    /// Neither; the column is skipped by both tables.
    Excluded,
}

impl ColumnKind {
    /// Classifies a column by its storage type.
    ///
    /// Integers and floats are continuous. Only declared categorical storage
    /// (`Categorical`, `Enum`) is categorical; plain strings, booleans, dates
    /// and nested types are excluded. Use [`crate::Dataset::with_kind`] to
    /// treat a string or boolean column as categorical.
    pub fn from_dtype(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            return Self::Continuous;
        }
        match dtype {
            DataType::Categorical(..) | DataType::Enum(..) => Self::Categorical,
            _ => Self::Excluded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Categorical => "categorical",
            Self::Excluded => "excluded",
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dtype() {
        assert_eq!(ColumnKind::from_dtype(&DataType::Int32), ColumnKind::Continuous);
        assert_eq!(ColumnKind::from_dtype(&DataType::Float64), ColumnKind::Continuous);
        assert_eq!(ColumnKind::from_dtype(&DataType::String), ColumnKind::Excluded);
        assert_eq!(ColumnKind::from_dtype(&DataType::Boolean), ColumnKind::Excluded);
        assert_eq!(
            ColumnKind::from_dtype(&DataType::List(Box::new(DataType::Int32))),
            ColumnKind::Excluded
        );
        assert_eq!(ColumnKind::from_dtype(&DataType::Null), ColumnKind::Excluded);
    }

    #[test]
    fn test_display() {
        assert_eq!(ColumnKind::Continuous.to_string(), "continuous");
        assert_eq!(ColumnKind::Excluded.to_string(), "excluded");
    }
}
