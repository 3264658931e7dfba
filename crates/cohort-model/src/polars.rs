//! Polars column utility functions.
//!
//! Helpers for reading a `Column` as optional labels or optional floats, and
//! for printing numbers without unnecessary trailing zeros.

use polars::prelude::*;

/// Formats a floating-point number as a string without trailing zeros.
///
/// NaN prints as `NaN` and infinities as `inf`/`-inf`.
///
/// # Examples
///
/// ```
/// use cohort_model::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(1.5), "1.5");
/// assert_eq!(format_numeric(100.0), "100");
/// assert_eq!(format_numeric(-0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let s = format!("{v}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Whether a dtype stores plain integers or floats.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Reads a numeric column as `f64`. Nulls and NaN become `None`.
pub fn column_f64(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect())
}

/// Reads any column as display labels.
///
/// Numeric values go through [`format_numeric`] so `2.0` and `2` share a
/// label; everything else is cast to Polars' string representation.
pub fn column_labels(column: &Column) -> PolarsResult<Vec<Option<String>>> {
    if is_numeric_dtype(column.dtype()) {
        return Ok(column_f64(column)?
            .into_iter()
            .map(|value| value.map(format_numeric))
            .collect());
    }
    let cast = column.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}
