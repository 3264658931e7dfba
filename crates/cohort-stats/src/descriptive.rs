//! Descriptive statistics.

use serde::Serialize;

/// Arithmetic mean, or NaN for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (denominator `n - 1`), or NaN with fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let centre = mean(values);
    let squares: f64 = values.iter().map(|value| (value - centre).powi(2)).sum();
    squares / (values.len() - 1) as f64
}

/// Sample standard deviation (denominator `n - 1`).
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Round to a fixed number of decimal places, half away from zero.
///
/// Non-finite values pass through unchanged.
///
/// # Examples
///
/// ```
/// use cohort_stats::round_to;
///
/// assert_eq!(round_to(3.027_65, 2), 3.03);
/// assert_eq!(round_to(0.019_047_6, 4), 0.019);
/// ```
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10_f64.powi(places.min(15) as i32);
    (value * factor).round() / factor
}

/// Count, mean and standard deviation of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl SampleSummary {
    /// Summarize a sample. Mean is NaN when empty; standard deviation is NaN below two values.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            n: values.len(),
            mean: mean(values),
            std_dev: sample_std_dev(values),
        }
    }
}
