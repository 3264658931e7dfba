//! Two-sample location tests.
//!
//! Both tests are two-sided. The Mann-Whitney U test reports the U statistic
//! of the first sample; the t-test reports the t statistic of `x - y`.

use serde::{Deserialize, Serialize};

use crate::descriptive::{mean, sample_variance};
use crate::distribution::{normal_sf, students_t_two_sided};
use crate::error::{Result, StatsError};

/// Samples at or below this size are small enough for the exact U distribution.
const EXACT_SAMPLE_LIMIT: usize = 8;

/// Statistic and two-sided p-value of a hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// How the Mann-Whitney p-value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MannWhitneyMethod {
    /// Exact when either sample has at most eight values and there are no ties.
    #[default]
    Auto,
    /// Exact null distribution of U. Ties are ignored.
    Exact,
    /// Normal approximation with tie and continuity corrections.
    Asymptotic,
}

/// Two-sided Mann-Whitney U test.
///
/// # Errors
///
/// Returns [`StatsError::EmptySample`] when either sample is empty and
/// [`StatsError::ZeroVariance`] when every pooled value is tied under the
/// normal approximation.
pub fn mann_whitney_u(x: &[f64], y: &[f64], method: MannWhitneyMethod) -> Result<TestResult> {
    if x.is_empty() {
        return Err(StatsError::EmptySample { sample: "x" });
    }
    if y.is_empty() {
        return Err(StatsError::EmptySample { sample: "y" });
    }

    let n1 = x.len();
    let n2 = y.len();
    let pooled: Vec<f64> = x.iter().chain(y).copied().collect();
    let (ranks, tie_sizes) = average_ranks(&pooled);

    let n1f = n1 as f64;
    let n2f = n2 as f64;
    let rank_sum: f64 = ranks[..n1].iter().sum();
    let u1 = rank_sum - n1f * (n1f + 1.0) / 2.0;
    let u2 = n1f * n2f - u1;
    let u = u1.max(u2);

    let has_ties = tie_sizes.iter().any(|&size| size > 1);
    let exact = match method {
        MannWhitneyMethod::Auto => {
            (n1 <= EXACT_SAMPLE_LIMIT || n2 <= EXACT_SAMPLE_LIMIT) && !has_ties
        }
        MannWhitneyMethod::Exact => true,
        MannWhitneyMethod::Asymptotic => false,
    };

    let p_value = if exact {
        2.0 * exact_u_sf(u, n1, n2)
    } else {
        let n = (n1 + n2) as f64;
        let tie_term: f64 = tie_sizes
            .iter()
            .map(|&size| {
                let t = size as f64;
                t * t * t - t
            })
            .sum();
        let variance = n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)));
        if variance <= 0.0 {
            return Err(StatsError::ZeroVariance);
        }
        let z = (u - n1f * n2f / 2.0 - 0.5) / variance.sqrt();
        2.0 * normal_sf(z)
    };

    Ok(TestResult {
        statistic: u1,
        p_value: p_value.clamp(0.0, 1.0),
    })
}

/// Average ranks (1-based) of `values` and the sizes of each tie group.
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_sizes = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = rank;
        }
        tie_sizes.push(end - start);
        start = end;
    }
    (ranks, tie_sizes)
}

/// `P(U >= u)` under the exact null distribution.
fn exact_u_sf(u: f64, n1: usize, n2: usize) -> f64 {
    let frequencies = u_frequencies(n1, n2);
    let total: f64 = frequencies.iter().sum();
    let start = u.ceil().max(0.0) as usize;
    let tail: f64 = frequencies.iter().skip(start).sum();
    tail / total
}

/// Number of rank arrangements producing each value of U, indexed by U.
///
/// These are the coefficients of the Gaussian binomial `[m + n choose m]_q`,
/// built one factor `(1 - q^(n+i)) / (1 - q^i)` at a time. Terms above
/// degree `m * n` are truncated; the division only reads lower coefficients,
/// so truncation does not disturb the result.
fn u_frequencies(n1: usize, n2: usize) -> Vec<f64> {
    let m = n1.min(n2);
    let n = n1.max(n2);
    let max_u = m * n;
    let mut coefficients = vec![0.0; max_u + 1];
    coefficients[0] = 1.0;
    for i in 1..=m {
        let shift = n + i;
        if shift <= max_u {
            for k in (shift..=max_u).rev() {
                coefficients[k] -= coefficients[k - shift];
            }
        }
        for k in i..=max_u {
            coefficients[k] += coefficients[k - i];
        }
    }
    coefficients
}

/// Two-sided independent two-sample t-test.
///
/// With `equal_var` the pooled-variance Student test is used, otherwise
/// Welch's test with Welch-Satterthwaite degrees of freedom.
///
/// # Errors
///
/// Returns [`StatsError::EmptySample`] for an empty sample,
/// [`StatsError::InsufficientData`] when there are no degrees of freedom, and
/// [`StatsError::ZeroVariance`] when both samples are constant.
pub fn t_test(x: &[f64], y: &[f64], equal_var: bool) -> Result<TestResult> {
    if x.is_empty() {
        return Err(StatsError::EmptySample { sample: "x" });
    }
    if y.is_empty() {
        return Err(StatsError::EmptySample { sample: "y" });
    }
    let n1 = x.len() as f64;
    let n2 = y.len() as f64;

    let (standard_error, dof) = if equal_var {
        if x.len() + y.len() < 3 {
            return Err(StatsError::InsufficientData {
                needed: 3,
                got: x.len() + y.len(),
            });
        }
        let pooled = ((n1 - 1.0) * variance_or_zero(x) + (n2 - 1.0) * variance_or_zero(y))
            / (n1 + n2 - 2.0);
        ((pooled * (1.0 / n1 + 1.0 / n2)).sqrt(), n1 + n2 - 2.0)
    } else {
        if x.len() < 2 || y.len() < 2 {
            return Err(StatsError::InsufficientData {
                needed: 2,
                got: x.len().min(y.len()),
            });
        }
        let a = sample_variance(x) / n1;
        let b = sample_variance(y) / n2;
        let dof = (a + b).powi(2) / (a * a / (n1 - 1.0) + b * b / (n2 - 1.0));
        ((a + b).sqrt(), dof)
    };

    if standard_error == 0.0 || !standard_error.is_finite() {
        return Err(StatsError::ZeroVariance);
    }

    let statistic = (mean(x) - mean(y)) / standard_error;
    Ok(TestResult {
        statistic,
        p_value: students_t_two_sided(statistic, dof).clamp(0.0, 1.0),
    })
}

fn variance_or_zero(values: &[f64]) -> f64 {
    if values.len() < 2 {
        0.0
    } else {
        sample_variance(values)
    }
}
