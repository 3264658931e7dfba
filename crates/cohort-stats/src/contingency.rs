//! Contingency tables, the chi-square test of independence, and odds ratios.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::distribution::{chi_squared_sf, ln_binomial};
use crate::error::{Result, StatsError};

const BISECTION_STEPS: usize = 200;
const LOG_ODDS_LIMIT: f64 = 700.0;

/// A two-way table of counts with labelled rows and columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContingencyTable {
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    /// `counts[row][column]`
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    /// Build a table from explicit labels and counts.
    ///
    /// Rows shorter than the column count are padded with zeros.
    pub fn new(row_labels: Vec<String>, column_labels: Vec<String>, counts: Vec<Vec<u64>>) -> Self {
        let width = column_labels.len();
        let mut counts = counts;
        counts.resize(row_labels.len(), Vec::new());
        for row in &mut counts {
            row.resize(width, 0);
        }
        Self {
            row_labels,
            column_labels,
            counts,
        }
    }

    /// Cross-tabulate `(row, column)` label pairs against the given level orders.
    ///
    /// Pairs whose labels are not among the levels are ignored.
    pub fn tabulate<'a, I>(row_levels: Vec<String>, column_levels: Vec<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let row_index: HashMap<&str, usize> = row_levels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();
        let column_index: HashMap<&str, usize> = column_levels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i))
            .collect();

        let mut counts = vec![vec![0_u64; column_levels.len()]; row_levels.len()];
        for (row, column) in pairs {
            if let (Some(&r), Some(&c)) = (row_index.get(row), column_index.get(column)) {
                counts[r][c] += 1;
            }
        }

        Self {
            row_labels: row_levels,
            column_labels: column_levels,
            counts,
        }
    }

    /// Cross-tabulate label pairs with levels in lexicographic order.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        let rows: BTreeSet<&str> = pairs.iter().map(|(row, _)| *row).collect();
        let columns: BTreeSet<&str> = pairs.iter().map(|(_, column)| *column).collect();
        Self::tabulate(
            rows.into_iter().map(str::to_string).collect(),
            columns.into_iter().map(str::to_string).collect(),
            pairs,
        )
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.column_labels.len())
    }

    pub fn is_two_by_two(&self) -> bool {
        self.shape() == (2, 2)
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn column_totals(&self) -> Vec<u64> {
        (0..self.column_labels.len())
            .map(|c| self.counts.iter().map(|row| row[c]).sum())
            .collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    fn as_two_by_two(&self) -> Result<[[u64; 2]; 2]> {
        if !self.is_two_by_two() {
            let (rows, columns) = self.shape();
            return Err(StatsError::NotTwoByTwo { rows, columns });
        }
        Ok([
            [self.counts[0][0], self.counts[0][1]],
            [self.counts[1][0], self.counts[1][1]],
        ])
    }
}

/// Outcome of [`chi2_contingency`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chi2Result {
    pub statistic: f64,
    pub p_value: f64,
    pub dof: usize,
    pub expected: Vec<Vec<f64>>,
}

/// Pearson chi-square test of independence.
///
/// Expected frequencies come from the table margins. With one degree of
/// freedom and `yates` set, each observed count is moved up to 0.5 toward its
/// expected count before the statistic is computed. A table with zero
/// degrees of freedom yields a statistic of 0 and a p-value of 1.
///
/// # Errors
///
/// Returns [`StatsError::EmptySample`] for an empty table and
/// [`StatsError::ZeroExpectedFrequency`] when a row or column sums to zero.
pub fn chi2_contingency(table: &ContingencyTable, yates: bool) -> Result<Chi2Result> {
    let total = table.total();
    if total == 0 {
        return Err(StatsError::EmptySample {
            sample: "contingency table",
        });
    }
    let row_totals = table.row_totals();
    let column_totals = table.column_totals();
    let grand = total as f64;

    let expected: Vec<Vec<f64>> = row_totals
        .iter()
        .map(|&r| {
            column_totals
                .iter()
                .map(|&c| r as f64 * c as f64 / grand)
                .collect()
        })
        .collect();

    for (r, row) in expected.iter().enumerate() {
        if let Some(c) = row.iter().position(|&value| value == 0.0) {
            return Err(StatsError::ZeroExpectedFrequency {
                row: table.row_labels[r].clone(),
                column: table.column_labels[c].clone(),
            });
        }
    }

    let (rows, columns) = table.shape();
    let dof = (rows - 1) * (columns - 1);
    if dof == 0 {
        return Ok(Chi2Result {
            statistic: 0.0,
            p_value: 1.0,
            dof,
            expected,
        });
    }

    let correct = yates && dof == 1;
    let mut statistic = 0.0;
    for (observed_row, expected_row) in table.counts.iter().zip(&expected) {
        for (&observed, &expected) in observed_row.iter().zip(expected_row) {
            let mut observed = observed as f64;
            if correct {
                let gap = expected - observed;
                observed += gap.signum() * gap.abs().min(0.5);
            }
            statistic += (observed - expected).powi(2) / expected;
        }
    }

    Ok(Chi2Result {
        statistic,
        p_value: chi_squared_sf(statistic, dof as f64),
        dof,
        expected,
    })
}

/// Which odds-ratio estimate to compute for a 2x2 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OddsRatioKind {
    /// Conditional maximum likelihood estimate under the noncentral
    /// hypergeometric distribution.
    #[default]
    Conditional,
    /// Cross-product ratio `(a * d) / (b * c)`.
    Sample,
}

/// Odds ratio of a 2x2 table.
///
/// The conditional estimate is 0 when the top-left count sits at the lower
/// end of its support, infinite at the upper end, and NaN when any row or
/// column sums to zero.
///
/// # Errors
///
/// Returns [`StatsError::NotTwoByTwo`] for any other shape.
pub fn odds_ratio(table: &ContingencyTable, kind: OddsRatioKind) -> Result<f64> {
    let counts = table.as_two_by_two()?;
    Ok(match kind {
        OddsRatioKind::Sample => sample_odds_ratio(counts),
        OddsRatioKind::Conditional => conditional_odds_ratio(counts),
    })
}

fn sample_odds_ratio([[a, b], [c, d]]: [[u64; 2]; 2]) -> f64 {
    let numerator = a as f64 * d as f64;
    let denominator = b as f64 * c as f64;
    if denominator == 0.0 {
        if numerator == 0.0 { f64::NAN } else { f64::INFINITY }
    } else {
        numerator / denominator
    }
}

fn conditional_odds_ratio(counts: [[u64; 2]; 2]) -> f64 {
    let [[a, b], [c, d]] = counts;
    if a + b == 0 || c + d == 0 || a + c == 0 || b + d == 0 {
        return f64::NAN;
    }

    let x = a;
    let total = a + b + c + d;
    let first_row = a + b;
    let first_column = a + c;
    let lo = first_column.saturating_sub(total - first_row);
    let hi = first_row.min(first_column);
    if x == lo {
        return 0.0;
    }
    if x == hi {
        return f64::INFINITY;
    }

    // Log weights of the central hypergeometric pmf over the support.
    let support: Vec<(f64, f64)> = (lo..=hi)
        .map(|k| {
            (
                k as f64,
                ln_binomial(first_row, k) + ln_binomial(total - first_row, first_column - k),
            )
        })
        .collect();
    let target = x as f64;

    // Mean of the noncentral hypergeometric distribution at odds exp(log_odds).
    let mean_at = |log_odds: f64| -> f64 {
        let peak = support
            .iter()
            .map(|(k, weight)| weight + k * log_odds)
            .fold(f64::NEG_INFINITY, f64::max);
        let (weighted, normalizer) =
            support
                .iter()
                .fold((0.0, 0.0), |(weighted, normalizer), (k, weight)| {
                    let mass = (weight + k * log_odds - peak).exp();
                    (weighted + k * mass, normalizer + mass)
                });
        weighted / normalizer
    };

    // The mean is increasing in the log odds, so bisect.
    let mut low = -1.0;
    let mut high = 1.0;
    while mean_at(low) > target && low > -LOG_ODDS_LIMIT {
        low *= 2.0;
    }
    while mean_at(high) < target && high < LOG_ODDS_LIMIT {
        high *= 2.0;
    }
    for _ in 0..BISECTION_STEPS {
        let mid = (low + high) / 2.0;
        if mean_at(mid) < target {
            low = mid;
        } else {
            high = mid;
        }
    }
    ((low + high) / 2.0).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(counts: Vec<Vec<u64>>) -> ContingencyTable {
        let rows = (0..counts.len()).map(|i| format!("r{i}")).collect();
        let columns = (0..counts[0].len()).map(|i| format!("c{i}")).collect();
        ContingencyTable::new(rows, columns, counts)
    }

    #[test]
    fn test_tabulate_uses_level_order() {
        let pairs = [("M", "alive"), ("F", "dead"), ("M", "dead"), ("M", "alive")];
        let table = ContingencyTable::tabulate(
            vec!["M".into(), "F".into()],
            vec!["alive".into(), "dead".into()],
            pairs,
        );
        assert_eq!(table.counts, vec![vec![2, 1], vec![0, 1]]);
        assert_eq!(table.row_totals(), vec![3, 1]);
        assert_eq!(table.column_totals(), vec![2, 2]);
        assert_eq!(table.total(), 4);
    }

    #[test]
    fn test_from_pairs_sorts_levels() {
        let table = ContingencyTable::from_pairs([("b", "y"), ("a", "x")]);
        assert_eq!(table.row_labels, vec!["a", "b"]);
        assert_eq!(table.column_labels, vec!["x", "y"]);
    }

    #[test]
    fn test_chi2_without_correction() {
        let result = chi2_contingency(&table(vec![vec![10, 20], vec![30, 40]]), false).unwrap();
        let expected = 4.0 / 12.0 + 4.0 / 18.0 + 4.0 / 28.0 + 4.0 / 42.0;
        assert!((result.statistic - expected).abs() < 1e-12);
        assert_eq!(result.dof, 1);
        assert_eq!(result.expected[0], vec![12.0, 18.0]);
    }

    #[test]
    fn test_chi2_yates_correction() {
        let result = chi2_contingency(&table(vec![vec![10, 20], vec![30, 40]]), true).unwrap();
        let expected = 2.25 * (1.0 / 12.0 + 1.0 / 18.0 + 1.0 / 28.0 + 1.0 / 42.0);
        assert!((result.statistic - expected).abs() < 1e-12);

        // Deviations under 0.5 collapse to zero.
        let result = chi2_contingency(&table(vec![vec![2, 2], vec![4, 2]]), true).unwrap();
        assert!(result.statistic.abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_chi2_no_correction_above_one_dof() {
        let counts = vec![vec![5, 1], vec![1, 5], vec![3, 3]];
        let corrected = chi2_contingency(&table(counts.clone()), true).unwrap();
        let plain = chi2_contingency(&table(counts), false).unwrap();
        assert_eq!(corrected.dof, 2);
        assert_eq!(corrected.statistic, plain.statistic);
    }

    #[test]
    fn test_chi2_single_column_has_no_dof() {
        let result = chi2_contingency(&table(vec![vec![3], vec![4]]), true).unwrap();
        assert_eq!(result.dof, 0);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_chi2_zero_margin_is_error() {
        let err = chi2_contingency(&table(vec![vec![3, 0], vec![4, 0]]), true).unwrap_err();
        match err {
            StatsError::ZeroExpectedFrequency { row, column } => {
                assert_eq!(row, "r0");
                assert_eq!(column, "c1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sample_odds_ratio() {
        let table = table(vec![vec![6, 2], vec![1, 4]]);
        assert_eq!(odds_ratio(&table, OddsRatioKind::Sample).unwrap(), 12.0);
    }

    #[test]
    fn test_conditional_odds_ratio() {
        let balanced = table(vec![vec![5, 5], vec![5, 5]]);
        let estimate = odds_ratio(&balanced, OddsRatioKind::Conditional).unwrap();
        assert!((estimate - 1.0).abs() < 1e-9);

        let skewed = table(vec![vec![6, 2], vec![1, 4]]);
        let estimate = odds_ratio(&skewed, OddsRatioKind::Conditional).unwrap();
        assert!(estimate.is_finite() && estimate > 1.0);
    }

    #[test]
    fn test_conditional_odds_ratio_boundaries() {
        let at_upper = table(vec![vec![4, 0], vec![0, 4]]);
        assert_eq!(
            odds_ratio(&at_upper, OddsRatioKind::Conditional).unwrap(),
            f64::INFINITY
        );
        let at_lower = table(vec![vec![0, 4], vec![4, 0]]);
        assert_eq!(odds_ratio(&at_lower, OddsRatioKind::Conditional).unwrap(), 0.0);
        let empty_row = table(vec![vec![0, 0], vec![3, 4]]);
        assert!(odds_ratio(&empty_row, OddsRatioKind::Conditional).unwrap().is_nan());
    }

    #[test]
    fn test_odds_ratio_requires_two_by_two() {
        let err = odds_ratio(&table(vec![vec![1, 2, 3], vec![4, 5, 6]]), OddsRatioKind::Sample)
            .unwrap_err();
        assert!(matches!(err, StatsError::NotTwoByTwo { rows: 2, columns: 3 }));
    }
}
