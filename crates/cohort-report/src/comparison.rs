//! "Table 1" comparisons of a reference group against the rest of a cohort.

use polars::prelude::*;
use tracing::{debug, info, info_span, trace, warn};

use cohort_model::{ColumnKind, Dataset, ReferenceGroupKey, format_numeric};
use cohort_stats::{
    ContingencyTable, SampleSummary, TestResult, chi2_contingency, mann_whitney_u, odds_ratio,
    round_to, t_test,
};

use crate::error::{ReportError, Result};
use crate::logging::redact_value;
use crate::options::{ComparisonOptions, TwoSampleTest};
use crate::table::{ComparisonRow, ComparisonTable, TableKind};

/// Builds comparison tables split by a target column.
///
/// Columns are classified once at construction. The target and identifier
/// columns are never summarized; columns whose storage type is neither
/// numeric nor declared categorical are left out of both tables. A
/// continuous separator still gets its own `demographic` row.
#[derive(Debug, Clone)]
pub struct GroupComparisonReporter {
    dataset: Dataset,
    target: String,
    id_columns: Vec<String>,
    continuous: Vec<String>,
    categorical: Vec<String>,
}

impl GroupComparisonReporter {
    /// Creates a reporter over a `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`cohort_model::DatasetError::ColumnNotFound`] if the
    /// target or an identifier column is missing.
    pub fn new(frame: DataFrame, target: &str, id_columns: &[&str]) -> Result<Self> {
        Self::from_dataset(Dataset::new(frame), target, id_columns)
    }

    /// Creates a reporter over a dataset whose column kinds may have been overridden.
    pub fn from_dataset(dataset: Dataset, target: &str, id_columns: &[&str]) -> Result<Self> {
        dataset.require_column(target)?;
        for column in id_columns {
            dataset.require_column(column)?;
        }

        let mut continuous = Vec::new();
        let mut categorical = Vec::new();
        for (name, kind) in dataset.classification() {
            if name == target || id_columns.contains(&name) {
                continue;
            }
            match kind {
                ColumnKind::Continuous => continuous.push(name.to_string()),
                ColumnKind::Categorical => categorical.push(name.to_string()),
                ColumnKind::Excluded => {
                    warn!(column = name, "column is neither numeric nor declared categorical; excluded");
                }
            }
        }
        debug!(
            target,
            continuous = continuous.len(),
            categorical = categorical.len(),
            "columns classified"
        );

        Ok(Self {
            dataset,
            target: target.to_string(),
            id_columns: id_columns.iter().map(|c| (*c).to_string()).collect(),
            continuous,
            categorical,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn id_columns(&self) -> &[String] {
        &self.id_columns
    }

    /// Columns summarized by [`Self::demographic`], in frame order.
    pub fn continuous_columns(&self) -> &[String] {
        &self.continuous
    }

    /// Columns summarized by [`Self::chi_square`], in frame order.
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical
    }

    /// Most frequent level of the separator (the target when `None`).
    pub fn reference_key(&self, separator: Option<&str>) -> Result<ReferenceGroupKey> {
        let separator = separator.unwrap_or(&self.target);
        Ok(self.dataset.reference_key(separator)?)
    }

    /// Continuous-column table with Mann-Whitney U, or Student's t when `use_ttest`.
    ///
    /// # Errors
    ///
    /// Fails if the separator is missing or a test cannot be computed for some
    /// column; the error names that column.
    pub fn demographic(&self, separator: Option<&str>, use_ttest: bool) -> Result<ComparisonTable> {
        let test = if use_ttest {
            TwoSampleTest::StudentT
        } else {
            TwoSampleTest::MannWhitneyU
        };
        let options = ComparisonOptions::new()
            .with_separator(separator.map(str::to_string))
            .with_test(test);
        self.demographic_with(&options)
    }

    /// Continuous-column table with full control over tests and precision.
    pub fn demographic_with(&self, options: &ComparisonOptions) -> Result<ComparisonTable> {
        let separator = options.separator.as_deref().unwrap_or(&self.target);
        let span = info_span!("demographic", separator, test = ?options.test);
        let _guard = span.enter();

        let key = self.dataset.reference_key(separator)?;
        let groups = self.dataset.labels(separator)?;
        let mut table = ComparisonTable::new(TableKind::Continuous, separator, key.label.as_str());

        for column in &self.continuous {
            let mut reference = Vec::new();
            let mut other = Vec::new();
            for (value, group) in self.dataset.numeric(column)?.into_iter().zip(&groups) {
                let Some(value) = value else { continue };
                if group.as_deref() == Some(key.label.as_str()) {
                    reference.push(value);
                } else {
                    other.push(value);
                }
            }
            let total: Vec<f64> = reference.iter().chain(&other).copied().collect();

            let result = two_sample_test(&reference, &other, options)
                .map_err(ReportError::statistics(column.as_str()))?;
            debug!(
                column = column.as_str(),
                n_reference = reference.len(),
                n_other = other.len(),
                p_value = result.p_value,
                "continuous column compared"
            );

            let precision = options.summary_precision;
            table.rows.push(ComparisonRow {
                variable: column.clone(),
                total: summary_cell(&total, precision),
                reference: summary_cell(&reference, precision),
                other: summary_cell(&other, precision),
                chi_square: None,
                odds_ratio: None,
                p_value: round_to(result.p_value, options.p_value_precision),
            });
        }

        info!(rows = table.len(), "demographic table built");
        Ok(table)
    }

    /// Categorical-column table with chi-square tests and 2x2 odds ratios.
    ///
    /// # Errors
    ///
    /// Fails if the separator is missing or a contingency table is degenerate;
    /// the error names the column.
    pub fn chi_square(&self, separator: Option<&str>) -> Result<ComparisonTable> {
        let options = ComparisonOptions::new().with_separator(separator.map(str::to_string));
        self.chi_square_with(&options)
    }

    /// Categorical-column table with full control over corrections and precision.
    pub fn chi_square_with(&self, options: &ComparisonOptions) -> Result<ComparisonTable> {
        let separator = options.separator.as_deref().unwrap_or(&self.target);
        let span = info_span!("chi_square", separator);
        let _guard = span.enter();

        let key = self.dataset.reference_key(separator)?;
        let groups = self.dataset.labels(separator)?;
        let separator_levels = self.dataset.levels(separator)?;
        let mut table = ComparisonTable::new(TableKind::Categorical, separator, key.label.as_str());

        for column in self.categorical.iter().filter(|c| c.as_str() != separator) {
            let values = self.dataset.labels(column)?;
            let pairs: Vec<(&str, &str)> = values
                .iter()
                .zip(&groups)
                .filter_map(|(value, group)| Some((value.as_deref()?, group.as_deref()?)))
                .collect();

            let rows: Vec<String> = self
                .dataset
                .levels(column)?
                .into_iter()
                .filter(|level| pairs.iter().any(|(value, _)| *value == level.as_str()))
                .collect();
            let columns: Vec<String> = separator_levels
                .iter()
                .filter(|level| pairs.iter().any(|(_, group)| *group == level.as_str()))
                .cloned()
                .collect();
            let cross = ContingencyTable::tabulate(rows, columns, pairs.iter().copied());

            let chi2 = chi2_contingency(&cross, options.yates_correction)
                .map_err(ReportError::statistics(column.as_str()))?;
            let ratio = if cross.is_two_by_two() {
                let ratio = odds_ratio(&cross, options.odds_ratio)
                    .map_err(ReportError::statistics(column.as_str()))?;
                Some(round_to(ratio, options.odds_ratio_precision))
            } else {
                None
            };
            debug!(
                column = column.as_str(),
                shape = ?cross.shape(),
                p_value = chi2.p_value,
                "categorical column compared"
            );

            let reference_index = cross.column_labels.iter().position(|c| *c == key.label);
            let reference_total = reference_index.map_or(0, |i| cross.column_totals()[i]);
            let grand_total = cross.total();
            let other_total = grand_total - reference_total;

            for (level, counts) in cross.row_labels.iter().zip(&cross.counts) {
                trace!(column = column.as_str(), level = redact_value(level), "level counted");
                let total: u64 = counts.iter().sum();
                let reference = reference_index.map_or(0, |i| counts[i]);
                let other = total - reference;
                let places = options.percent_precision;
                table.rows.push(ComparisonRow {
                    variable: format!("{column} - {level}"),
                    total: count_cell(total, grand_total, places),
                    reference: count_cell(reference, reference_total, places),
                    other: count_cell(other, other_total, places),
                    chi_square: Some(round_to(chi2.statistic, options.statistic_precision)),
                    odds_ratio: ratio,
                    p_value: round_to(chi2.p_value, options.p_value_precision),
                });
            }
        }

        info!(rows = table.len(), "chi-square table built");
        Ok(table)
    }
}

fn two_sample_test(
    reference: &[f64],
    other: &[f64],
    options: &ComparisonOptions,
) -> cohort_stats::Result<TestResult> {
    match options.test {
        TwoSampleTest::MannWhitneyU => mann_whitney_u(reference, other, options.mann_whitney),
        TwoSampleTest::StudentT => t_test(reference, other, true),
        TwoSampleTest::WelchT => t_test(reference, other, false),
    }
}

/// `"{mean} ± {sd} ({n})"`.
fn summary_cell(values: &[f64], places: u32) -> String {
    let summary = SampleSummary::from_values(values);
    format!(
        "{} ± {} ({})",
        format_numeric(round_to(summary.mean, places)),
        format_numeric(round_to(summary.std_dev, places)),
        summary.n
    )
}

/// `"{count} (%{percent})"`; an empty group reads 0%.
fn count_cell(count: u64, group_total: u64, places: u32) -> String {
    let percent = if group_total == 0 {
        0.0
    } else {
        count as f64 / group_total as f64 * 100.0
    };
    format!("{count} (%{percent:.prec$})", prec = places as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_cell() {
        assert_eq!(summary_cell(&[1.0, 2.0, 3.0], 2), "2 ± 1 (3)");
        assert_eq!(summary_cell(&[34.0, 45.0, 29.0], 2), "36 ± 8.19 (3)");
        assert_eq!(summary_cell(&[5.0], 2), "5 ± NaN (1)");
    }

    #[test]
    fn test_count_cell() {
        assert_eq!(count_cell(2, 6, 2), "2 (%33.33)");
        assert_eq!(count_cell(0, 0, 2), "0 (%0.00)");
        assert_eq!(count_cell(3, 4, 1), "3 (%75.0)");
    }
}
