//! Kaplan-Meier curves and log-rank tests stratified by a covariate.

use std::fmt;

use comfy_table::{Cell, CellAlignment};
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span};

use cohort_model::Dataset;
use cohort_stats::{KaplanMeierCurve, Observation, log_rank_test};

use crate::error::{ReportError, Result};
use crate::logging::redact_value;
use crate::options::PlotOptions;
use crate::plot::{CurveStyle, PlotSurface, curve_styles};
use crate::render::{align_column, p_value_cell, styled_table};

/// Survival reporting over one duration column and one event column.
///
/// Call [`fit`](Self::fit) to choose the covariate that stratifies the
/// curves. Nothing is estimated until curves are requested.
#[derive(Debug, Clone)]
pub struct SurvivalCurveReporter {
    dataset: Dataset,
    duration: String,
    event: String,
    covariate: Option<String>,
}

/// A fitted curve for one covariate level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCurve {
    pub level: String,
    /// Legend label, `"{covariate} {level}"`.
    pub label: String,
    pub curve: KaplanMeierCurve,
}

impl SurvivalCurveReporter {
    /// Creates a reporter over a `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns [`cohort_model::DatasetError::ColumnNotFound`] (wrapped) if either
    /// column is missing.
    pub fn new(frame: DataFrame, duration: &str, event: &str) -> Result<Self> {
        Self::from_dataset(Dataset::new(frame), duration, event)
    }

    pub fn from_dataset(dataset: Dataset, duration: &str, event: &str) -> Result<Self> {
        dataset.require_column(duration)?;
        dataset.require_column(event)?;
        Ok(Self {
            dataset,
            duration: duration.to_string(),
            event: event.to_string(),
            covariate: None,
        })
    }

    /// Records the covariate whose levels split the curves.
    pub fn fit(&mut self, covariate: &str) -> Result<&mut Self> {
        self.dataset.require_column(covariate)?;
        debug!(covariate, "covariate fitted");
        self.covariate = Some(covariate.to_string());
        Ok(self)
    }

    pub fn covariate(&self) -> Option<&str> {
        self.covariate.as_deref()
    }

    pub fn duration_column(&self) -> &str {
        &self.duration
    }

    pub fn event_column(&self) -> &str {
        &self.event
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn require_covariate(&self) -> Result<&str> {
        self.covariate().ok_or(ReportError::NotFitted)
    }

    /// Observations grouped by covariate level, levels ascending.
    ///
    /// Rows with a missing covariate belong to no group.
    fn groups(&self, covariate: &str) -> Result<Vec<(String, Vec<Observation>)>> {
        let observations = self
            .dataset
            .survival_observations(&self.duration, &self.event)?;
        let labels = self.dataset.labels(covariate)?;

        let mut groups: Vec<(String, Vec<Observation>)> = self
            .dataset
            .levels(covariate)?
            .into_iter()
            .map(|level| (level, Vec::new()))
            .collect();
        for (label, (duration, observed)) in labels.into_iter().zip(observations) {
            let Some(label) = label else { continue };
            if let Some((_, members)) = groups.iter_mut().find(|(level, _)| *level == label) {
                members.push(Observation::new(duration, observed));
            }
        }
        Ok(groups)
    }

    /// One Kaplan-Meier curve per covariate level, levels descending.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NotFitted`] before [`fit`](Self::fit), and
    /// dataset or estimation errors naming the failing level.
    pub fn curves(&self) -> Result<Vec<GroupCurve>> {
        let covariate = self.require_covariate()?;
        let mut curves = Vec::new();
        for (level, observations) in self.groups(covariate)?.into_iter().rev() {
            let label = format!("{covariate} {level}");
            let curve =
                KaplanMeierCurve::fit(&observations).map_err(ReportError::statistics(label.as_str()))?;
            debug!(
                level = redact_value(&level),
                subjects = curve.subjects(),
                "curve fitted"
            );
            curves.push(GroupCurve { level, label, curve });
        }
        Ok(curves)
    }

    /// Largest duration in the dataset, 0 when it is empty.
    pub fn max_duration(&self) -> Result<f64> {
        Ok(self
            .dataset
            .numeric(&self.duration)?
            .into_iter()
            .flatten()
            .fold(0.0, f64::max))
    }

    /// Draws one curve per covariate level onto `surface`.
    ///
    /// Curves get a grayscale color, darkest first, and the next line style.
    /// The style check runs before anything is drawn.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::TooManyGroups`] for more than five levels unless
    /// the options allow wrapping, plus any error from [`Self::curves`] or the
    /// surface.
    pub fn plot<S: PlotSurface + ?Sized>(&self, surface: &mut S, options: &PlotOptions) -> Result<()> {
        let covariate = self.require_covariate()?;
        let span = info_span!("plot", covariate);
        let _guard = span.enter();

        let curves = self.curves()?;
        let styles = curve_styles(curves.len(), options.line_style_overflow)?;
        for (group, (color, line)) in curves.iter().zip(styles) {
            let style = CurveStyle {
                label: group.label.clone(),
                color,
                line,
                show_confidence_interval: options.show_confidence_interval,
            };
            surface.draw_curve(&group.curve, &style)?;
        }
        info!(curves = curves.len(), "survival curves plotted");
        Ok(())
    }

    /// Log-rank test for every unordered pair of covariate levels.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::NotFitted`] before [`fit`](Self::fit), and
    /// [`ReportError::Statistics`] naming the pair when a test fails.
    pub fn print_logrank(&self) -> Result<LogRankSummary> {
        let covariate = self.require_covariate()?;
        let span = info_span!("print_logrank", covariate);
        let _guard = span.enter();

        let groups = self.groups(covariate)?;
        let mut comparisons = Vec::new();
        for (i, (group_a, a)) in groups.iter().enumerate() {
            for (group_b, b) in &groups[i + 1..] {
                let result = log_rank_test(a, b)
                    .map_err(ReportError::statistics(format!("{covariate} {group_a} vs {group_b}")))?;
                comparisons.push(LogRankComparison {
                    group_a: group_a.clone(),
                    group_b: group_b.clone(),
                    test_statistic: result.statistic,
                    p_value: result.p_value,
                    neg_log2_p: -result.p_value.log2(),
                });
            }
        }
        info!(comparisons = comparisons.len(), "log-rank tests complete");
        Ok(LogRankSummary {
            covariate: covariate.to_string(),
            comparisons,
        })
    }
}

/// Log-rank result for one pair of levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRankComparison {
    pub group_a: String,
    pub group_b: String,
    pub test_statistic: f64,
    pub p_value: f64,
    /// `-log2(p)`.
    pub neg_log2_p: f64,
}

/// Pairwise log-rank tests across the levels of a covariate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRankSummary {
    pub covariate: String,
    pub comparisons: Vec<LogRankComparison>,
}

impl LogRankSummary {
    pub fn len(&self) -> usize {
        self.comparisons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparisons.is_empty()
    }

    /// Comparison between two levels, in either order.
    pub fn get(&self, a: &str, b: &str) -> Option<&LogRankComparison> {
        self.comparisons.iter().find(|c| {
            (c.group_a == a && c.group_b == b) || (c.group_a == b && c.group_b == a)
        })
    }

    /// Converts the summary to a `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns an error if Polars rejects the columns.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let group_a: Vec<&str> = self.comparisons.iter().map(|c| c.group_a.as_str()).collect();
        let group_b: Vec<&str> = self.comparisons.iter().map(|c| c.group_b.as_str()).collect();
        let statistic: Vec<f64> = self.comparisons.iter().map(|c| c.test_statistic).collect();
        let p_value: Vec<f64> = self.comparisons.iter().map(|c| c.p_value).collect();
        let neg_log2_p: Vec<f64> = self.comparisons.iter().map(|c| c.neg_log2_p).collect();

        Ok(DataFrame::new(vec![
            Column::new("group_a".into(), group_a),
            Column::new("group_b".into(), group_b),
            Column::new("test_statistic".into(), statistic),
            Column::new("p".into(), p_value),
            Column::new("-log2(p)".into(), neg_log2_p),
        ])?)
    }
}

impl fmt::Display for LogRankSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pairwise log-rank tests by {}", self.covariate)?;
        let headers = ["group_a", "group_b", "test_statistic", "p", "-log2(p)"].map(String::from);
        let mut table = styled_table(&headers);
        for c in &self.comparisons {
            table.add_row(vec![
                Cell::new(&c.group_a),
                Cell::new(&c.group_b),
                Cell::new(format!("{:.2}", c.test_statistic)),
                p_value_cell(c.p_value),
                Cell::new(format!("{:.2}", c.neg_log2_p)),
            ]);
        }
        for index in 2..5 {
            align_column(&mut table, index, CellAlignment::Right);
        }
        write!(f, "{table}")
    }
}
