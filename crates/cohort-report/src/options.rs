//! Configuration options for the reporters.

use cohort_stats::{MannWhitneyMethod, OddsRatioKind};
use serde::{Deserialize, Serialize};

/// Two-sample test used for continuous columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoSampleTest {
    /// Mann-Whitney U (rank-based, no normality assumption).
    #[default]
    MannWhitneyU,
    /// Student's t-test with pooled variance.
    StudentT,
    /// Welch's t-test (unequal variances).
    WelchT,
}

/// Options controlling the group comparison tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonOptions {
    /// Column that splits the cohort. Defaults to the reporter's target.
    pub separator: Option<String>,

    /// Test for continuous columns.
    pub test: TwoSampleTest,

    /// p-value method when `test` is Mann-Whitney.
    pub mann_whitney: MannWhitneyMethod,

    /// Decimal places for means and standard deviations.
    pub summary_precision: u32,

    /// Decimal places for p-values.
    pub p_value_precision: u32,

    /// Decimal places for chi-square statistics.
    pub statistic_precision: u32,

    /// Decimal places for odds ratios.
    pub odds_ratio_precision: u32,

    /// Decimal places for percentages.
    pub percent_precision: u32,

    /// Apply the Yates continuity correction to 2x2 chi-square tests.
    pub yates_correction: bool,

    /// Odds-ratio estimate for 2x2 tables.
    pub odds_ratio: OddsRatioKind,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            separator: None,
            test: TwoSampleTest::default(),
            mann_whitney: MannWhitneyMethod::default(),
            summary_precision: 2,
            p_value_precision: 4,
            statistic_precision: 4,
            odds_ratio_precision: 2,
            percent_precision: 2,
            yates_correction: true,
            odds_ratio: OddsRatioKind::default(),
        }
    }
}

impl ComparisonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_separator(mut self, separator: Option<String>) -> Self {
        self.separator = separator;
        self
    }

    #[must_use]
    pub fn with_test(mut self, test: TwoSampleTest) -> Self {
        self.test = test;
        self
    }

    #[must_use]
    pub fn with_mann_whitney(mut self, method: MannWhitneyMethod) -> Self {
        self.mann_whitney = method;
        self
    }

    #[must_use]
    pub fn with_yates_correction(mut self, enable: bool) -> Self {
        self.yates_correction = enable;
        self
    }

    #[must_use]
    pub fn with_odds_ratio(mut self, kind: OddsRatioKind) -> Self {
        self.odds_ratio = kind;
        self
    }

    #[must_use]
    pub fn with_p_value_precision(mut self, places: u32) -> Self {
        self.p_value_precision = places;
        self
    }
}

/// What to do when a plot has more groups than line styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyleOverflow {
    /// Refuse with [`crate::ReportError::TooManyGroups`].
    #[default]
    Error,
    /// Reuse line styles from the start.
    Wrap,
}

/// Options for Kaplan-Meier plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Shade the 95% confidence band behind each curve.
    pub show_confidence_interval: bool,
    pub line_style_overflow: LineStyleOverflow,
}

impl PlotOptions {
    #[must_use]
    pub fn with_confidence_interval(mut self, enable: bool) -> Self {
        self.show_confidence_interval = enable;
        self
    }

    #[must_use]
    pub fn with_line_style_overflow(mut self, overflow: LineStyleOverflow) -> Self {
        self.line_style_overflow = overflow;
        self
    }
}
