//! Kaplan-Meier estimation and the log-rank test.

use serde::{Deserialize, Serialize};

use crate::distribution::chi_squared_sf;
use crate::error::{Result, StatsError};
use crate::testing::TestResult;

/// Two-sided 95% standard normal quantile.
const Z_95: f64 = 1.959_963_984_540_054;

/// One subject's follow-up time and whether the event was observed.
///
/// `observed == false` means the subject was censored at `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub duration: f64,
    pub observed: bool,
}

impl Observation {
    pub fn new(duration: f64, observed: bool) -> Self {
        Self { duration, observed }
    }
}

/// Kaplan-Meier survival curve.
///
/// The Kaplan-Meier estimator is a non-parametric estimate of the survival
/// function from right-censored lifetime data. The curve stores parallel
/// vectors, one entry per distinct duration in the data (event or
/// censoring time), so censoring marks and at-risk counts are available for
/// every step of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KaplanMeierCurve {
    /// Distinct durations in ascending order.
    pub times: Vec<f64>,
    /// Survival probability just after each time point.
    pub survival_prob: Vec<f64>,
    /// Subjects still under observation just before each time point.
    pub at_risk: Vec<usize>,
    /// Observed events at each time point.
    pub events: Vec<usize>,
    /// Censored subjects at each time point.
    pub censored: Vec<usize>,
    /// Lower bound of the 95% confidence interval (exponential Greenwood).
    pub lower: Vec<f64>,
    /// Upper bound of the 95% confidence interval (exponential Greenwood).
    pub upper: Vec<f64>,
}

impl KaplanMeierCurve {
    /// Fits the Kaplan-Meier curve to a set of observations.
    ///
    /// # Errors
    ///
    /// Returns [`StatsError::EmptySample`] when there are no observations and
    /// [`StatsError::InvalidDuration`] for a negative or non-finite duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use cohort_stats::{KaplanMeierCurve, Observation};
    ///
    /// let data = [
    ///     Observation::new(10.0, true),  // event at 10
    ///     Observation::new(20.0, false), // censored at 20
    ///     Observation::new(30.0, true),  // event at 30
    /// ];
    /// let curve = KaplanMeierCurve::fit(&data).unwrap();
    /// assert_eq!(curve.times, vec![10.0, 20.0, 30.0]);
    /// assert_eq!(curve.median_survival(), Some(30.0));
    /// ```
    pub fn fit(observations: &[Observation]) -> Result<Self> {
        if observations.is_empty() {
            return Err(StatsError::EmptySample {
                sample: "observations",
            });
        }
        validate_durations(observations)?;

        let mut data = observations.to_vec();
        data.sort_by(|a, b| a.duration.total_cmp(&b.duration));

        let mut curve = Self {
            times: Vec::new(),
            survival_prob: Vec::new(),
            at_risk: Vec::new(),
            events: Vec::new(),
            censored: Vec::new(),
            lower: Vec::new(),
            upper: Vec::new(),
        };

        let total = data.len();
        let mut survival = 1.0;
        let mut greenwood = 0.0;
        let mut i = 0;
        while i < total {
            let time = data[i].duration;
            let at_risk = total - i;

            let mut event_count = 0;
            let mut j = i;
            while j < total && data[j].duration == time {
                if data[j].observed {
                    event_count += 1;
                }
                j += 1;
            }

            if event_count > 0 {
                let n = at_risk as f64;
                let d = event_count as f64;
                survival *= 1.0 - d / n;
                if at_risk > event_count {
                    greenwood += d / (n * (n - d));
                }
            }
            let (lower, upper) = exponential_greenwood(survival, greenwood);

            curve.times.push(time);
            curve.survival_prob.push(survival);
            curve.at_risk.push(at_risk);
            curve.events.push(event_count);
            curve.censored.push(j - i - event_count);
            curve.lower.push(lower);
            curve.upper.push(upper);

            i = j;
        }

        Ok(curve)
    }

    /// Number of subjects the curve was fitted on.
    #[must_use]
    pub fn subjects(&self) -> usize {
        self.at_risk.first().copied().unwrap_or(0)
    }

    /// Returns the median survival time.
    ///
    /// The first time at which the survival probability drops to or below
    /// 50%, or `None` if it never does.
    #[must_use]
    pub fn median_survival(&self) -> Option<f64> {
        self.survival_prob
            .iter()
            .position(|&s| s <= 0.5)
            .map(|i| self.times[i])
    }

    /// Returns the survival probability at a specific time.
    ///
    /// The curve is a right-continuous step function: `1.0` before the
    /// first time point, the last estimate after the final one.
    #[must_use]
    pub fn survival_at(&self, time: f64) -> f64 {
        self.times
            .iter()
            .rposition(|&t| t <= time)
            .map_or(1.0, |i| self.survival_prob[i])
    }

    /// Vertices of the survival step function, starting at `(0, 1)`.
    #[must_use]
    pub fn step_points(&self) -> Vec<(f64, f64)> {
        step(&self.times, &self.survival_prob)
    }

    /// Step vertices of the lower and upper confidence bounds.
    #[must_use]
    pub fn confidence_band(&self) -> (Vec<(f64, f64)>, Vec<(f64, f64)>) {
        (step(&self.times, &self.lower), step(&self.times, &self.upper))
    }
}

fn step(times: &[f64], values: &[f64]) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(times.len() * 2 + 1);
    points.push((0.0, 1.0));
    let mut previous = 1.0;
    for (&time, &value) in times.iter().zip(values) {
        points.push((time, previous));
        points.push((time, value));
        previous = value;
    }
    points
}

/// Log-log transformed confidence bounds around a survival estimate.
fn exponential_greenwood(survival: f64, greenwood: f64) -> (f64, f64) {
    if survival <= 0.0 || survival >= 1.0 || greenwood <= 0.0 {
        return (survival, survival);
    }
    let log_s = survival.ln();
    let variance = greenwood / (log_s * log_s);
    let centre = (-log_s).ln();
    let half_width = Z_95 * variance.sqrt();
    (
        (-(centre + half_width).exp()).exp(),
        (-(centre - half_width).exp()).exp(),
    )
}

fn validate_durations(observations: &[Observation]) -> Result<()> {
    match observations
        .iter()
        .position(|o| !o.duration.is_finite() || o.duration < 0.0)
    {
        Some(index) => Err(StatsError::InvalidDuration {
            index,
            value: observations[index].duration,
        }),
        None => Ok(()),
    }
}

/// Two-group log-rank test.
///
/// At each distinct event time the observed events in group `a` are
/// compared with the count expected if both groups shared one hazard. The
/// statistic `(O - E)^2 / V` is referred to a chi-square distribution with
/// one degree of freedom.
///
/// # Errors
///
/// Returns [`StatsError::EmptySample`] when either group is empty,
/// [`StatsError::InvalidDuration`] for a bad duration, and
/// [`StatsError::ZeroVariance`] when no event time has both groups at risk.
pub fn log_rank_test(a: &[Observation], b: &[Observation]) -> Result<TestResult> {
    if a.is_empty() {
        return Err(StatsError::EmptySample { sample: "a" });
    }
    if b.is_empty() {
        return Err(StatsError::EmptySample { sample: "b" });
    }
    validate_durations(a)?;
    validate_durations(b)?;

    // (duration, observed, in group a)
    let mut pooled: Vec<(f64, bool, bool)> = a
        .iter()
        .map(|o| (o.duration, o.observed, true))
        .chain(b.iter().map(|o| (o.duration, o.observed, false)))
        .collect();
    pooled.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut at_risk = pooled.len();
    let mut at_risk_a = a.len();
    let mut observed_a = 0.0;
    let mut expected_a = 0.0;
    let mut variance = 0.0;

    let mut i = 0;
    while i < pooled.len() {
        let time = pooled[i].0;
        let (mut deaths, mut deaths_a, mut leaving, mut leaving_a) = (0_usize, 0_usize, 0, 0);
        while i < pooled.len() && pooled[i].0 == time {
            let (_, observed, in_a) = pooled[i];
            leaving += 1;
            if in_a {
                leaving_a += 1;
            }
            if observed {
                deaths += 1;
                if in_a {
                    deaths_a += 1;
                }
            }
            i += 1;
        }

        if deaths > 0 {
            let n = at_risk as f64;
            let share = at_risk_a as f64 / n;
            let d = deaths as f64;
            observed_a += deaths_a as f64;
            expected_a += d * share;
            if at_risk > 1 {
                variance += d * share * (1.0 - share) * (n - d) / (n - 1.0);
            }
        }

        at_risk -= leaving;
        at_risk_a -= leaving_a;
    }

    if variance <= 0.0 {
        return Err(StatsError::ZeroVariance);
    }
    let statistic = (observed_a - expected_a).powi(2) / variance;
    Ok(TestResult {
        statistic,
        p_value: chi_squared_sf(statistic, 1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observations(data: &[(f64, bool)]) -> Vec<Observation> {
        data.iter()
            .map(|&(duration, observed)| Observation::new(duration, observed))
            .collect()
    }

    #[test]
    fn test_kaplan_meier_basic() {
        let curve =
            KaplanMeierCurve::fit(&observations(&[(10.0, true), (20.0, false), (30.0, true)]))
                .unwrap();

        assert_eq!(curve.times, vec![10.0, 20.0, 30.0]);
        assert_eq!(curve.at_risk, vec![3, 2, 1]);
        assert_eq!(curve.events, vec![1, 0, 1]);
        assert_eq!(curve.censored, vec![0, 1, 0]);
        assert!((curve.survival_prob[0] - 2.0 / 3.0).abs() < 1e-12);
        assert!((curve.survival_prob[1] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(curve.survival_prob[2], 0.0);
        assert_eq!(curve.subjects(), 3);
    }

    #[test]
    fn test_median_and_survival_at() {
        let curve =
            KaplanMeierCurve::fit(&observations(&[(10.0, true), (20.0, false), (30.0, true)]))
                .unwrap();
        assert_eq!(curve.median_survival(), Some(30.0));
        assert_eq!(curve.survival_at(5.0), 1.0);
        assert!((curve.survival_at(15.0) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(curve.survival_at(100.0), 0.0);

        let censored_only = KaplanMeierCurve::fit(&observations(&[(5.0, false)])).unwrap();
        assert_eq!(censored_only.median_survival(), None);
        assert_eq!(censored_only.survival_prob, vec![1.0]);
    }

    #[test]
    fn test_confidence_band_contains_estimate() {
        let data: Vec<Observation> = (1..=20)
            .map(|i| Observation::new(f64::from(i), i % 3 != 0))
            .collect();
        let curve = KaplanMeierCurve::fit(&data).unwrap();
        for ((&s, &lo), &hi) in curve.survival_prob.iter().zip(&curve.lower).zip(&curve.upper) {
            assert!(lo <= s + 1e-12 && s <= hi + 1e-12, "{lo} <= {s} <= {hi}");
            assert!((0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi));
        }
    }

    #[test]
    fn test_step_points() {
        let curve = KaplanMeierCurve::fit(&observations(&[(2.0, true), (4.0, true)])).unwrap();
        assert_eq!(
            curve.step_points(),
            vec![(0.0, 1.0), (2.0, 1.0), (2.0, 0.5), (4.0, 0.5), (4.0, 0.0)]
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            KaplanMeierCurve::fit(&[]),
            Err(StatsError::EmptySample { .. })
        ));
        assert!(matches!(
            KaplanMeierCurve::fit(&observations(&[(1.0, true), (-2.0, true)])),
            Err(StatsError::InvalidDuration { index: 1, .. })
        ));
    }

    #[test]
    fn test_log_rank_separated_groups() {
        let a = observations(&[(1.0, true), (2.0, true)]);
        let b = observations(&[(3.0, true), (4.0, true)]);
        let result = log_rank_test(&a, &b).unwrap();
        // O = 2, E = 1/2 + 1/3, V = 1/4 + 2/9
        let expected = (2.0_f64 - 5.0 / 6.0).powi(2) / (0.25 + 2.0 / 9.0);
        assert!((result.statistic - expected).abs() < 1e-12);
        assert!(result.p_value > 0.05 && result.p_value < 0.1);

        let swapped = log_rank_test(&b, &a).unwrap();
        assert!((swapped.statistic - result.statistic).abs() < 1e-12);
    }

    #[test]
    fn test_log_rank_identical_groups() {
        let a = observations(&[(1.0, true), (2.0, false), (3.0, true)]);
        let result = log_rank_test(&a, &a).unwrap();
        assert!(result.statistic.abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_rank_without_shared_risk() {
        let a = observations(&[(1.0, false)]);
        let b = observations(&[(2.0, false)]);
        assert!(matches!(log_rank_test(&a, &b), Err(StatsError::ZeroVariance)));
    }
}
