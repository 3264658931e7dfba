//! Property tests for the statistical kernels.

use cohort_stats::{
    ContingencyTable, KaplanMeierCurve, MannWhitneyMethod, Observation, chi2_contingency,
    log_rank_test, mann_whitney_u, t_test,
};
use proptest::prelude::*;

fn sample(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-1_000.0..1_000.0_f64, min_len..=max_len)
}

/// Small integer values so ties are common.
fn tied_sample(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec((0_u8..6).prop_map(f64::from), min_len..=max_len)
}

fn observations(max_len: usize) -> impl Strategy<Value = Vec<Observation>> {
    proptest::collection::vec(
        ((0_u16..50).prop_map(f64::from), any::<bool>())
            .prop_map(|(duration, observed)| Observation::new(duration, observed)),
        1..=max_len,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn mann_whitney_p_value_is_a_probability(x in sample(1, 15), y in sample(1, 15)) {
        for method in [MannWhitneyMethod::Auto, MannWhitneyMethod::Exact, MannWhitneyMethod::Asymptotic] {
            if let Ok(result) = mann_whitney_u(&x, &y, method) {
                prop_assert!((0.0..=1.0).contains(&result.p_value), "p = {}", result.p_value);
            }
        }
    }

    #[test]
    fn mann_whitney_u_statistics_sum_to_product(x in tied_sample(1, 12), y in tied_sample(1, 12)) {
        let forward = mann_whitney_u(&x, &y, MannWhitneyMethod::Asymptotic);
        let backward = mann_whitney_u(&y, &x, MannWhitneyMethod::Asymptotic);
        if let (Ok(forward), Ok(backward)) = (forward, backward) {
            let product = (x.len() * y.len()) as f64;
            prop_assert!((forward.statistic + backward.statistic - product).abs() < 1e-9);
            prop_assert!((forward.p_value - backward.p_value).abs() < 1e-12);
        }
    }

    #[test]
    fn t_test_p_value_is_a_probability(x in sample(2, 20), y in sample(2, 20), equal_var in any::<bool>()) {
        if let Ok(result) = t_test(&x, &y, equal_var) {
            prop_assert!((0.0..=1.0).contains(&result.p_value), "p = {}", result.p_value);
        }
    }

    #[test]
    fn chi_square_p_value_is_a_probability(
        pairs in proptest::collection::vec((0_u8..3, 0_u8..2), 1..60),
        yates in any::<bool>(),
    ) {
        let labels: Vec<(String, String)> = pairs
            .iter()
            .map(|(row, column)| (row.to_string(), column.to_string()))
            .collect();
        let table = ContingencyTable::from_pairs(labels.iter().map(|(r, c)| (r.as_str(), c.as_str())));
        let result = chi2_contingency(&table, yates).unwrap();
        prop_assert!(result.statistic >= 0.0);
        prop_assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn kaplan_meier_is_non_increasing(data in observations(40)) {
        let curve = KaplanMeierCurve::fit(&data).unwrap();
        prop_assert_eq!(curve.times.len(), curve.survival_prob.len());
        let mut previous = 1.0;
        for &s in &curve.survival_prob {
            prop_assert!((0.0..=1.0).contains(&s));
            prop_assert!(s <= previous + 1e-12);
            previous = s;
        }
        prop_assert!(curve.times.windows(2).all(|w| w[0] < w[1]));
        let events: usize = curve.events.iter().sum();
        let censored: usize = curve.censored.iter().sum();
        prop_assert_eq!(events + censored, data.len());
    }

    #[test]
    fn log_rank_p_value_is_a_probability(a in observations(20), b in observations(20)) {
        if let Ok(result) = log_rank_test(&a, &b) {
            prop_assert!(result.statistic >= 0.0);
            prop_assert!((0.0..=1.0).contains(&result.p_value));
        }
    }
}
