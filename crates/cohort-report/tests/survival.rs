//! Integration tests for Kaplan-Meier plotting and log-rank summaries.

use polars::prelude::*;

use cohort_report::{
    CurveStyle, LineStyle, LineStyleOverflow, PlotOptions, PlotSurface, ReportError, Rgb,
    SurvivalCurveReporter, render_svg,
};
use cohort_stats::KaplanMeierCurve;

#[derive(Default)]
struct RecordingSurface {
    drawn: Vec<(CurveStyle, usize)>,
}

impl PlotSurface for RecordingSurface {
    fn draw_curve(&mut self, curve: &KaplanMeierCurve, style: &CurveStyle) -> cohort_report::Result<()> {
        self.drawn.push((style.clone(), curve.subjects()));
        Ok(())
    }
}

fn trial() -> DataFrame {
    df! {
        "time" => [5.0, 8.0, 12.0, 3.0, 9.0, 15.0, 7.0, 11.0, 4.0, 20.0, 6.0, 14.0],
        "event" => [1, 1, 0, 1, 1, 0, 1, 1, 1, 0, 1, 1],
        "arm" => ["A", "A", "A", "A", "B", "B", "B", "B", "C", "C", "C", "C"],
    }
    .unwrap()
}

fn fitted() -> SurvivalCurveReporter {
    let mut reporter = SurvivalCurveReporter::new(trial(), "time", "event").unwrap();
    reporter.fit("arm").unwrap();
    reporter
}

#[test]
fn test_plot_styles_and_order() {
    let mut surface = RecordingSurface::default();
    fitted().plot(&mut surface, &PlotOptions::default()).unwrap();

    let labels: Vec<&str> = surface.drawn.iter().map(|(s, _)| s.label.as_str()).collect();
    assert_eq!(labels, vec!["arm C", "arm B", "arm A"]);

    let colors: Vec<Rgb> = surface.drawn.iter().map(|(s, _)| s.color).collect();
    assert_eq!(colors, vec![Rgb(0, 0, 0), Rgb(85, 85, 85), Rgb(170, 170, 170)]);

    let lines: Vec<LineStyle> = surface.drawn.iter().map(|(s, _)| s.line).collect();
    assert_eq!(lines, vec![LineStyle::Solid, LineStyle::Dashed, LineStyle::DashDot]);

    assert!(surface.drawn.iter().all(|(s, n)| !s.show_confidence_interval && *n == 4));
}

#[test]
fn test_plot_confidence_interval_flag() {
    let mut surface = RecordingSurface::default();
    let options = PlotOptions::default().with_confidence_interval(true);
    fitted().plot(&mut surface, &options).unwrap();
    assert!(surface.drawn.iter().all(|(s, _)| s.show_confidence_interval));
}

#[test]
fn test_plot_too_many_groups() {
    let frame = df! {
        "time" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        "event" => [true, true, false, true, true, true],
        "site" => ["a", "b", "c", "d", "e", "f"],
    }
    .unwrap();
    let mut reporter = SurvivalCurveReporter::new(frame, "time", "event").unwrap();
    reporter.fit("site").unwrap();

    let mut surface = RecordingSurface::default();
    let err = reporter
        .plot(&mut surface, &PlotOptions::default())
        .unwrap_err();
    assert!(matches!(err, ReportError::TooManyGroups { groups: 6, styles: 5 }));
    assert!(surface.drawn.is_empty());

    let options = PlotOptions::default().with_line_style_overflow(LineStyleOverflow::Wrap);
    reporter.plot(&mut surface, &options).unwrap();
    assert_eq!(surface.drawn.len(), 6);
    assert_eq!(surface.drawn[5].0.line, LineStyle::Solid);
    assert_eq!(surface.drawn[4].0.line, LineStyle::Cross);
}

#[test]
fn test_not_fitted() {
    let reporter = SurvivalCurveReporter::new(trial(), "time", "event").unwrap();
    let mut surface = RecordingSurface::default();
    assert!(matches!(
        reporter.plot(&mut surface, &PlotOptions::default()),
        Err(ReportError::NotFitted)
    ));
    assert!(matches!(
        render_svg(&reporter, &PlotOptions::default(), (640, 480)),
        Err(ReportError::NotFitted)
    ));
}

#[test]
fn test_unknown_columns() {
    let err = SurvivalCurveReporter::new(trial(), "days", "event").unwrap_err();
    assert_eq!(err.to_string(), "column 'days' not found in DataFrame");
}

#[test]
fn test_print_logrank_pairs() {
    let summary = fitted().print_logrank().unwrap();
    assert_eq!(summary.covariate, "arm");
    assert_eq!(summary.len(), 3);

    let pairs: Vec<(&str, &str)> = summary
        .comparisons
        .iter()
        .map(|c| (c.group_a.as_str(), c.group_b.as_str()))
        .collect();
    assert_eq!(pairs, vec![("A", "B"), ("A", "C"), ("B", "C")]);

    for comparison in &summary.comparisons {
        assert!((0.0..=1.0).contains(&comparison.p_value));
        assert!(comparison.test_statistic >= 0.0);
        assert!((comparison.neg_log2_p + comparison.p_value.log2()).abs() < 1e-12);
    }
    assert!(summary.get("C", "A").is_some());

    let frame = summary.to_dataframe().unwrap();
    assert_eq!(frame.shape(), (3, 5));
    assert!(summary.to_string().contains("Pairwise log-rank tests by arm"));
}

#[test]
fn test_invalid_event_values() {
    let frame = df! {
        "time" => [1.0, 2.0],
        "event" => [1, 2],
        "arm" => ["A", "B"],
    }
    .unwrap();
    let mut reporter = SurvivalCurveReporter::new(frame, "time", "event").unwrap();
    reporter.fit("arm").unwrap();
    assert!(matches!(reporter.curves(), Err(ReportError::Dataset(_))));
}

#[test]
fn test_render_svg() {
    let svg = render_svg(
        &fitted(),
        &PlotOptions::default().with_confidence_interval(true),
        (640, 480),
    )
    .unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains("arm A"));
    assert!(svg.contains("Survival by arm"));
}
