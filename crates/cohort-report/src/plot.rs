//! Kaplan-Meier plotting.
//!
//! Reporters draw through the [`PlotSurface`] trait so the caller decides
//! where curves land. [`ChartSurface`] adapts a plotters chart;
//! [`render_svg`] builds a complete chart around a fitted reporter.

use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use cohort_stats::KaplanMeierCurve;

use crate::error::{ReportError, Result};
use crate::options::{LineStyleOverflow, PlotOptions};
use crate::survival::SurvivalCurveReporter;

/// Line styles in the order groups receive them.
pub const LINE_STYLES: [LineStyle; 5] = [
    LineStyle::Solid,
    LineStyle::Dashed,
    LineStyle::DashDot,
    LineStyle::Dotted,
    LineStyle::Cross,
];

/// Entries in the grayscale lookup table.
const GRAY_LEVELS: f64 = 256.0;

/// How a curve is stroked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Solid,
    Dashed,
    DashDot,
    Dotted,
    /// Cross markers at each step vertex instead of a line.
    Cross,
}

impl LineStyle {
    /// Conventional short code (`-`, `--`, `-.`, `:`, `x`).
    pub fn code(self) -> &'static str {
        match self {
            Self::Solid => "-",
            Self::Dashed => "--",
            Self::DashDot => "-.",
            Self::Dotted => ":",
            Self::Cross => "x",
        }
    }
}

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl From<Rgb> for RGBColor {
    fn from(Rgb(r, g, b): Rgb) -> Self {
        RGBColor(r, g, b)
    }
}

/// Grayscale colors for `groups` curves, darkest first.
///
/// The ramp is sampled at `i / groups` for `i` in `0..4 * groups` through a
/// 256-entry black-to-white table and only the first `groups` samples are
/// kept, so the first curve is black and later curves get lighter.
pub fn gray_palette(groups: usize) -> Vec<Rgb> {
    let mut ramp: Vec<Rgb> = (0..4 * groups)
        .map(|i| gray_level(i as f64 / groups as f64))
        .collect();
    ramp.truncate(groups);
    ramp
}

fn gray_level(fraction: f64) -> Rgb {
    let index = (fraction.clamp(0.0, 1.0) * GRAY_LEVELS).floor().min(GRAY_LEVELS - 1.0) as u8;
    Rgb(index, index, index)
}

/// Color and line style for each of `groups` curves.
///
/// # Errors
///
/// Returns [`ReportError::TooManyGroups`] when there are more groups than
/// line styles and `overflow` is [`LineStyleOverflow::Error`].
pub fn curve_styles(groups: usize, overflow: LineStyleOverflow) -> Result<Vec<(Rgb, LineStyle)>> {
    if groups > LINE_STYLES.len() && overflow == LineStyleOverflow::Error {
        return Err(ReportError::TooManyGroups {
            groups,
            styles: LINE_STYLES.len(),
        });
    }
    Ok(gray_palette(groups)
        .into_iter()
        .enumerate()
        .map(|(i, color)| (color, LINE_STYLES[i % LINE_STYLES.len()]))
        .collect())
}

/// Everything a surface needs to draw one curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveStyle {
    /// Legend label, `"{covariate} {level}"`.
    pub label: String,
    pub color: Rgb,
    pub line: LineStyle,
    /// Shade the 95% confidence band.
    pub show_confidence_interval: bool,
}

/// A target that Kaplan-Meier curves can be drawn onto.
pub trait PlotSurface {
    /// Draws one fitted curve.
    ///
    /// # Errors
    ///
    /// Implementations report drawing failures as [`ReportError::Plot`].
    fn draw_curve(&mut self, curve: &KaplanMeierCurve, style: &CurveStyle) -> Result<()>;
}

impl<S: PlotSurface + ?Sized> PlotSurface for &mut S {
    fn draw_curve(&mut self, curve: &KaplanMeierCurve, style: &CurveStyle) -> Result<()> {
        (**self).draw_curve(curve, style)
    }
}

/// [`PlotSurface`] over a plotters chart with `f64` axes.
pub struct ChartSurface<'c, 'a, DB: DrawingBackend> {
    chart: &'c mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>,
}

impl<'c, 'a, DB: DrawingBackend> ChartSurface<'c, 'a, DB> {
    pub fn new(chart: &'c mut ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>) -> Self {
        Self { chart }
    }
}

impl<DB: DrawingBackend> PlotSurface for ChartSurface<'_, '_, DB> {
    fn draw_curve(&mut self, curve: &KaplanMeierCurve, style: &CurveStyle) -> Result<()> {
        let color = RGBColor::from(style.color);
        let stroke = color.stroke_width(2);

        if style.show_confidence_interval {
            let (lower, upper) = curve.confidence_band();
            let mut band = upper;
            band.extend(lower.into_iter().rev());
            self.chart
                .draw_series(std::iter::once(Polygon::new(band, color.mix(0.2).filled())))
                .map_err(plot_error)?;
        }

        let points = curve.step_points();
        let series = match style.line {
            LineStyle::Solid => self.chart.draw_series(LineSeries::new(points, stroke)),
            LineStyle::Dashed => self
                .chart
                .draw_series(DashedLineSeries::new(points, 10, 6, stroke)),
            LineStyle::DashDot => self
                .chart
                .draw_series(DashedLineSeries::new(points, 14, 4, stroke)),
            LineStyle::Dotted => self
                .chart
                .draw_series(DashedLineSeries::new(points, 2, 4, stroke)),
            LineStyle::Cross => self
                .chart
                .draw_series(points.into_iter().map(|point| Cross::new(point, 4, stroke))),
        }
        .map_err(plot_error)?;

        series
            .label(style.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        Ok(())
    }
}

fn plot_error<E: std::error::Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> ReportError {
    ReportError::Plot {
        message: err.to_string(),
    }
}

/// Renders the fitted reporter as an SVG document.
///
/// The chart has labelled axes, one curve per covariate level and a legend.
///
/// # Errors
///
/// Returns [`ReportError::NotFitted`] before `fit`, and any error from
/// [`SurvivalCurveReporter::plot`] or the SVG backend.
pub fn render_svg(
    reporter: &SurvivalCurveReporter,
    options: &PlotOptions,
    size: (u32, u32),
) -> Result<String> {
    let covariate = reporter.covariate().ok_or(ReportError::NotFitted)?;
    let span = info_span!("render_svg", covariate, width = size.0, height = size.1);
    let _guard = span.enter();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        draw_chart(&root, reporter, covariate, options)?;
        root.present().map_err(plot_error)?;
    }
    debug!(bytes = svg.len(), "svg rendered");
    Ok(svg)
}

fn draw_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reporter: &SurvivalCurveReporter,
    covariate: &str,
    options: &PlotOptions,
) -> Result<()> {
    root.fill(&WHITE).map_err(plot_error)?;

    let x_max = reporter.max_duration()?.max(1.0) * 1.05;
    let mut chart = ChartBuilder::on(root)
        .caption(format!("Survival by {covariate}"), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(0.0..x_max, 0.0..1.05)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc(reporter.duration_column())
        .y_desc("survival probability")
        .draw()
        .map_err(plot_error)?;

    reporter.plot(&mut ChartSurface::new(&mut chart), options)?;

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_palette() {
        assert!(gray_palette(0).is_empty());
        assert_eq!(gray_palette(1), vec![Rgb(0, 0, 0)]);
        assert_eq!(
            gray_palette(4),
            vec![Rgb(0, 0, 0), Rgb(64, 64, 64), Rgb(128, 128, 128), Rgb(192, 192, 192)]
        );
    }

    #[test]
    fn test_curve_styles_cycle() {
        let styles = curve_styles(3, LineStyleOverflow::Error).unwrap();
        let lines: Vec<&str> = styles.iter().map(|(_, line)| line.code()).collect();
        assert_eq!(lines, vec!["-", "--", "-."]);
    }

    #[test]
    fn test_curve_styles_overflow() {
        assert!(matches!(
            curve_styles(6, LineStyleOverflow::Error),
            Err(ReportError::TooManyGroups { groups: 6, styles: 5 })
        ));
        let wrapped = curve_styles(6, LineStyleOverflow::Wrap).unwrap();
        assert_eq!(wrapped[5].1, LineStyle::Solid);
    }
}
