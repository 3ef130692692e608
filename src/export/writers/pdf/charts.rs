//! Chart primitives for the vector report
//!
//! Every primitive draws onto a [`Canvas`] using only the style passed in.
//! Geometry is computed by small pure functions ([`bar_geometry`],
//! [`slice_angles`], [`trend_points`]) so it can be checked without reading
//! draw operations back.

use std::f64::consts::PI;
use std::fmt;

use crate::theme::{self, Rgb};

use super::canvas::{Align, Canvas, Font, Paint, Point, Size, TextStyle};

/// Space above the plot area for the chart title
const TITLE_BAND: f64 = 20.0;
/// Space above the tallest bar for its value label
const VALUE_BAND: f64 = 12.0;
/// Space below the baseline for category labels
const LABEL_BAND: f64 = 14.0;
/// Share of a bar slot filled by the bar
const BAR_FILL: f64 = 0.7;
/// Fan resolution, in degrees per step
const DEGREES_PER_STEP: f64 = 4.0;
/// Steps used for any non-empty slice, however thin
const MIN_SLICE_STEPS: usize = 2;
/// Distance between the donut's outer edge and slice labels
const LABEL_MARGIN: f64 = 12.0;
const DONUT_INNER: f64 = 0.6;
const DONUT_HOLE: f64 = 0.4;
const PROGRESS_BAR: f64 = 10.0;
/// Height used by one progress bar, label included
pub const PROGRESS_HEIGHT: f64 = 30.0;

/// One labelled value of a chart series
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeriesPoint {
    pub label: String,
    pub value: f64,
    /// Overrides the default series colour
    pub color: Option<Rgb>,
}

impl ChartSeriesPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
            color: None,
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    fn color_or(&self, index: usize) -> Rgb {
        self.color.unwrap_or_else(|| theme::series_color(index))
    }
}

/// A series that cannot be drawn
#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    EmptySeries,
    NonFinite { label: String },
    Negative { label: String },
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartError::EmptySeries => write!(f, "Series has no points"),
            ChartError::NonFinite { label } => write!(f, "Value for '{label}' is not finite"),
            ChartError::Negative { label } => write!(f, "Value for '{label}' is negative"),
        }
    }
}

impl std::error::Error for ChartError {}

/// Text and line styles shared by all charts
#[derive(Debug, Clone, Copy)]
pub struct ChartStyle {
    pub title: TextStyle,
    pub label: TextStyle,
    pub value: TextStyle,
    pub axis: Paint,
    pub empty: TextStyle,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: TextStyle::new(Font::Bold, 10.0, theme::TEXT),
            label: TextStyle::new(Font::Regular, 7.0, theme::MUTED),
            value: TextStyle::new(Font::Bold, 7.0, theme::TEXT),
            axis: Paint::stroke(theme::GRID, 0.8),
            empty: TextStyle::new(Font::Regular, 9.0, theme::MUTED),
        }
    }
}

fn validate(series: &[ChartSeriesPoint], allow_negative: bool) -> Result<(), ChartError> {
    if series.is_empty() {
        return Err(ChartError::EmptySeries);
    }
    for point in series {
        if !point.value.is_finite() {
            return Err(ChartError::NonFinite {
                label: point.label.clone(),
            });
        }
        if !allow_negative && point.value < 0.0 {
            return Err(ChartError::Negative {
                label: point.label.clone(),
            });
        }
    }
    Ok(())
}

/// Short label for chart values: `950`, `12.5K`, `3.2M`
pub fn compact_number(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1_000_000.0 {
        (value / 1_000_000.0, "M")
    } else if abs >= 1_000.0 {
        (value / 1_000.0, "K")
    } else {
        (value, "")
    };
    if scaled.fract().abs() < 0.05 {
        format!("{scaled:.0}{suffix}")
    } else {
        format!("{scaled:.1}{suffix}")
    }
}

/// Point on a circle; 0 degrees is 12 o'clock, angles grow clockwise
pub fn polar(center: Point, radius: f64, degrees: f64) -> Point {
    let radians = degrees * PI / 180.0;
    Point::new(
        center.x + radius * radians.sin(),
        center.y - radius * radians.cos(),
    )
}

/// Box with a centred message, drawn in place of a chart
pub fn empty_state(canvas: &mut Canvas, origin: Point, size: Size, message: &str, style: &ChartStyle) {
    canvas.rect(
        origin,
        size,
        Paint::fill_and_stroke(theme::METADATA, theme::GRID, 0.5),
    );
    canvas.text(
        Point::new(
            origin.x + size.width / 2.0,
            origin.y + size.height / 2.0 + style.empty.size / 3.0,
        ),
        message,
        style.empty.aligned(Align::Center),
    );
}

fn chart_title(canvas: &mut Canvas, origin: Point, title: &str, style: &ChartStyle) {
    if !title.is_empty() {
        canvas.text(origin.offset(0.0, style.title.size + 2.0), title, style.title);
    }
}

/// Horizontal slot and height of one bar, relative to the plot area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarGeometry {
    pub x: f64,
    pub width: f64,
    pub height: f64,
}

/// Bar slots for `series` in a plot area of `width` x `height`
///
/// # Returns
/// * `Option<Vec<BarGeometry>>` - None when every value is zero
pub fn bar_geometry(width: f64, height: f64, series: &[ChartSeriesPoint]) -> Option<Vec<BarGeometry>> {
    let max = series.iter().map(|p| p.value).fold(0.0_f64, f64::max);
    if series.is_empty() || max == 0.0 {
        return None;
    }
    let slot = width / series.len() as f64;
    Some(
        series
            .iter()
            .enumerate()
            .map(|(i, point)| BarGeometry {
                x: slot * i as f64,
                width: slot,
                height: point.value / max * height,
            })
            .collect(),
    )
}

/// Vertical bar chart with value labels above and category labels below
pub fn bar(
    canvas: &mut Canvas,
    origin: Point,
    size: Size,
    series: &[ChartSeriesPoint],
    title: &str,
    style: &ChartStyle,
) -> Result<(), ChartError> {
    validate(series, false)?;
    chart_title(canvas, origin, title, style);

    let plot_top = origin.y + TITLE_BAND + VALUE_BAND;
    let plot_height = size.height - TITLE_BAND - VALUE_BAND - LABEL_BAND;
    let baseline = plot_top + plot_height;

    let Some(bars) = bar_geometry(size.width, plot_height, series) else {
        empty_state(
            canvas,
            Point::new(origin.x, origin.y + TITLE_BAND),
            Size::new(size.width, size.height - TITLE_BAND),
            "No volume in this period",
            style,
        );
        return Ok(());
    };

    for (geometry, point) in bars.iter().zip(series) {
        let inset = geometry.width * (1.0 - BAR_FILL) / 2.0;
        let x = origin.x + geometry.x + inset;
        let width = geometry.width * BAR_FILL;
        let center = origin.x + geometry.x + geometry.width / 2.0;

        canvas.rect(
            Point::new(x, baseline - geometry.height),
            Size::new(width, geometry.height),
            Paint::fill(point.color.unwrap_or(theme::PRIMARY)),
        );
        canvas.text(
            Point::new(center, baseline - geometry.height - 3.0),
            compact_number(point.value),
            style.value.aligned(Align::Center),
        );
        canvas.text(
            Point::new(center, baseline + style.label.size + 4.0),
            point.label.clone(),
            style.label.aligned(Align::Center),
        );
    }

    canvas.line(
        Point::new(origin.x, baseline),
        Point::new(origin.x + size.width, baseline),
        style.axis,
    );
    Ok(())
}

/// Angular extent of one donut slice, in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Slice {
    pub start: f64,
    pub sweep: f64,
    /// Fan steps used to draw the slice
    pub steps: usize,
}

impl Slice {
    pub fn mid(&self) -> f64 {
        self.start + self.sweep / 2.0
    }
}

/// Slices for `series`, starting at 12 o'clock
///
/// # Returns
/// * `Option<Vec<Slice>>` - None when the total is zero
pub fn slice_angles(series: &[ChartSeriesPoint]) -> Option<Vec<Slice>> {
    let total: f64 = series.iter().map(|p| p.value).sum();
    if total == 0.0 {
        return None;
    }
    let mut start = 0.0;
    Some(
        series
            .iter()
            .map(|point| {
                let sweep = point.value / total * 360.0;
                let steps = if sweep > 0.0 {
                    ((sweep / DEGREES_PER_STEP).ceil() as usize).max(MIN_SLICE_STEPS)
                } else {
                    0
                };
                let slice = Slice {
                    start,
                    sweep,
                    steps,
                };
                start += sweep;
                slice
            })
            .collect(),
    )
}

/// Donut chart with outside labels and the total in the hole
pub fn donut(
    canvas: &mut Canvas,
    center: Point,
    radius: f64,
    series: &[ChartSeriesPoint],
    title: &str,
    style: &ChartStyle,
) -> Result<(), ChartError> {
    validate(series, false)?;
    chart_title(
        canvas,
        Point::new(center.x - radius - LABEL_MARGIN, center.y - radius - LABEL_MARGIN - TITLE_BAND),
        title,
        style,
    );

    let Some(slices) = slice_angles(series) else {
        let side = 2.0 * radius;
        empty_state(
            canvas,
            Point::new(center.x - radius, center.y - radius),
            Size::new(side, side),
            "No data",
            style,
        );
        return Ok(());
    };

    let total: f64 = series.iter().map(|p| p.value).sum();
    let inner = radius * DONUT_INNER;

    for (i, (slice, point)) in slices.iter().zip(series).enumerate() {
        if slice.steps == 0 {
            continue;
        }
        let paint = Paint::fill(point.color_or(i));
        let step = slice.sweep / slice.steps as f64;
        for s in 0..slice.steps {
            let a0 = slice.start + step * s as f64;
            let a1 = a0 + step;
            let (in0, in1) = (polar(center, inner, a0), polar(center, inner, a1));
            let (out0, out1) = (polar(center, radius, a0), polar(center, radius, a1));
            canvas.polygon(vec![in0, out0, out1], paint);
            canvas.polygon(vec![in0, out1, in1], paint);
        }

        let mid = slice.mid();
        let anchor = polar(center, radius + LABEL_MARGIN, mid);
        let align = if mid.to_radians().sin() >= 0.0 {
            Align::Left
        } else {
            Align::Right
        };
        let share = point.value / total * 100.0;
        canvas.text(
            anchor.offset(0.0, style.label.size / 3.0),
            format!("{} {share:.0}%", point.label),
            style.label.aligned(align),
        );
    }

    canvas.circle(center, radius * DONUT_HOLE, Paint::fill(theme::WHITE));
    canvas.text(
        center.offset(0.0, style.value.size / 3.0),
        compact_number(total),
        style.value.aligned(Align::Center),
    );
    Ok(())
}

/// Horizontal progress bar
///
/// # Arguments
/// * `percentage` - Fill level, clamped to `0..=100`
pub fn progress(
    canvas: &mut Canvas,
    origin: Point,
    width: f64,
    percentage: f64,
    label: &str,
    color: Rgb,
    style: &ChartStyle,
) -> Result<(), ChartError> {
    if !percentage.is_finite() {
        return Err(ChartError::NonFinite {
            label: label.to_string(),
        });
    }
    let pct = percentage.clamp(0.0, 100.0);
    let track_y = origin.y + style.label.size + 6.0;

    canvas.text(origin.offset(0.0, style.label.size + 2.0), label, style.label);
    canvas.rect(
        Point::new(origin.x, track_y),
        Size::new(width, PROGRESS_BAR),
        Paint::fill(theme::GRID),
    );

    let fill = pct / 100.0 * width;
    if fill > 0.0 {
        canvas.rect(
            Point::new(origin.x, track_y),
            Size::new(fill, PROGRESS_BAR),
            Paint::fill(color),
        );
        canvas.rect(
            Point::new(origin.x, track_y),
            Size::new(fill, PROGRESS_BAR / 2.0),
            Paint::fill(color.lighten(0.3)),
        );
    }

    canvas.text(
        Point::new(origin.x + width + 6.0, track_y + PROGRESS_BAR - 2.0),
        format!("{pct:.1}%"),
        style.value,
    );
    Ok(())
}

/// Vertices of a trend line inside `origin`/`size`
///
/// Values are normalised to the plot height; a series with no spread is
/// drawn as a flat line at mid-height.
pub fn trend_points(origin: Point, size: Size, values: &[f64]) -> Vec<Point> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let count = values.len();

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = if count > 1 {
                origin.x + size.width * i as f64 / (count - 1) as f64
            } else {
                origin.x + size.width / 2.0
            };
            let norm = if max == min { 0.5 } else { (value - min) / (max - min) };
            Point::new(x, origin.y + size.height * (1.0 - norm))
        })
        .collect()
}

/// Line chart with a marker per vertex and the last value emphasised
pub fn trend_line(
    canvas: &mut Canvas,
    origin: Point,
    size: Size,
    series: &[ChartSeriesPoint],
    title: &str,
    style: &ChartStyle,
) -> Result<(), ChartError> {
    validate(series, true)?;
    chart_title(canvas, origin, title, style);

    let plot = Point::new(origin.x + 6.0, origin.y + TITLE_BAND + VALUE_BAND);
    let plot_size = Size::new(
        size.width - 12.0,
        size.height - TITLE_BAND - VALUE_BAND - LABEL_BAND,
    );
    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    let points = trend_points(plot, plot_size, &values);
    let color = series.first().map_or(theme::PRIMARY, |p| p.color_or(0));

    canvas.line(
        Point::new(origin.x, plot.y + plot_size.height),
        Point::new(origin.x + size.width, plot.y + plot_size.height),
        style.axis,
    );
    for pair in points.windows(2) {
        canvas.line(pair[0], pair[1], Paint::stroke(color, 1.5));
    }
    for (point, vertex) in series.iter().zip(&points) {
        canvas.circle(*vertex, 2.5, Paint::fill_and_stroke(theme::WHITE, color, 1.0));
        canvas.text(
            Point::new(vertex.x, plot.y + plot_size.height + style.label.size + 4.0),
            point.label.clone(),
            style.label.aligned(Align::Center),
        );
    }
    if let (Some(last), Some(vertex)) = (series.last(), points.last()) {
        canvas.circle(*vertex, 4.0, Paint::fill(color));
        canvas.text(
            vertex.offset(0.0, -7.0),
            compact_number(last.value),
            style.value.aligned(Align::Center),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::writers::pdf::canvas::DrawOp;

    fn series(values: &[f64]) -> Vec<ChartSeriesPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ChartSeriesPoint::new(format!("P{i}"), *v))
            .collect()
    }

    fn texts(canvas: &Canvas) -> Vec<String> {
        canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_bar_geometry_scales_to_max() {
        let bars = bar_geometry(300.0, 100.0, &series(&[50.0, 100.0, 25.0])).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].width, 100.0);
        assert_eq!(bars[2].x, 200.0);
        assert_eq!(bars[0].height, 50.0);
        assert_eq!(bars[1].height, 100.0);
        assert_eq!(bars[2].height, 25.0);
    }

    #[test]
    fn test_bar_all_zero_draws_empty_state() {
        assert!(bar_geometry(300.0, 100.0, &series(&[0.0, 0.0])).is_none());

        let mut canvas = Canvas::new();
        bar(
            &mut canvas,
            Point::new(0.0, 0.0),
            Size::new(300.0, 150.0),
            &series(&[0.0, 0.0]),
            "Monthly volume",
            &ChartStyle::default(),
        )
        .unwrap();
        assert!(texts(&canvas).contains(&"No volume in this period".to_string()));
    }

    #[test]
    fn test_bar_labels() {
        let mut canvas = Canvas::new();
        bar(
            &mut canvas,
            Point::new(0.0, 0.0),
            Size::new(300.0, 150.0),
            &[ChartSeriesPoint::new("Jan", 1500.0), ChartSeriesPoint::new("Feb", 820.0)],
            "",
            &ChartStyle::default(),
        )
        .unwrap();
        let labels = texts(&canvas);
        assert!(labels.contains(&"1.5K".to_string()));
        assert!(labels.contains(&"Feb".to_string()));
    }

    #[test]
    fn test_slice_angles_sum_to_full_circle() {
        let slices = slice_angles(&series(&[3.0, 1.0, 0.5, 7.25])).unwrap();
        let total: f64 = slices.iter().map(|s| s.sweep).sum();
        assert!((total - 360.0).abs() < 1e-9);
        assert_eq!(slices[0].start, 0.0);
        assert!((slices[1].start - slices[0].sweep).abs() < 1e-9);
    }

    #[test]
    fn test_slice_steps_have_minimum() {
        let slices = slice_angles(&series(&[1000.0, 1.0, 0.0])).unwrap();
        assert!(slices[0].steps > slices[1].steps);
        assert_eq!(slices[1].steps, MIN_SLICE_STEPS);
        assert_eq!(slices[2].steps, 0);
    }

    #[test]
    fn test_donut_zero_total_is_empty_state() {
        assert!(slice_angles(&series(&[0.0, 0.0])).is_none());

        let mut canvas = Canvas::new();
        donut(
            &mut canvas,
            Point::new(100.0, 100.0),
            50.0,
            &series(&[0.0, 0.0]),
            "Status",
            &ChartStyle::default(),
        )
        .unwrap();
        assert!(texts(&canvas).contains(&"No data".to_string()));
        assert!(!canvas.ops().iter().any(|op| matches!(op, DrawOp::Polygon { .. })));
    }

    #[test]
    fn test_donut_draws_total_and_shares() {
        let mut canvas = Canvas::new();
        donut(
            &mut canvas,
            Point::new(100.0, 100.0),
            50.0,
            &[
                ChartSeriesPoint::new("completed", 3.0),
                ChartSeriesPoint::new("error", 1.0),
            ],
            "",
            &ChartStyle::default(),
        )
        .unwrap();
        let labels = texts(&canvas);
        assert!(labels.contains(&"completed 75%".to_string()));
        assert!(labels.contains(&"error 25%".to_string()));
        assert_eq!(labels.last().map(String::as_str), Some("4"));
    }

    #[test]
    fn test_malformed_series_errors() {
        let style = ChartStyle::default();
        let mut canvas = Canvas::new();
        let origin = Point::new(0.0, 0.0);
        let size = Size::new(100.0, 100.0);

        assert_eq!(
            bar(&mut canvas, origin, size, &[], "", &style),
            Err(ChartError::EmptySeries)
        );
        assert!(matches!(
            bar(&mut canvas, origin, size, &series(&[1.0, f64::NAN]), "", &style),
            Err(ChartError::NonFinite { .. })
        ));
        assert!(matches!(
            donut(&mut canvas, origin, 10.0, &series(&[-1.0, 2.0]), "", &style),
            Err(ChartError::Negative { .. })
        ));
        assert!(trend_line(&mut canvas, origin, size, &series(&[-1.0, 2.0]), "", &style).is_ok());
    }

    #[test]
    fn test_progress_clamps() {
        let style = ChartStyle::default();
        let mut canvas = Canvas::new();
        progress(&mut canvas, Point::new(0.0, 0.0), 200.0, 140.0, "Completed", theme::PRIMARY, &style)
            .unwrap();
        let fill_widths: Vec<f64> = canvas
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Rect { size, .. } => Some(size.width),
                _ => None,
            })
            .collect();
        assert_eq!(fill_widths, vec![200.0, 200.0, 200.0]);
        assert!(texts(&canvas).contains(&"100.0%".to_string()));

        assert!(
            progress(&mut canvas, Point::new(0.0, 0.0), 200.0, f64::NAN, "x", theme::PRIMARY, &style)
                .is_err()
        );
    }

    #[test]
    fn test_trend_points_flat_and_normalised() {
        let origin = Point::new(0.0, 0.0);
        let size = Size::new(100.0, 50.0);

        let flat = trend_points(origin, size, &[5.0, 5.0, 5.0]);
        assert!(flat.iter().all(|p| p.y == 25.0));

        let points = trend_points(origin, size, &[0.0, 10.0, 5.0]);
        assert_eq!(points[0], Point::new(0.0, 50.0));
        assert_eq!(points[1], Point::new(50.0, 0.0));
        assert_eq!(points[2], Point::new(100.0, 25.0));
    }

    #[test]
    fn test_compact_number() {
        assert_eq!(compact_number(950.0), "950");
        assert_eq!(compact_number(12_500.0), "12.5K");
        assert_eq!(compact_number(3_200_000.0), "3.2M");
        assert_eq!(compact_number(2.5), "2.5");
    }

    #[test]
    fn test_polar_orientation() {
        let center = Point::new(0.0, 0.0);
        let top = polar(center, 10.0, 0.0);
        assert!((top.y + 10.0).abs() < 1e-9);
        let right = polar(center, 10.0, 90.0);
        assert!((right.x - 10.0).abs() < 1e-9);
    }
}
