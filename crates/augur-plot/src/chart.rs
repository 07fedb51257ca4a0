//! Chart models and their layout into SVG.
//!
//! Two chart shapes cover every interpretation result: a horizontal bar
//! chart (optionally with whiskers) and a multi-series line chart.

use crate::svg::{Anchor, SvgDocument};

const BAR_FILL: &str = "#4c72b0";
const NEGATIVE_FILL: &str = "#c44e52";
const AXIS: &str = "#333333";
const GRID: &str = "#e5e5e5";
const EMPHASIS: &str = "#d62728";
const BACKGROUND: &str = "#7f7f7f";

/// One bar of a [`BarChart`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Category label drawn left of the bar.
    pub label: String,
    /// Bar length, measured from zero.
    pub value: f64,
    /// Optional `(low, high)` interval drawn as a whisker.
    pub whisker: Option<(f64, f64)>,
}

/// Horizontal bar chart, first bar at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    /// Chart title.
    pub title: String,
    /// Label of the value axis.
    pub x_label: String,
    /// Bars in drawing order.
    pub bars: Vec<Bar>,
}

/// How a [`Series`] is stroked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    /// Thin translucent grey line (ICE curves).
    Background,
    /// Thick coloured line (PDP and ALE curves).
    Emphasis,
}

/// One polyline of a [`LineChart`].
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// `(x, y)` points in drawing order.
    pub points: Vec<(f64, f64)>,
    /// Stroke style.
    pub style: SeriesStyle,
}

/// Line chart over a shared numeric x axis.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    /// Chart title.
    pub title: String,
    /// Label of the x axis.
    pub x_label: String,
    /// Label of the y axis.
    pub y_label: String,
    /// Series drawn in order, so emphasised series should come last.
    pub series: Vec<Series>,
}

/// A chart ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// Horizontal bars.
    Bars(BarChart),
    /// Lines.
    Lines(LineChart),
}

impl Chart {
    /// Render to an SVG document of `width` × `height` pixels.
    #[must_use]
    pub fn render(&self, width: f64, height: f64) -> String {
        match self {
            Chart::Bars(chart) => render_bars(chart, width, height),
            Chart::Lines(chart) => render_lines(chart, width, height),
        }
    }
}

/// Pixel rectangle of the plotting area.
struct Frame {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Frame {
    fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// Linear map from a data range onto a pixel range.
struct Scale {
    lo: f64,
    hi: f64,
    px_lo: f64,
    px_hi: f64,
}

impl Scale {
    /// Values past the range, infinities included, land on its edge.
    /// NaN maps like the range's low end.
    fn map(&self, v: f64) -> f64 {
        let v = if v.is_nan() { self.lo } else { v.clamp(self.lo, self.hi) };
        self.px_lo + (v - self.lo) / (self.hi - self.lo) * (self.px_hi - self.px_lo)
    }
}

/// Tick positions covering `[lo, hi]` with a 1/2/5 step.
///
/// Returns the widened range and the ticks. A degenerate range is widened
/// around its value first.
fn nice_ticks(lo: f64, hi: f64, target: usize) -> (f64, f64, Vec<f64>) {
    let (lo, hi) = if !(lo.is_finite() && hi.is_finite()) {
        (0.0, 1.0)
    } else if (hi - lo).abs() < f64::EPSILON * lo.abs().max(1.0) {
        let pad = (lo.abs() * 0.1).max(0.5);
        (lo - pad, hi + pad)
    } else {
        (lo, hi)
    };
    let raw = (hi - lo) / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&s| s >= raw)
        .unwrap_or(10.0 * magnitude);
    let start = (lo / step).floor() * step;
    let end = (hi / step).ceil() * step;
    let n = ((end - start) / step).round() as usize;
    let ticks = (0..=n).map(|i| start + i as f64 * step).collect();
    (start, end, ticks)
}

fn format_tick(v: f64, step: f64) -> String {
    let decimals = (-step.log10().floor()).clamp(0.0, 6.0) as usize;
    let s = format!("{v:.decimals$}");
    // Avoid "-0" and "-0.00".
    if s.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        s.trim_start_matches('-').to_string()
    } else {
        s
    }
}

fn tick_step(ticks: &[f64]) -> f64 {
    match ticks {
        [a, b, ..] => b - a,
        _ => 1.0,
    }
}

fn draw_title(doc: &mut SvgDocument, width: f64, title: &str) {
    doc.text(width / 2.0, 24.0, 15.0, Anchor::Middle, title);
}

/// Vertical grid lines and labels for a horizontal value axis.
fn draw_x_axis(doc: &mut SvgDocument, frame: &Frame, scale: &Scale, ticks: &[f64], label: &str) {
    let step = tick_step(ticks);
    for &t in ticks {
        let x = scale.map(t);
        doc.line(x, frame.top, x, frame.bottom, GRID, 1.0);
        doc.line(x, frame.bottom, x, frame.bottom + 4.0, AXIS, 1.0);
        doc.text(x, frame.bottom + 16.0, 10.0, Anchor::Middle, &format_tick(t, step));
    }
    doc.line(frame.left, frame.bottom, frame.right, frame.bottom, AXIS, 1.0);
    doc.text(
        (frame.left + frame.right) / 2.0,
        frame.bottom + 34.0,
        12.0,
        Anchor::Middle,
        label,
    );
}

fn render_bars(chart: &BarChart, width: f64, height: f64) -> String {
    let mut doc = SvgDocument::new(width, height);
    draw_title(&mut doc, width, &chart.title);

    let frame = Frame {
        left: (width * 0.38).min(width - 80.0).max(40.0),
        top: 40.0,
        right: width - 20.0,
        bottom: height - 50.0,
    };

    // Non-finite values stay out of the range and are drawn clipped to it.
    let (mut lo, mut hi) = (0.0_f64, 0.0_f64);
    for bar in &chart.bars {
        let whisker = bar.whisker.map_or([f64::NAN; 2], |(low, high)| [low, high]);
        for v in std::iter::once(bar.value).chain(whisker).filter(|v| v.is_finite()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    let (lo, hi, ticks) = nice_ticks(lo, hi, 5);
    let scale = Scale {
        lo,
        hi,
        px_lo: frame.left,
        px_hi: frame.right,
    };
    draw_x_axis(&mut doc, &frame, &scale, &ticks, &chart.x_label);

    let n = chart.bars.len().max(1) as f64;
    let slot = frame.height() / n;
    let bar_height = slot * 0.7;
    let font = (slot * 0.6).clamp(7.0, 11.0);
    let zero = scale.map(0.0);

    for (i, bar) in chart.bars.iter().enumerate() {
        let centre = frame.top + slot * (i as f64 + 0.5);
        let end = if bar.value.is_nan() { zero } else { scale.map(bar.value) };
        let fill = if bar.value < 0.0 { NEGATIVE_FILL } else { BAR_FILL };
        doc.rect(
            zero.min(end),
            centre - bar_height / 2.0,
            (end - zero).abs(),
            bar_height,
            fill,
            None,
        );
        if let Some((low, high)) = bar.whisker {
            let (x1, x2) = (scale.map(low), scale.map(high));
            let cap = bar_height * 0.3;
            doc.line(x1, centre, x2, centre, AXIS, 1.2);
            doc.line(x1, centre - cap, x1, centre + cap, AXIS, 1.2);
            doc.line(x2, centre - cap, x2, centre + cap, AXIS, 1.2);
        }
        doc.text(frame.left - 6.0, centre + font / 3.0, font, Anchor::End, &bar.label);
    }
    doc.line(zero, frame.top, zero, frame.bottom, AXIS, 1.0);
    doc.finish()
}

fn render_lines(chart: &LineChart, width: f64, height: f64) -> String {
    let mut doc = SvgDocument::new(width, height);
    draw_title(&mut doc, width, &chart.title);

    let frame = Frame {
        left: 70.0,
        top: 40.0,
        right: width - 20.0,
        bottom: height - 50.0,
    };

    let points = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter())
        .filter(|(x, y)| x.is_finite() && y.is_finite());
    let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    for &(x, y) in points {
        x_lo = x_lo.min(x);
        x_hi = x_hi.max(x);
        y_lo = y_lo.min(y);
        y_hi = y_hi.max(y);
    }
    if !x_lo.is_finite() {
        (x_lo, x_hi, y_lo, y_hi) = (0.0, 1.0, 0.0, 1.0);
    }

    let (x_lo, x_hi, x_ticks) = nice_ticks(x_lo, x_hi, 5);
    let (y_lo, y_hi, y_ticks) = nice_ticks(y_lo, y_hi, 5);
    let x_scale = Scale {
        lo: x_lo,
        hi: x_hi,
        px_lo: frame.left,
        px_hi: frame.right,
    };
    let y_scale = Scale {
        lo: y_lo,
        hi: y_hi,
        px_lo: frame.bottom,
        px_hi: frame.top,
    };

    let y_step = tick_step(&y_ticks);
    for &t in &y_ticks {
        let y = y_scale.map(t);
        doc.line(frame.left, y, frame.right, y, GRID, 1.0);
        doc.line(frame.left - 4.0, y, frame.left, y, AXIS, 1.0);
        doc.text(frame.left - 6.0, y + 3.5, 10.0, Anchor::End, &format_tick(t, y_step));
    }
    doc.line(frame.left, frame.top, frame.left, frame.bottom, AXIS, 1.0);
    doc.vertical_text(16.0, frame.top + frame.height() / 2.0, 12.0, &chart.y_label);
    draw_x_axis(&mut doc, &frame, &x_scale, &x_ticks, &chart.x_label);

    for series in &chart.series {
        let (stroke, stroke_width, opacity) = match series.style {
            SeriesStyle::Background => (BACKGROUND, 0.6, 0.35),
            SeriesStyle::Emphasis => (EMPHASIS, 2.5, 1.0),
        };
        let mapped: Vec<(f64, f64)> = series
            .points
            .iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|&(x, y)| (x_scale.map(x), y_scale.map(y)))
            .collect();
        match mapped.as_slice() {
            [] => {}
            [(x, y)] => {
                if series.style == SeriesStyle::Emphasis {
                    doc.circle(*x, *y, 4.0, stroke);
                }
            }
            _ => doc.polyline(&mapped, stroke, stroke_width, opacity),
        }
    }
    doc.finish()
}
