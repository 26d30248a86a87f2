//! PNG comparison chart of weekly rates, drawn with Plotters.
//!
//! Data prep (segments, bounds, clipping) is plain functions so it can be tested
//! without a font stack; `render_png` only draws.

use std::path::Path;

use chrono::{Days, NaiveDate};
use plotters::prelude::*;

use crate::domain::{DerivedSeries, SmoothedCurve};
use crate::error::AppError;

/// 6 x 5 inches at 100 dpi.
pub const CHART_SIZE: (u32, u32) = (600, 500);

pub const STATE_COLOR: &str = "#4d00ff";
pub const COUNTY_COLOR: &str = "#ffa600";
pub const SHADING_COLOR: &str = "#cfe1ff";

/// A shaded date span drawn behind the lines (e.g. a public-health order).
#[derive(Debug, Clone, PartialEq)]
pub struct ShadedSpan {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub color: RGBColor,
}

impl ShadedSpan {
    /// Washington State restrictions, 16 Nov 2020 to 4 Jan 2021.
    pub fn wa_restrictions() -> Option<Self> {
        Some(Self {
            label: "WA State Restrictions".to_string(),
            start: NaiveDate::from_ymd_opt(2020, 11, 16)?,
            end: NaiveDate::from_ymd_opt(2021, 1, 4)?,
            color: parse_hex_color(SHADING_COLOR)?,
        })
    }
}

/// One region's line plus its optional smoothed overlay.
#[derive(Debug, Clone)]
pub struct ChartLine<'a> {
    pub series: &'a DerivedSeries,
    pub color: RGBColor,
    pub smoothed: Option<&'a SmoothedCurve>,
}

#[derive(Debug, Clone)]
pub struct ChartSpec<'a> {
    pub title: String,
    pub y_label: String,
    /// Left edge of the x axis.
    pub window_start: NaiveDate,
    /// Right edge of the x axis.
    pub window_end: NaiveDate,
    pub lines: Vec<ChartLine<'a>>,
    pub shading: Option<ShadedSpan>,
}

/// Parse `#rrggbb`.
pub fn parse_hex_color(s: &str) -> Option<RGBColor> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some(RGBColor(r, g, b))
}

/// Contiguous runs of defined weekly rates inside the window, as
/// `(days since window_start, rate)`. Undefined rates split runs.
pub fn rate_segments(
    series: &DerivedSeries,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<Vec<(f64, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for p in series.window(window_start, window_end) {
        match p.weekly_rate_per_100k {
            Some(rate) => current.push(((p.date - window_start).num_days() as f64, rate)),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Overlay samples re-based onto the chart's window, clipped to it.
pub fn smoothed_points(curve: &SmoothedCurve, window_start: NaiveDate, window_end: NaiveDate) -> Vec<(f64, f64)> {
    let shift = (curve.window_start - window_start).num_days() as f64;
    let limit = (window_end - window_start).num_days() as f64;
    curve
        .samples
        .iter()
        .map(|p| (p.offset_days + shift, p.value))
        .filter(|(x, _)| *x >= 0.0 && *x <= limit)
        .collect()
}

/// Intersection of a shaded span with the window, in chart x units.
pub fn clip_span(span: &ShadedSpan, window_start: NaiveDate, window_end: NaiveDate) -> Option<(f64, f64)> {
    let start = span.start.max(window_start);
    let end = span.end.min(window_end);
    if start >= end {
        return None;
    }
    Some((
        (start - window_start).num_days() as f64,
        (end - window_start).num_days() as f64,
    ))
}

/// Upper y bound: 10% headroom over the largest plotted value, never below 1.
///
/// The lower bound is always 0.
pub fn y_upper(values: impl IntoIterator<Item = f64>) -> f64 {
    let max = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    (max * 1.1).max(1.0)
}

/// Tick label for an x value: `%d %b` of `window_start + x` days.
pub fn date_label(window_start: NaiveDate, x: f64) -> String {
    if !x.is_finite() || x < 0.0 {
        return String::new();
    }
    window_start
        .checked_add_days(Days::new(x.round() as u64))
        .map(|d| d.format("%d %b").to_string())
        .unwrap_or_default()
}

/// Draw the chart and write it to `path` as PNG.
pub fn render_png(path: &Path, spec: &ChartSpec<'_>) -> Result<(), AppError> {
    draw(path, spec).map_err(|e| {
        AppError::new(4, format!("Failed to render chart '{}': {e}", path.display()))
    })?;
    tracing::info!(message = "chart written", path = %path.display());
    Ok(())
}

fn draw(path: &Path, spec: &ChartSpec<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let x_max = (spec.window_end - spec.window_start).num_days().max(1) as f64;

    let raw: Vec<Vec<Vec<(f64, f64)>>> = spec
        .lines
        .iter()
        .map(|l| rate_segments(l.series, spec.window_start, spec.window_end))
        .collect();
    let smooth: Vec<Option<Vec<(f64, f64)>>> = spec
        .lines
        .iter()
        .map(|l| l.smoothed.map(|c| smoothed_points(c, spec.window_start, spec.window_end)))
        .collect();

    let y_max = y_upper(
        raw.iter()
            .flatten()
            .flatten()
            .map(|&(_, y)| y)
            .chain(smooth.iter().flatten().flatten().map(|&(_, y)| y)),
    );

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&spec.title, ("sans-serif", 16))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)?;

    let window_start = spec.window_start;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(6)
        .y_labels(8)
        .x_label_formatter(&|x| date_label(window_start, *x))
        .y_label_formatter(&|y| format!("{y:.0}"))
        .y_desc(spec.y_label.as_str())
        .light_line_style(WHITE)
        .draw()?;

    if let Some(span) = &spec.shading {
        if let Some((a, b)) = clip_span(span, spec.window_start, spec.window_end) {
            let fill = span.color.filled();
            chart
                .draw_series(std::iter::once(Rectangle::new([(a, 0.0), (b, y_max)], fill)))?
                .label(span.label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], fill));
        }
    }

    for ((line, segments), overlay) in spec.lines.iter().zip(&raw).zip(&smooth) {
        let has_overlay = overlay.as_ref().is_some_and(|pts| !pts.is_empty());
        let raw_style = if has_overlay {
            line.color.mix(0.4).stroke_width(2)
        } else {
            line.color.stroke_width(2)
        };

        for (i, segment) in segments.iter().enumerate() {
            let drawn = chart.draw_series(LineSeries::new(segment.iter().copied(), raw_style))?;
            if i == 0 {
                drawn
                    .label(line.series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], raw_style));
            }
        }

        if let Some(points) = overlay.as_ref().filter(|pts| !pts.is_empty()) {
            let style = line.color.stroke_width(2);
            chart
                .draw_series(LineSeries::new(points.iter().copied(), style))?
                .label(format!("{} (smoothed)", line.series.label))
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], style));
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
