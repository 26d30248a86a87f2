//! Smoother: spline overlay of the weekly rate for the chart.
//!
//! Output is for drawing only. Reported numbers always come from the raw
//! derived series.

use chrono::{Days, NaiveDate};

use crate::domain::{DerivedSeries, SmoothedCurve, SmoothedPoint};
use crate::error::PipelineError;
use crate::math::spline::{CubicSpline, MIN_KNOTS};

/// Spacing between control points.
pub const CONTROL_SPACING_DAYS: u64 = 7;

/// Weekly control points inside `[window_start, window_end]` that have a defined rate.
pub fn control_points(
    series: &DerivedSeries,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Vec<(NaiveDate, f64)> {
    let mut out = Vec::new();
    let mut k = 0u64;
    while let Some(date) = window_start.checked_add_days(Days::new(k * CONTROL_SPACING_DAYS)) {
        if date > window_end {
            break;
        }
        if let Some(rate) = series.get(date).ok().and_then(|p| p.weekly_rate_per_100k) {
            out.push((date, rate));
        }
        k += 1;
    }
    out
}

/// Fit a spline through the weekly control points and resample it at `samples`
/// evenly spaced positions from the first control point through `window_end`.
///
/// The curve does not extend back before the first defined control point. When
/// the window length is not a whole number of weeks, the last few days past the
/// final knot are extrapolated from the end cubic.
pub fn smooth_weekly_rate(
    series: &DerivedSeries,
    window_start: NaiveDate,
    window_end: NaiveDate,
    samples: usize,
) -> Result<SmoothedCurve, PipelineError> {
    let knots = control_points(series, window_start, window_end);
    if knots.len() < MIN_KNOTS {
        return Err(PipelineError::InsufficientData {
            required: MIN_KNOTS,
            found: knots.len(),
        });
    }

    let xs: Vec<f64> = knots
        .iter()
        .map(|(date, _)| (*date - window_start).num_days() as f64)
        .collect();
    let ys: Vec<f64> = knots.iter().map(|(_, rate)| *rate).collect();

    let spline = CubicSpline::not_a_knot(&xs, &ys).ok_or(PipelineError::SingularSystem)?;
    let (x0, last_knot) = spline.domain();
    let x1 = last_knot.max((window_end - window_start).num_days() as f64);
    let n = samples.max(2);
    let span = x1 - x0;

    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let offset_days = x0 + span * i as f64 / (n - 1) as f64;
        points.push(SmoothedPoint {
            offset_days,
            value: spline.eval(offset_days),
        });
    }

    Ok(SmoothedCurve {
        label: series.label.clone(),
        window_start,
        control_points: knots,
        samples: points,
    })
}
