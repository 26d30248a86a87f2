//! Rate deriver: daily deltas, 7-day rolling sums, weekly rate per 100k.
//!
//! Everything is index based on a strictly date-ordered series. A daily value is
//! only defined between consecutive calendar days, so a missing date leaves the
//! next daily value and the following rolling sums undefined instead of
//! stretching them over more days. Negative daily values (upstream corrections)
//! flow through the sums and rates unclamped.

use crate::domain::{DailySeriesPoint, DerivedSeries, DerivedSeriesPoint, Population};
use crate::error::PipelineError;

/// Width of the trailing rolling window, in points.
pub const ROLLING_WINDOW: usize = 7;

/// Rates are expressed per this many residents.
pub const RATE_BASE: f64 = 100_000.0;

/// First difference of cumulative cases.
///
/// `None` at index 0 and wherever the previous point is not the previous day.
pub fn daily_new_cases(points: &[DailySeriesPoint]) -> Vec<Option<i64>> {
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| &points[j]);
        match prev {
            Some(prev) if prev.date.succ_opt() == Some(p.date) => {
                out.push(Some(p.cumulative_cases as i64 - prev.cumulative_cases as i64));
            }
            _ => out.push(None),
        }
    }
    out
}

/// Trailing sum over `ROLLING_WINDOW` values; `None` unless every term is defined.
///
/// Seven defined daily values always cover seven consecutive days.
pub fn rolling_sum(daily: &[Option<i64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(daily.len());
    for i in 0..daily.len() {
        if i + 1 < ROLLING_WINDOW {
            out.push(None);
            continue;
        }
        let window = &daily[i + 1 - ROLLING_WINDOW..=i];
        let sum: Option<i64> = window.iter().copied().sum();
        out.push(sum.map(|s| s as f64));
    }
    out
}

/// `rolling × 100000 / population`.
pub fn weekly_rate(rolling: Option<f64>, population: Population) -> Option<f64> {
    rolling.map(|r| r * RATE_BASE / population.get() as f64)
}

/// Derive the full series for one region.
pub fn derive_series(
    label: &str,
    points: &[DailySeriesPoint],
    population: Population,
) -> Result<DerivedSeries, PipelineError> {
    for pair in points.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(PipelineError::UnorderedDates {
                prev: pair[0].date,
                next: pair[1].date,
            });
        }
    }

    let gaps = points
        .windows(2)
        .filter(|pair| pair[0].date.succ_opt() != Some(pair[1].date))
        .count();
    if gaps > 0 {
        tracing::warn!(message = "series skips dates; rates near them are undefined", region = label, gaps);
    }

    let daily = daily_new_cases(points);
    let rolling = rolling_sum(&daily);

    let derived = points
        .iter()
        .zip(daily)
        .zip(rolling)
        .map(|((p, daily), rolling)| DerivedSeriesPoint {
            date: p.date,
            cumulative_cases: p.cumulative_cases,
            cumulative_deaths: p.cumulative_deaths,
            daily_new_cases: daily,
            rolling_7day_new_cases: rolling,
            weekly_rate_per_100k: weekly_rate(rolling, population),
        })
        .collect();

    Ok(DerivedSeries {
        label: label.to_string(),
        population,
        points: derived,
    })
}
