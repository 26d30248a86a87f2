//! Reporting: the per-region figures that go into the posted status.
//!
//! Figures come from the raw derived series. The smoothed overlay never
//! reaches this module.

use chrono::{Days, NaiveDate};

use crate::domain::DerivedSeries;
use crate::error::PipelineError;

pub mod format;

pub use format::*;

/// Yesterday's headline numbers for one region, with day-over-day changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySummary {
    pub label: String,
    pub date: NaiveDate,
    pub prior_date: NaiveDate,
    /// New cases reported on `date`.
    pub cases_reported: i64,
    /// `cases_reported` minus the prior day's new cases.
    pub cases_delta: i64,
    pub total_deaths: u64,
    /// Deaths reported on `date` (change in the cumulative count).
    pub deaths_delta: i64,
}

/// Build the summary for `as_of` and the day before it.
///
/// Both days must be present with a defined daily value; there is no
/// extrapolation when upstream data lags.
pub fn summarize(series: &DerivedSeries, as_of: NaiveDate) -> Result<DailySummary, PipelineError> {
    let prior_date = as_of
        .checked_sub_days(Days::new(1))
        .ok_or_else(|| PipelineError::MissingDate {
            label: series.label.clone(),
            date: as_of,
        })?;

    let today = series.get(as_of)?;
    let prior = series.get(prior_date)?;

    let cases_today = daily_value(series, today.daily_new_cases, as_of)?;
    let cases_prior = daily_value(series, prior.daily_new_cases, prior_date)?;

    Ok(DailySummary {
        label: series.label.clone(),
        date: as_of,
        prior_date,
        cases_reported: cases_today,
        cases_delta: cases_today - cases_prior,
        total_deaths: today.cumulative_deaths,
        deaths_delta: today.cumulative_deaths as i64 - prior.cumulative_deaths as i64,
    })
}

fn daily_value(series: &DerivedSeries, value: Option<i64>, date: NaiveDate) -> Result<i64, PipelineError> {
    value.ok_or_else(|| PipelineError::UndefinedValue {
        label: series.label.clone(),
        field: "daily new cases",
        date,
    })
}
