//! Shared domain types.
//!
//! Every pipeline stage takes one of these by reference and returns a fresh
//! value; nothing here is mutated after construction.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use crate::error::PipelineError;

/// Which cumulative count a wide table carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Cases,
    Deaths,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Cases => "cases",
            Metric::Deaths => "deaths",
        }
    }
}

/// One row of a wide table: a reporting location plus one cell per date column.
///
/// `values[i]` belongs to `WideTable::dates[i]`. `None` marks a cell that could
/// not be parsed during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub county: String,
    pub state: String,
    pub values: Vec<Option<u64>>,
}

/// A row-level problem found during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub key: Option<String>,
    pub message: String,
}

/// A wide-format table (one row per location, one column per date).
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub metric: Metric,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<WideRow>,
    pub row_errors: Vec<RowError>,
}

/// One value for one location on one date.
///
/// Labels borrow from the `WideTable` the record was melted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub county: &'a str,
    pub state: &'a str,
    pub date: NaiveDate,
    pub metric: Metric,
    pub value: u64,
}

/// Long-format row after cases and deaths have been joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongRow<'a> {
    pub county: &'a str,
    pub state: &'a str,
    pub date: NaiveDate,
    pub cases: u64,
    pub deaths: u64,
}

/// Region selector for the filter stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Region {
    /// A single reporting county.
    County { county: String, state: String },
    /// All counties of a state, summed per date.
    State { state: String },
}

impl Region {
    pub fn state(&self) -> &str {
        match self {
            Region::County { state, .. } | Region::State { state } => state,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::County { county, state } => write!(f, "county '{county}' in state '{state}'"),
            Region::State { state } => write!(f, "state '{state}'"),
        }
    }
}

/// Population used to normalize a region's rate. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Population(u64);

impl Population {
    pub fn new(value: u64, label: &str) -> Result<Self, PipelineError> {
        if value == 0 {
            return Err(PipelineError::InvalidPopulation {
                label: label.to_string(),
            });
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Cumulative counts for one date of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySeriesPoint {
    pub date: NaiveDate,
    pub cumulative_cases: u64,
    pub cumulative_deaths: u64,
}

/// A daily point plus the derived incidence figures.
///
/// `None` means undefined (start of series, or too close after a missing
/// date), never zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedSeriesPoint {
    pub date: NaiveDate,
    pub cumulative_cases: u64,
    pub cumulative_deaths: u64,
    pub daily_new_cases: Option<i64>,
    pub rolling_7day_new_cases: Option<f64>,
    pub weekly_rate_per_100k: Option<f64>,
}

/// A labelled, date-ordered derived series for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub label: String,
    pub population: Population,
    pub points: Vec<DerivedSeriesPoint>,
}

impl DerivedSeries {
    /// Exact-date lookup. Dates are strictly increasing so a binary search is enough.
    pub fn get(&self, date: NaiveDate) -> Result<&DerivedSeriesPoint, PipelineError> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .map(|idx| &self.points[idx])
            .map_err(|_| PipelineError::MissingDate {
                label: self.label.clone(),
                date,
            })
    }

    /// Points with `start <= date <= end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> &[DerivedSeriesPoint] {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        if lo >= hi {
            return &[];
        }
        &self.points[lo..hi]
    }
}

/// A sample of the smoothed overlay curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPoint {
    /// Fractional days since the smoothing window start.
    pub offset_days: f64,
    pub value: f64,
}

/// Visualization-only spline overlay for one region.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothedCurve {
    pub label: String,
    pub window_start: NaiveDate,
    /// The weekly knots the spline passes through: (date, rate).
    pub control_points: Vec<(NaiveDate, f64)>,
    pub samples: Vec<SmoothedPoint>,
}

/// Where the two wide tables come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    Remote { cases_url: String, deaths_url: String },
    Local { cases_csv: PathBuf, deaths_csv: PathBuf },
}

/// One region to report on: filter selector, display label, population.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionConfig {
    pub region: Region,
    pub label: String,
    pub population: Population,
}

/// Fully resolved configuration for a run.
///
/// `as_of` is the last reported day ("yesterday"). It is resolved once at the
/// app boundary; nothing below reads the wall clock.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub source: SourceSpec,
    pub county: RegionConfig,
    pub state: RegionConfig,
    pub as_of: NaiveDate,
    pub window_months: u32,
}
