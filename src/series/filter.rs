//! Region filter: long rows to one cumulative series per region.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::domain::{DailySeriesPoint, LongRow, Region};
use crate::error::PipelineError;

/// Select (county mode) or aggregate (state mode) rows into a date-ordered series.
///
/// An empty selection is a configuration error, not an empty series.
pub fn filter_region(rows: &[LongRow<'_>], region: &Region) -> Result<Vec<DailySeriesPoint>, PipelineError> {
    let series = match region {
        Region::County { county, state } => select_county(rows, county, state),
        Region::State { state } => aggregate_state(rows, state),
    };

    if series.is_empty() {
        return Err(PipelineError::EmptyRegion {
            region: region.to_string(),
        });
    }

    if let (Some(first), Some(last)) = (series.first(), series.last()) {
        tracing::debug!(
            message = "filtered region",
            region = %region,
            points = series.len(),
            first = %first.date,
            last = %last.date
        );
    }

    Ok(series)
}

fn select_county(rows: &[LongRow<'_>], county: &str, state: &str) -> Vec<DailySeriesPoint> {
    // Joined rows are unique per (county, state, date); the map only orders them.
    rows.iter()
        .filter(|r| r.state == state && r.county == county)
        .map(|r| {
            (
                r.date,
                DailySeriesPoint {
                    date: r.date,
                    cumulative_cases: r.cases,
                    cumulative_deaths: r.deaths,
                },
            )
        })
        .collect::<BTreeMap<_, _>>()
        .into_values()
        .collect()
}

#[derive(Default)]
struct DateTotals {
    cases: u64,
    deaths: u64,
    counties: usize,
}

/// Sum every county of `state` per date.
///
/// A date on which some county has no joined row would produce a short sum, so
/// it is left out of the series instead; the rate deriver treats it as a gap.
fn aggregate_state(rows: &[LongRow<'_>], state: &str) -> Vec<DailySeriesPoint> {
    let mut counties: HashSet<&str> = HashSet::new();
    let mut totals: BTreeMap<NaiveDate, DateTotals> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.state == state) {
        counties.insert(row.county);
        let t = totals.entry(row.date).or_default();
        t.cases += row.cases;
        t.deaths += row.deaths;
        t.counties += 1;
    }

    let expected = counties.len();
    let incomplete = totals.values().filter(|t| t.counties < expected).count();
    if incomplete > 0 {
        tracing::warn!(
            message = "dropped state dates missing some counties",
            state,
            dates = incomplete,
            counties = expected
        );
    }

    totals
        .into_iter()
        .filter(|(_, t)| t.counties == expected)
        .map(|(date, t)| DailySeriesPoint {
            date,
            cumulative_cases: t.cases,
            cumulative_deaths: t.deaths,
        })
        .collect()
}
