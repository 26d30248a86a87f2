//! Reshaper: wide tables to one long cases+deaths table.
//!
//! Cases and deaths are joined on `(county, state, date)`, never by position,
//! so the two source files may list their rows in different orders. Records and
//! joined rows borrow their labels from the wide tables, and a `RowScope` keeps
//! rows outside the regions of interest from being melted at all.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;

use crate::domain::{LongRow, RawRecord, WideRow, WideTable};
use crate::error::PipelineError;

type Key<'a> = (&'a str, &'a str, NaiveDate);

/// Which wide-table rows take part in the reshape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScope<'s> {
    All,
    /// Only rows whose state is one of these.
    States(&'s [&'s str]),
}

impl RowScope<'_> {
    pub fn includes(&self, row: &WideRow) -> bool {
        match self {
            RowScope::All => true,
            RowScope::States(states) => states.iter().any(|s| *s == row.state),
        }
    }
}

/// Joined rows plus bookkeeping about keys that had no partner.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput<'a> {
    pub rows: Vec<LongRow<'a>>,
    pub unmatched_cases: usize,
    pub unmatched_deaths: usize,
}

/// Melt the in-scope rows of a wide table into long records, in (row, date
/// column) order.
///
/// Undefined cells are skipped.
pub fn melt<'a>(table: &'a WideTable, scope: RowScope<'_>) -> Vec<RawRecord<'a>> {
    let mut out = Vec::new();
    for row in table.rows.iter().filter(|row| scope.includes(row)) {
        for (date, value) in table.dates.iter().zip(row.values.iter()) {
            if let Some(value) = value {
                out.push(RawRecord {
                    county: &row.county,
                    state: &row.state,
                    date: *date,
                    metric: table.metric,
                    value: *value,
                });
            }
        }
    }
    out
}

/// Inner-join cases and deaths records on their key.
///
/// Output order follows `cases`.
pub fn merge_long<'a>(
    cases: &[RawRecord<'a>],
    deaths: &[RawRecord<'a>],
) -> Result<MergeOutput<'a>, PipelineError> {
    let mut deaths_by_key: HashMap<Key<'a>, u64> = HashMap::with_capacity(deaths.len());
    for rec in deaths {
        match deaths_by_key.entry(key_of(rec)) {
            Entry::Occupied(_) => return Err(duplicate(rec)),
            Entry::Vacant(slot) => {
                slot.insert(rec.value);
            }
        }
    }

    let mut seen: HashSet<Key<'a>> = HashSet::with_capacity(cases.len());
    let mut rows = Vec::with_capacity(cases.len());
    let mut unmatched_cases = 0usize;

    for rec in cases {
        let key = key_of(rec);
        if !seen.insert(key) {
            return Err(duplicate(rec));
        }
        match deaths_by_key.get(&key) {
            Some(&deaths) => rows.push(LongRow {
                county: rec.county,
                state: rec.state,
                date: rec.date,
                cases: rec.value,
                deaths,
            }),
            None => unmatched_cases += 1,
        }
    }

    let unmatched_deaths = deaths_by_key.len() - rows.len();

    Ok(MergeOutput {
        rows,
        unmatched_cases,
        unmatched_deaths,
    })
}

/// Melt the in-scope rows of both tables and join them.
pub fn reshape<'a>(
    cases: &'a WideTable,
    deaths: &'a WideTable,
    scope: RowScope<'_>,
) -> Result<Vec<LongRow<'a>>, PipelineError> {
    let merged = merge_long(&melt(cases, scope), &melt(deaths, scope))?;
    if merged.unmatched_cases > 0 || merged.unmatched_deaths > 0 {
        tracing::warn!(
            message = "dropped records without a cases/deaths partner",
            unmatched_cases = merged.unmatched_cases,
            unmatched_deaths = merged.unmatched_deaths
        );
    }
    tracing::debug!(message = "reshaped to long format", rows = merged.rows.len());
    Ok(merged.rows)
}

fn key_of<'a>(rec: &RawRecord<'a>) -> Key<'a> {
    (rec.county, rec.state, rec.date)
}

fn duplicate(rec: &RawRecord<'_>) -> PipelineError {
    PipelineError::DuplicateKey {
        metric: rec.metric.as_str(),
        county: rec.county.to_string(),
        state: rec.state.to_string(),
        date: rec.date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Metric;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    fn table(metric: Metric, rows: Vec<(&str, &str, Vec<Option<u64>>)>) -> WideTable {
        WideTable {
            metric,
            dates: vec![d(1), d(2)],
            rows: rows
                .into_iter()
                .map(|(county, state, values)| WideRow {
                    county: county.to_string(),
                    state: state.to_string(),
                    values,
                })
                .collect(),
            row_errors: Vec::new(),
        }
    }

    #[test]
    fn melt_follows_row_then_date_order() {
        let t = table(
            Metric::Cases,
            vec![("King", "Washington", vec![Some(1), Some(2)]), ("Pierce", "Washington", vec![Some(3), None])],
        );
        let recs = melt(&t, RowScope::All);
        let summary: Vec<(&str, NaiveDate, u64)> =
            recs.iter().map(|r| (r.county, r.date, r.value)).collect();
        assert_eq!(
            summary,
            vec![("King", d(1), 1), ("King", d(2), 2), ("Pierce", d(1), 3)]
        );
    }

    #[test]
    fn join_is_keyed_not_positional() {
        let cases = table(
            Metric::Cases,
            vec![("King", "Washington", vec![Some(10), Some(12)]), ("Pierce", "Washington", vec![Some(5), Some(6)])],
        );
        // Deaths rows listed in the opposite order.
        let deaths = table(
            Metric::Deaths,
            vec![("Pierce", "Washington", vec![Some(1), Some(2)]), ("King", "Washington", vec![Some(3), Some(4)])],
        );

        let rows = reshape(&cases, &deaths, RowScope::All).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].county, "King");
        assert_eq!((rows[0].cases, rows[0].deaths), (10, 3));
        assert_eq!((rows[1].cases, rows[1].deaths), (12, 4));
        assert_eq!(rows[2].county, "Pierce");
        assert_eq!((rows[2].cases, rows[2].deaths), (5, 1));
        assert_eq!((rows[3].cases, rows[3].deaths), (6, 2));
    }

    #[test]
    fn unmatched_keys_are_counted_and_dropped() {
        let cases = table(
            Metric::Cases,
            vec![("King", "Washington", vec![Some(10), Some(12)]), ("Yakima", "Washington", vec![Some(5), Some(6)])],
        );
        let deaths = table(
            Metric::Deaths,
            vec![("King", "Washington", vec![Some(1), None]), ("Adams", "Washington", vec![Some(0), Some(0)])],
        );

        let merged = merge_long(&melt(&cases, RowScope::All), &melt(&deaths, RowScope::All)).unwrap();
        assert_eq!(merged.rows.len(), 1);
        assert_eq!(merged.rows[0].date, d(1));
        assert_eq!(merged.unmatched_cases, 3);
        assert_eq!(merged.unmatched_deaths, 2);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let cases = table(
            Metric::Cases,
            vec![("King", "Washington", vec![Some(1), Some(2)]), ("King", "Washington", vec![Some(1), Some(2)])],
        );
        let deaths = table(Metric::Deaths, vec![("King", "Washington", vec![Some(0), Some(0)])]);
        let err = reshape(&cases, &deaths, RowScope::All).unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateKey { metric: "cases", .. }));
    }

    #[test]
    fn scope_limits_rows_to_the_listed_states() {
        let cases = table(
            Metric::Cases,
            vec![
                ("King", "Washington", vec![Some(10), Some(12)]),
                ("Lane", "Oregon", vec![Some(5), Some(6)]),
                ("Pierce", "Washington", vec![Some(7), Some(8)]),
            ],
        );
        // Lane has no deaths row; out of scope it is not even counted as unmatched.
        let deaths = table(
            Metric::Deaths,
            vec![("Pierce", "Washington", vec![Some(1), Some(2)]), ("King", "Washington", vec![Some(3), Some(4)])],
        );

        let states = ["Washington"];
        let scope = RowScope::States(&states);
        assert_eq!(melt(&cases, scope).len(), 4);

        let merged = merge_long(&melt(&cases, scope), &melt(&deaths, scope)).unwrap();
        assert_eq!(merged.rows.len(), 4);
        assert_eq!((merged.unmatched_cases, merged.unmatched_deaths), (0, 0));
        assert!(merged.rows.iter().all(|r| r.state == "Washington"));

        let all = merge_long(&melt(&cases, RowScope::All), &melt(&deaths, RowScope::All)).unwrap();
        assert_eq!(all.unmatched_cases, 2);
    }

    #[test]
    fn joined_rows_borrow_labels_from_the_cases_table() {
        let cases = table(Metric::Cases, vec![("King", "Washington", vec![Some(10), Some(12)])]);
        let deaths = table(Metric::Deaths, vec![("King", "Washington", vec![Some(3), Some(4)])]);
        let rows = reshape(&cases, &deaths, RowScope::All).unwrap();
        assert!(std::ptr::eq(rows[0].county, cases.rows[0].county.as_str()));
        assert!(std::ptr::eq(rows[1].state, cases.rows[0].state.as_str()));
    }
}
