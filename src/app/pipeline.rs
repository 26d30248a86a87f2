//! Shared pipeline logic used by every subcommand.
//!
//! Source Loader -> Reshaper -> Region Filter -> Rate Deriver, then the optional
//! Smoother and the status text. Subcommands only decide what to do with the
//! results (print, export, render, post).

use chrono::{Months, NaiveDate};

use crate::data::{SourceTables, load_tables};
use crate::domain::{DerivedSeries, LongRow, RegionConfig, RunConfig, SmoothedCurve};
use crate::error::{AppError, PipelineError};
use crate::report::{format_status, summarize};
use crate::series::{RowScope, derive_series, filter_region, reshape, smooth_weekly_rate};

/// Derived series for both configured regions.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub county: DerivedSeries,
    pub state: DerivedSeries,
}

/// Fetch/load the source tables and derive both series.
pub fn load_and_derive(config: &RunConfig) -> Result<RunOutput, AppError> {
    let tables = load_tables(&config.source)?;
    derive_from_tables(config, &tables)
}

/// Derive both series from already-loaded tables.
///
/// Only rows of the configured states are reshaped.
pub fn derive_from_tables(config: &RunConfig, tables: &SourceTables) -> Result<RunOutput, AppError> {
    let states = [config.county.region.state(), config.state.region.state()];
    let rows = reshape(&tables.cases, &tables.deaths, RowScope::States(&states))?;
    Ok(RunOutput {
        county: derive_region(&rows, &config.county)?,
        state: derive_region(&rows, &config.state)?,
    })
}

pub fn derive_region(rows: &[LongRow<'_>], region: &RegionConfig) -> Result<DerivedSeries, PipelineError> {
    let daily = filter_region(rows, &region.region)?;
    let series = derive_series(&region.label, &daily, region.population)?;
    tracing::info!(
        message = "derived series",
        region = %region.label,
        points = series.points.len(),
        population = region.population.get()
    );
    Ok(series)
}

/// `[as_of - window_months, as_of]`.
pub fn report_window(config: &RunConfig) -> (NaiveDate, NaiveDate) {
    let start = config
        .as_of
        .checked_sub_months(Months::new(config.window_months))
        .unwrap_or(NaiveDate::MIN);
    (start, config.as_of)
}

/// The posted text for `as_of`: county block, state block, attribution.
pub fn status_text(output: &RunOutput, as_of: NaiveDate) -> Result<String, AppError> {
    let county = summarize(&output.county, as_of)?;
    let state = summarize(&output.state, as_of)?;
    Ok(format_status(&[county, state]))
}

/// Smooth one series over the report window.
///
/// Failures are not fatal: the chart falls back to the raw line.
pub fn try_smooth(series: &DerivedSeries, config: &RunConfig, samples: usize) -> Option<SmoothedCurve> {
    let (start, end) = report_window(config);
    match smooth_weekly_rate(series, start, end, samples) {
        Ok(curve) => Some(curve),
        Err(e) => {
            tracing::warn!(
                message = "skipping smoothed overlay",
                region = %series.label,
                error = %e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Metric, Population, Region, SourceSpec};
    use crate::io::ingest::parse_wide_table;
    use chrono::Days;
    use std::path::PathBuf;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// 40 days of data from 2021-02-01 for two WA counties and one OR county.
    /// The deaths file lists its rows in a different order.
    fn tables() -> SourceTables {
        let start = d(2021, 2, 1);
        let dates: Vec<String> = (0..40u64)
            .map(|i| {
                let date = start.checked_add_days(Days::new(i)).unwrap();
                date.format("%-m/%-d/%y").to_string()
            })
            .collect();
        let header = format!("Admin2,Province_State,{}", dates.join(","));
        let deaths_header = format!("Admin2,Province_State,Population,{}", dates.join(","));

        let king_cases: Vec<String> = (0..40u64).map(|i| (1000 + 100 * i).to_string()).collect();
        let pierce_cases: Vec<String> = (0..40u64).map(|i| (500 + 20 * i).to_string()).collect();
        let lane_cases: Vec<String> = (0..40u64).map(|i| (9000 + i).to_string()).collect();
        let king_deaths: Vec<String> = (0..40u64).map(|i| (10 + i / 2).to_string()).collect();
        let pierce_deaths: Vec<String> = (0..40u64).map(|i| (5 + i / 4).to_string()).collect();
        let lane_deaths: Vec<String> = (0..40u64).map(|_| "1".to_string()).collect();

        let cases = format!(
            "{header}\nKing,Washington,{}\nPierce,Washington,{}\nLane,Oregon,{}\n",
            king_cases.join(","),
            pierce_cases.join(","),
            lane_cases.join(",")
        );
        let deaths = format!(
            "{deaths_header}\nLane,Oregon,380000,{}\nPierce,Washington,900000,{}\nKing,Washington,2250000,{}\n",
            lane_deaths.join(","),
            pierce_deaths.join(","),
            king_deaths.join(",")
        );

        SourceTables {
            cases: parse_wide_table(cases.as_bytes(), Metric::Cases).unwrap(),
            deaths: parse_wide_table(deaths.as_bytes(), Metric::Deaths).unwrap(),
        }
    }

    fn config(county: &str, as_of: NaiveDate) -> RunConfig {
        RunConfig {
            source: SourceSpec::Local {
                cases_csv: PathBuf::from("unused.csv"),
                deaths_csv: PathBuf::from("unused.csv"),
            },
            county: RegionConfig {
                region: Region::County {
                    county: county.to_string(),
                    state: "Washington".to_string(),
                },
                label: "King County".to_string(),
                population: Population::new(2_277_200, "King County").unwrap(),
            },
            state: RegionConfig {
                region: Region::State {
                    state: "Washington".to_string(),
                },
                label: "Washington State".to_string(),
                population: Population::new(7_656_200, "Washington State").unwrap(),
            },
            as_of,
            window_months: 1,
        }
    }

    #[test]
    fn derives_county_and_state_series() {
        let out = derive_from_tables(&config("King", d(2021, 3, 12)), &tables()).unwrap();
        assert_eq!(out.county.points.len(), 40);
        assert_eq!(out.state.points.len(), 40);

        let king = out.county.get(d(2021, 2, 10)).unwrap();
        assert_eq!(king.daily_new_cases, Some(100));
        assert_eq!(king.rolling_7day_new_cases, Some(700.0));
        assert_eq!(king.weekly_rate_per_100k, Some(700.0 * 100_000.0 / 2_277_200.0));
        // Keyed join: King's deaths, not Lane's, despite the row order.
        assert_eq!(king.cumulative_deaths, 10 + 9 / 2);

        let wa = out.state.get(d(2021, 2, 10)).unwrap();
        assert_eq!(wa.cumulative_cases, (1000 + 900) + (500 + 180));
        assert_eq!(wa.daily_new_cases, Some(120));
        assert_eq!(wa.rolling_7day_new_cases, Some(840.0));
    }

    #[test]
    fn status_text_for_as_of() {
        let cfg = config("King", d(2021, 3, 12));
        let out = derive_from_tables(&cfg, &tables()).unwrap();
        let text = status_text(&out, cfg.as_of).unwrap();
        // 2021-03-12 is day index 39: King deaths 10 + 19 = 29, previous 10 + 19 = 29.
        assert!(text.starts_with("King County, 12 Mar:\nCases Reported: 100 (+0 from 11 Mar)\n"));
        assert!(text.contains("Total Deaths:   29 (+0 from 11 Mar)\n"));
        assert!(text.contains("Washington State, 12 Mar:\nCases Reported: 120 (+0 from 11 Mar)\n"));
        assert!(text.ends_with("Data from Johns Hopkins University."));
    }

    #[test]
    fn lagging_data_is_a_missing_date() {
        let cfg = config("King", d(2021, 3, 13));
        let out = derive_from_tables(&cfg, &tables()).unwrap();
        let err = status_text(&out, cfg.as_of).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn unknown_county_fails_fast() {
        let err = derive_from_tables(&config("Nowhere", d(2021, 3, 12)), &tables()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn smoothing_over_report_window() {
        let cfg = config("King", d(2021, 3, 12));
        let out = derive_from_tables(&cfg, &tables()).unwrap();
        assert_eq!(report_window(&cfg), (d(2021, 2, 12), d(2021, 3, 12)));

        let curve = try_smooth(&out.county, &cfg, 50).unwrap();
        // 12 Feb, 19 Feb, 26 Feb, 5 Mar, 12 Mar.
        assert_eq!(curve.control_points.len(), 5);
        // Constant rate in, constant curve out.
        let rate = 700.0 * 100_000.0 / 2_277_200.0;
        assert!(curve.samples.iter().all(|p| (p.value - rate).abs() < 1e-9));
    }

    #[test]
    fn short_window_skips_smoothing() {
        let cfg = config("King", d(2021, 2, 20));
        let out = derive_from_tables(&cfg, &tables()).unwrap();
        // Window starts 20 Jan, before the data; only 10 Feb and 17 Feb have a rate.
        assert!(try_smooth(&out.county, &cfg, 50).is_none());
    }

    /// 16 days of King and Pierce counts from 2021-03-01 with one unparseable
    /// King cases cell on 6 Mar.
    fn tables_with_bad_cell() -> SourceTables {
        let start = d(2021, 3, 1);
        let dates: Vec<String> = (0..16u64)
            .map(|i| start.checked_add_days(Days::new(i)).unwrap().format("%-m/%-d/%y").to_string())
            .collect();
        let header = format!("Admin2,Province_State,{}", dates.join(","));
        let king: Vec<String> = (0..16u64)
            .map(|i| if i == 5 { "n/a".to_string() } else { (10 * i).to_string() })
            .collect();
        let pierce: Vec<String> = (0..16u64).map(|i| (5 * i).to_string()).collect();
        let zeros = vec!["0"; 16].join(",");

        let cases = format!("{header}\nKing,Washington,{}\nPierce,Washington,{}\n", king.join(","), pierce.join(","));
        let deaths = format!("{header}\nKing,Washington,{zeros}\nPierce,Washington,{zeros}\n");
        SourceTables {
            cases: parse_wide_table(cases.as_bytes(), Metric::Cases).unwrap(),
            deaths: parse_wide_table(deaths.as_bytes(), Metric::Deaths).unwrap(),
        }
    }

    #[test]
    fn bad_cell_leaves_a_gap_not_a_stretched_window() {
        let cfg = config("King", d(2021, 3, 16));
        let out = derive_from_tables(&cfg, &tables_with_bad_cell()).unwrap();

        for series in [&out.county, &out.state] {
            assert_eq!(series.points.len(), 15);
            assert!(series.get(d(2021, 3, 6)).is_err());
            assert_eq!(series.get(d(2021, 3, 7)).unwrap().daily_new_cases, None);
            assert_eq!(series.get(d(2021, 3, 13)).unwrap().rolling_7day_new_cases, None);
        }

        assert_eq!(out.county.get(d(2021, 3, 9)).unwrap().rolling_7day_new_cases, None);
        assert_eq!(out.county.get(d(2021, 3, 14)).unwrap().rolling_7day_new_cases, Some(70.0));
        // State mode drops 6 Mar too rather than summing Pierce alone.
        assert_eq!(out.state.get(d(2021, 3, 14)).unwrap().rolling_7day_new_cases, Some(105.0));

        // The latest days are unaffected, so the status text still builds.
        assert!(status_text(&out, cfg.as_of).is_ok());
    }

    #[test]
    fn rows_outside_the_configured_states_are_ignored() {
        let mut t = tables();
        // An Oregon duplicate would be an error if Oregon were reshaped.
        let dup = t.cases.rows[2].clone();
        assert_eq!(dup.state, "Oregon");
        t.cases.rows.push(dup);
        assert!(derive_from_tables(&config("King", d(2021, 3, 12)), &t).is_ok());
    }
}
