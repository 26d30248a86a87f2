//! Wide-format CSV ingest.
//!
//! Turns a time-series CSV (identifier columns followed by one column per date)
//! into a [`WideTable`]. Schema problems are fatal (exit code 2); bad cells are
//! recorded as row errors and left undefined so one corrupt value does not sink
//! the whole run.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{Metric, RowError, WideRow, WideTable};
use crate::error::AppError;

const COUNTY_COLUMNS: [&str; 2] = ["admin2", "county"];
const STATE_COLUMNS: [&str; 2] = ["province_state", "state"];
const DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Load a wide table from a local CSV file.
pub fn load_wide_table(path: &Path, metric: Metric) -> Result<WideTable, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to open {} CSV '{}': {e}", metric.as_str(), path.display()),
        )
    })?;
    parse_wide_table(file, metric)
}

/// Parse a wide table from any reader.
pub fn parse_wide_table<R: Read>(input: R, metric: Metric) -> Result<WideTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read {} CSV headers: {e}", metric.as_str())))?
        .clone();

    let header_map = build_header_map(&headers);
    let county_idx = find_column(&header_map, &COUNTY_COLUMNS).ok_or_else(|| {
        AppError::new(
            2,
            format!("{} CSV is missing a county column (`Admin2` or `county`).", metric.as_str()),
        )
    })?;
    let state_idx = find_column(&header_map, &STATE_COLUMNS).ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "{} CSV is missing a state column (`Province_State` or `state`).",
                metric.as_str()
            ),
        )
    })?;

    let date_columns = date_columns(&headers);
    if date_columns.is_empty() {
        return Err(AppError::new(
            2,
            format!("{} CSV has no date columns.", metric.as_str()),
        ));
    }
    for pair in date_columns.windows(2) {
        if pair[1].1 <= pair[0].1 {
            return Err(AppError::new(
                2,
                format!(
                    "{} CSV date columns are not strictly increasing ({} then {}).",
                    metric.as_str(),
                    pair[0].1,
                    pair[1].1
                ),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    key: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let county = record.get(county_idx).unwrap_or("").to_string();
        let state = record.get(state_idx).unwrap_or("").to_string();
        let key = format!("{county}, {state}");

        let mut values = Vec::with_capacity(date_columns.len());
        for &(col, date) in &date_columns {
            let raw = record.get(col).unwrap_or("");
            match parse_count(raw) {
                Ok(v) => values.push(Some(v)),
                Err(message) => {
                    row_errors.push(RowError {
                        line,
                        key: Some(key.clone()),
                        message: format!("{date}: {message}"),
                    });
                    values.push(None);
                }
            }
        }

        rows.push(WideRow { county, state, values });
    }

    Ok(WideTable {
        metric,
        dates: date_columns.into_iter().map(|(_, d)| d).collect(),
        rows,
        row_errors,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, candidates: &[&str]) -> Option<usize> {
    candidates.iter().find_map(|c| header_map.get(*c).copied())
}

/// Split headers into identifier column names and `(index, date)` pairs.
/// `(column index, date)` for every header that parses as a date. All other
/// columns are identifiers.
fn date_columns(headers: &StringRecord) -> Vec<(usize, NaiveDate)> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(idx, name)| {
            parse_header_date(name.trim().trim_start_matches('\u{feff}')).map(|date| (idx, date))
        })
        .collect()
}

fn parse_header_date(name: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(name, fmt).ok())
}

fn parse_count(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("empty value".to_string());
    }
    if let Ok(v) = trimmed.parse::<u64>() {
        return Ok(v);
    }
    // Some exports write counts as floats ("12.0").
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        Ok(v) if v < 0.0 => Err(format!("negative count '{trimmed}'")),
        _ => Err(format!("invalid count '{trimmed}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &str = "\
UID,iso2,FIPS,Admin2,Province_State,Country_Region,Combined_Key,1/22/20,1/23/20,1/24/20
84053033,US,53033,King,Washington,US,\"King, Washington, US\",1,1,2
84053061,US,53061,Snohomish,Washington,US,\"Snohomish, Washington, US\",0,1,x
";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_jhu_shaped_table() {
        let table = parse_wide_table(CASES.as_bytes(), Metric::Cases).unwrap();
        assert_eq!(table.dates, vec![d(2020, 1, 22), d(2020, 1, 23), d(2020, 1, 24)]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].county, "King");
        assert_eq!(table.rows[0].state, "Washington");
        assert_eq!(table.rows[0].values, vec![Some(1), Some(1), Some(2)]);
    }

    #[test]
    fn bad_cells_become_row_errors() {
        let table = parse_wide_table(CASES.as_bytes(), Metric::Cases).unwrap();
        assert_eq!(table.rows[1].values, vec![Some(0), Some(1), None]);
        assert_eq!(table.row_errors.len(), 1);
        assert_eq!(table.row_errors[0].line, 3);
        assert_eq!(table.row_errors[0].key.as_deref(), Some("Snohomish, Washington"));
    }

    #[test]
    fn population_column_is_an_identifier() {
        let deaths = "\
Admin2,Province_State,Population,2020-01-22,2020-01-23
King,Washington,2252782,0,1
";
        let table = parse_wide_table(deaths.as_bytes(), Metric::Deaths).unwrap();
        assert_eq!(table.dates, vec![d(2020, 1, 22), d(2020, 1, 23)]);
        assert_eq!(table.rows[0].values, vec![Some(0), Some(1)]);
    }

    #[test]
    fn missing_state_column_is_a_schema_error() {
        let csv = "Admin2,1/22/20\nKing,1\n";
        let err = parse_wide_table(csv.as_bytes(), Metric::Cases).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn no_date_columns_is_a_schema_error() {
        let csv = "Admin2,Province_State\nKing,Washington\n";
        let err = parse_wide_table(csv.as_bytes(), Metric::Cases).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn parse_count_accepts_integral_floats_only() {
        assert_eq!(parse_count("12"), Ok(12));
        assert_eq!(parse_count("12.0"), Ok(12));
        assert!(parse_count("12.5").is_err());
        assert!(parse_count("-3").is_err());
        assert!(parse_count("").is_err());
    }
}
