//! Export derived series to CSV.
//!
//! One row per (region, date). Undefined values are written as empty cells so
//! spreadsheets show gaps rather than zeros.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::DerivedSeries;
use crate::error::AppError;

const HEADER: &str =
    "region,date,cumulative_cases,cumulative_deaths,daily_new_cases,rolling_7day_new_cases,weekly_rate_per_100k";

/// Write all `series` to a CSV file at `path`.
pub fn write_series_csv(path: &Path, series: &[&DerivedSeries]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_series(&mut file, series)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV '{}': {e}", path.display())))?;
    tracing::info!(message = "series exported", path = %path.display());
    Ok(())
}

/// Write CSV rows for `series` to any writer.
pub fn write_series<W: Write>(out: &mut W, series: &[&DerivedSeries]) -> std::io::Result<()> {
    writeln!(out, "{HEADER}")?;
    for s in series {
        for p in &s.points {
            writeln!(
                out,
                "{},{},{},{},{},{},{}",
                csv_text(&s.label),
                p.date,
                p.cumulative_cases,
                p.cumulative_deaths,
                p.daily_new_cases.map(|v| v.to_string()).unwrap_or_default(),
                p.rolling_7day_new_cases.map(|v| format!("{v:.0}")).unwrap_or_default(),
                p.weekly_rate_per_100k.map(|v| format!("{v:.6}")).unwrap_or_default(),
            )?;
        }
    }
    Ok(())
}

fn csv_text(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
