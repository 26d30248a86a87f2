//! Source loader: fetches the two wide time-series tables.
//!
//! Remote tables are the Johns Hopkins CSSE US county time series. Local files
//! in the same layout are accepted for offline runs and tests.

use reqwest::blocking::Client;

use crate::domain::{Metric, SourceSpec, WideTable};
use crate::error::AppError;
use crate::io::ingest::{load_wide_table, parse_wide_table};

pub const DEFAULT_CASES_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_US.csv";
pub const DEFAULT_DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_US.csv";

/// Cases and deaths tables as loaded, before reshaping.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub cases: WideTable,
    pub deaths: WideTable,
}

/// Load both tables from wherever `spec` points.
pub fn load_tables(spec: &SourceSpec) -> Result<SourceTables, AppError> {
    let tables = match spec {
        SourceSpec::Remote { cases_url, deaths_url } => {
            let client = SourceClient::new();
            SourceTables {
                cases: client.fetch_table(cases_url, Metric::Cases)?,
                deaths: client.fetch_table(deaths_url, Metric::Deaths)?,
            }
        }
        SourceSpec::Local { cases_csv, deaths_csv } => SourceTables {
            cases: load_wide_table(cases_csv, Metric::Cases)?,
            deaths: load_wide_table(deaths_csv, Metric::Deaths)?,
        },
    };

    for table in [&tables.cases, &tables.deaths] {
        log_row_errors(table);
    }

    Ok(tables)
}

fn log_row_errors(table: &WideTable) {
    if table.row_errors.is_empty() {
        return;
    }
    tracing::warn!(
        message = "skipped invalid cells during ingest",
        metric = table.metric.as_str(),
        count = table.row_errors.len()
    );
    for err in table.row_errors.iter().take(5) {
        tracing::warn!(
            message = "ingest row error",
            metric = table.metric.as_str(),
            line = err.line,
            key = err.key.as_deref().unwrap_or(""),
            error = %err.message
        );
    }
}

pub struct SourceClient {
    client: Client,
}

impl Default for SourceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    pub fn fetch_table(&self, url: &str, metric: Metric) -> Result<WideTable, AppError> {
        tracing::info!(message = "fetching time series", metric = metric.as_str(), url = %url);

        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::new(4, format!("Request for {} data failed: {e}", metric.as_str())))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!(
                    "Request for {} data failed with status {}.",
                    metric.as_str(),
                    resp.status()
                ),
            ));
        }

        let body = resp
            .bytes()
            .map_err(|e| AppError::new(4, format!("Failed to read {} response: {e}", metric.as_str())))?;

        tracing::debug!(message = "fetched time series", metric = metric.as_str(), bytes = body.len());

        parse_wide_table(body.as_ref(), metric)
    }
}
