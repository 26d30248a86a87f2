//! Command-line parsing.
//!
//! Argument parsing and command dispatch stay separate from the pipeline so the
//! series code never sees clap types.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::Level;

use crate::data::{DEFAULT_CASES_URL, DEFAULT_DEATHS_URL};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "covid-rates",
    version,
    about = "Weekly COVID-19 case rates for a county and its state"
)]
pub struct Cli {
    /// Logging verbosity: trace, debug, info, warn or error.
    #[arg(long, global = true, default_value_t = Level::INFO)]
    pub log_level: Level,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch data, render the chart, and post the daily status.
    Run(RunArgs),
    /// Print the daily status text only.
    Summary(CommonArgs),
    /// Write both derived series to CSV.
    Export(ExportArgs),
}

/// Where the data comes from.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Local confirmed-cases time series CSV (use with --deaths-csv).
    #[arg(long, requires = "deaths_csv")]
    pub cases_csv: Option<PathBuf>,

    /// Local deaths time series CSV (use with --cases-csv).
    #[arg(long, requires = "cases_csv")]
    pub deaths_csv: Option<PathBuf>,

    /// Remote confirmed-cases time series CSV.
    #[arg(long, default_value = DEFAULT_CASES_URL)]
    pub cases_url: String,

    /// Remote deaths time series CSV.
    #[arg(long, default_value = DEFAULT_DEATHS_URL)]
    pub deaths_url: String,
}

/// Which regions to report and how to normalize them.
#[derive(Debug, Args, Clone)]
pub struct RegionArgs {
    /// County name as it appears in the source data.
    #[arg(long, default_value = "King")]
    pub county: String,

    /// State name as it appears in the source data.
    #[arg(long, default_value = "Washington")]
    pub state: String,

    /// Display label for the county.
    #[arg(long, default_value = "King County")]
    pub county_label: String,

    /// Display label for the state.
    #[arg(long, default_value = "Washington State")]
    pub state_label: String,

    /// County population used for the per-100k rate.
    #[arg(long, default_value_t = 2_277_200)]
    pub county_population: u64,

    /// State population used for the per-100k rate.
    #[arg(long, default_value_t = 7_656_200)]
    pub state_population: u64,

    /// Last reported day (YYYY-MM-DD). Defaults to yesterday in local time.
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Length of the charted / smoothed window, in months.
    #[arg(long, default_value_t = 3)]
    pub window_months: u32,
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub region: RegionArgs,
}

/// Options for `run`.
#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Chart output path.
    #[arg(long, default_value = "graphic.png")]
    pub output: PathBuf,

    /// Overlay a cubic-spline smoothed curve on each line.
    #[arg(long)]
    pub smooth: bool,

    /// Number of samples along each smoothed curve.
    #[arg(long, default_value_t = 200)]
    pub smooth_points: usize,

    /// Render and print, but do not post.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not shade the WA State restrictions period.
    #[arg(long)]
    pub no_shading: bool,
}

/// Options for `export`.
#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// CSV output path.
    #[arg(long, default_value = "series.csv")]
    pub output: PathBuf,
}
