//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves the run configuration (including the as-of date)
//! - runs the shared pipeline
//! - renders, prints, exports, or posts depending on the subcommand

use chrono::{Days, Local, NaiveDate};
use clap::Parser;

use crate::cli::{Command, CommonArgs, ExportArgs, RunArgs};
use crate::domain::{Population, Region, RegionConfig, RunConfig, SourceSpec};
use crate::error::AppError;
use crate::notify::{WebhookPublisher, send_status};
use crate::plot::{COUNTY_COLOR, ChartLine, ChartSpec, STATE_COLOR, ShadedSpan, parse_hex_color, render_png};

pub mod pipeline;

/// Entry point for the `covid-rates` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(cli.log_level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .map_err(|e| AppError::new(4, format!("Failed to set up logging: {e}")))?;

    let today = Local::now().date_naive();

    match cli.command {
        Command::Run(args) => handle_run(args, today),
        Command::Summary(args) => handle_summary(args, today),
        Command::Export(args) => handle_export(args, today),
    }
}

fn handle_run(args: RunArgs, today: NaiveDate) -> Result<(), AppError> {
    let config = run_config(&args.common, today)?;

    // Fail on missing credentials before doing any network work.
    let publisher = if args.dry_run {
        None
    } else {
        Some(WebhookPublisher::from_env()?)
    };

    let output = pipeline::load_and_derive(&config)?;
    let text = pipeline::status_text(&output, config.as_of)?;

    let (county_smooth, state_smooth) = if args.smooth {
        (
            pipeline::try_smooth(&output.county, &config, args.smooth_points),
            pipeline::try_smooth(&output.state, &config, args.smooth_points),
        )
    } else {
        (None, None)
    };

    let (window_start, _) = pipeline::report_window(&config);
    let spec = ChartSpec {
        title: format!("COVID-19 Rates in {}, {}", config.county.label, config.state.label),
        y_label: "Weekly Cases per 100,000 Population".to_string(),
        window_start,
        window_end: config.as_of.checked_add_days(Days::new(1)).unwrap_or(config.as_of),
        lines: vec![
            ChartLine {
                series: &output.state,
                color: line_color(STATE_COLOR)?,
                smoothed: state_smooth.as_ref(),
            },
            ChartLine {
                series: &output.county,
                color: line_color(COUNTY_COLOR)?,
                smoothed: county_smooth.as_ref(),
            },
        ],
        shading: if args.no_shading { None } else { ShadedSpan::wa_restrictions() },
    };
    render_png(&args.output, &spec)?;

    println!("{text}");

    match publisher {
        Some(publisher) => send_status(&publisher, &text, &args.output),
        None => {
            tracing::info!(message = "dry run; status not posted", chart = %args.output.display());
            Ok(())
        }
    }
}

fn handle_summary(args: CommonArgs, today: NaiveDate) -> Result<(), AppError> {
    let config = run_config(&args, today)?;
    let output = pipeline::load_and_derive(&config)?;
    println!("{}", pipeline::status_text(&output, config.as_of)?);
    Ok(())
}

fn handle_export(args: ExportArgs, today: NaiveDate) -> Result<(), AppError> {
    let config = run_config(&args.common, today)?;
    let output = pipeline::load_and_derive(&config)?;
    crate::io::export::write_series_csv(&args.output, &[&output.county, &output.state])
}

fn line_color(hex: &str) -> Result<plotters::style::RGBColor, AppError> {
    parse_hex_color(hex).ok_or_else(|| AppError::new(2, format!("Invalid colour '{hex}'.")))
}

/// Resolve CLI options into a `RunConfig`.
///
/// `today` is only used when `--as-of` is absent: the report covers the day
/// before it.
pub fn run_config(args: &CommonArgs, today: NaiveDate) -> Result<RunConfig, AppError> {
    let region = &args.region;

    let as_of = match region.as_of {
        Some(date) => date,
        None => today
            .checked_sub_days(Days::new(1))
            .ok_or_else(|| AppError::new(2, "Cannot compute the day before today."))?,
    };

    if region.window_months == 0 {
        return Err(AppError::new(2, "`--window-months` must be at least 1."));
    }

    let source = match (&args.source.cases_csv, &args.source.deaths_csv) {
        (Some(cases_csv), Some(deaths_csv)) => SourceSpec::Local {
            cases_csv: cases_csv.clone(),
            deaths_csv: deaths_csv.clone(),
        },
        (None, None) => SourceSpec::Remote {
            cases_url: args.source.cases_url.clone(),
            deaths_url: args.source.deaths_url.clone(),
        },
        _ => {
            return Err(AppError::new(
                2,
                "`--cases-csv` and `--deaths-csv` must be given together.",
            ));
        }
    };

    Ok(RunConfig {
        source,
        county: RegionConfig {
            region: Region::County {
                county: region.county.clone(),
                state: region.state.clone(),
            },
            label: region.county_label.clone(),
            population: Population::new(region.county_population, &region.county_label)?,
        },
        state: RegionConfig {
            region: Region::State {
                state: region.state.clone(),
            },
            label: region.state_label.clone(),
            population: Population::new(region.state_population, &region.state_label)?,
        },
        as_of,
        window_months: region.window_months,
    })
}
