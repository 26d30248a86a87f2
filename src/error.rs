//! Error types.
//!
//! Two layers:
//!
//! - [`PipelineError`]: typed failures raised by the pure series stages
//!   (reshape, filter, derive, smooth). Tests match on these variants.
//! - [`AppError`]: what the binary reports. Carries a process exit code:
//!   `2` bad input/configuration, `3` data unavailable or insufficient,
//!   `4` runtime/network/IO failure.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Region filter matched nothing. Almost always a misspelled county/state.
    #[error("no rows match {region}; check the county and state names")]
    EmptyRegion { region: String },

    #[error("{label} series has no row for {date} (upstream data may lag by a day)")]
    MissingDate { label: String, date: NaiveDate },

    #[error("{label} series has no {field} value for {date}")]
    UndefinedValue {
        label: String,
        field: &'static str,
        date: NaiveDate,
    },

    #[error("smoothing needs at least {required} weekly control points, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("duplicate {metric} record for {county}, {state} on {date}")]
    DuplicateKey {
        metric: &'static str,
        county: String,
        state: String,
        date: NaiveDate,
    },

    #[error("series dates must be strictly increasing ({prev} followed by {next})")]
    UnorderedDates { prev: NaiveDate, next: NaiveDate },

    #[error("population for {label} must be positive")]
    InvalidPopulation { label: String },

    #[error("spline system is singular")]
    SingularSystem,
}

impl PipelineError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::EmptyRegion { .. } | Self::InvalidPopulation { .. } | Self::DuplicateKey { .. } => 2,
            Self::MissingDate { .. }
            | Self::UndefinedValue { .. }
            | Self::InsufficientData { .. }
            | Self::UnorderedDates { .. } => 3,
            Self::SingularSystem => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
