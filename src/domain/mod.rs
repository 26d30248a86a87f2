//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - ingest shapes (`WideTable`, `RawRecord`, `LongRow`)
//! - region selection and population (`Region`, `Population`)
//! - series points (`DailySeriesPoint`, `DerivedSeriesPoint`, `SmoothedCurve`)
//! - resolved run configuration (`RunConfig`)

pub mod types;

pub use types::*;
