//! Time-series derivation pipeline.
//!
//! Stages, in order:
//!
//! - `reshape`: wide tables to one long, key-joined table
//! - `filter`: long table to a cumulative series for one region
//! - `derive`: daily deltas, rolling sums, weekly rate per 100k
//! - `smooth`: optional spline overlay for the chart

pub mod derive;
pub mod filter;
pub mod reshape;
pub mod smooth;

pub use derive::*;
pub use filter::*;
pub use reshape::*;
pub use smooth::*;
