//! `covid-rates` library crate.
//!
//! The binary (`covid-rates`) is a thin wrapper around this library so that:
//!
//! - the series pipeline is testable without network access or processes
//! - rendering and posting stay at the edges

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod notify;
pub mod plot;
pub mod report;
pub mod series;
