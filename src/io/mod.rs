//! Input/output helpers.
//!
//! - wide CSV ingest + validation (`ingest`)
//! - derived series export (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
