//! Data sources.

pub mod source;

pub use source::{DEFAULT_CASES_URL, DEFAULT_DEATHS_URL, SourceClient, SourceTables, load_tables};
