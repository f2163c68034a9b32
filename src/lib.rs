//! CI automation around the LOCI binary analysis backend: version naming,
//! readiness polling, function insights aggregation and run summaries.

pub mod api;
pub mod common;
pub mod config;
pub mod insights;
pub mod logging;
pub mod outputs;
pub mod polling;
pub mod report;
pub mod versions;
