//! Core records and statistics shared by the runner, the aggregator and the
//! report layer.

pub mod env;
pub mod schema;
pub mod stats;

pub use env::SystemReport;
pub use schema::{RunMode, RunResult, SequenceReport, SequenceState};
pub use stats::BenchmarkStats;
