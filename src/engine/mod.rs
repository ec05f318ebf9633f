//! Engine module: sequencing runs, reading metrics and building the trainer.
//!
//! - `aggregator` drives a `ProcessRunner` through a sequence of runs.
//! - `metrics` classifies captured output lines.
//! - `toolchain` compiles the trainer binary.
//!
//! None of these know how a process is spawned; that lives in
//! `crate::runner`.

pub mod aggregator;
pub mod metrics;
pub mod toolchain;

pub use aggregator::{RunAggregator, SequenceObserver};
pub use metrics::{MARKERS, Marker, Metric, MetricKind, classify, extract};
pub use toolchain::{BuildArtifact, Compiler};
