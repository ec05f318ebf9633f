pub mod cancel;
pub mod config;
pub mod core;
pub mod engine;
pub mod preflight;
pub mod report;
pub mod runner;

pub mod bench_cmd;
pub mod build_cmd;
pub mod check_cmd;
pub mod menu_cmd;
pub mod train_cmd;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("executable not found: {}", .0.display())]
    MissingExecutable(PathBuf),

    #[error("failed to launch {}: {source}", .path.display())]
    SpawnFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run {run_index} failed ({}){}", exit_label(.exit_code), stderr_suffix(.stderr))]
    RunFailure {
        run_index: u32,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("missing data files: {}", join_paths(.0))]
    MissingDataFiles(Vec<PathBuf>),

    #[error("missing source files: {}", join_paths(.0))]
    MissingSources(Vec<PathBuf>),

    #[error("build failed: {reason}{}{}", labelled("STDOUT", .stdout), labelled("STDERR", .stderr))]
    BuildFailure {
        reason: String,
        stdout: String,
        stderr: String,
    },

    #[error("interrupted by user")]
    UserCancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type TrainerResult<T> = Result<T, TrainerError>;

impl TrainerError {
    /// Process exit status `main` uses for this error.
    pub fn exit_status(&self) -> i32 {
        match self {
            TrainerError::UserCancelled => 130,
            _ => 1,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {c}"),
        None => "terminated by signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim_end();
    if trimmed.is_empty() { String::new() } else { format!(":\n{trimmed}") }
}

fn labelled(label: &str, text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() { String::new() } else { format!("\n{label}: {trimmed}") }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// RFC 3339 timestamp for "now", empty if formatting fails.
pub fn now_string() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}
