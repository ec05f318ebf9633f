//! Records produced by runs and sequences.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::stats::{BenchmarkStats, secs};
use crate::TrainerError;
use crate::engine::metrics::{Metric, extract};

/// Outcome of one complete invocation of the trainer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// 1-based position in its sequence
    pub run_index: u32,
    pub success: bool,
    /// RFC 3339 launch time
    pub started_at: String,
    #[serde(with = "secs")]
    pub duration: Duration,
    /// `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
    /// Stdout lines in emission order, terminators removed
    pub captured_lines: Vec<String>,
    /// Only read for failed runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_text: Option<String>,
}

impl RunResult {
    /// Metrics found in this run's output.
    pub fn metrics(&self) -> Vec<Metric> {
        extract(&self.captured_lines)
    }

    /// The failure this result represents, if it is one.
    pub fn failure(&self) -> Option<TrainerError> {
        if self.success {
            return None;
        }
        Some(TrainerError::RunFailure {
            run_index: self.run_index,
            exit_code: self.exit_code,
            stderr: self.stderr_text.clone().unwrap_or_default(),
        })
    }
}

/// How a sequence spaces its runs and what it computes at the end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RunMode {
    /// Plain repetition with a pause between successful runs.
    Repeat {
        #[serde(with = "secs")]
        delay: Duration,
    },
    /// Back-to-back runs whose successful durations are summarized.
    Benchmark,
}

impl RunMode {
    pub fn delay(&self) -> Option<Duration> {
        match self {
            RunMode::Repeat { delay } if !delay.is_zero() => Some(*delay),
            _ => None,
        }
    }

    pub fn is_benchmark(&self) -> bool {
        matches!(self, RunMode::Benchmark)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "run", rename_all = "snake_case")]
pub enum SequenceState {
    Idle,
    Running(u32),
    /// Every requested run was attempted and succeeded.
    Completed,
    /// A run failed or could not be launched.
    Aborted,
    /// The user interrupted the sequence.
    Cancelled,
}

impl SequenceState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SequenceState::Completed | SequenceState::Aborted | SequenceState::Cancelled
        )
    }
}

/// Everything a finished sequence produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceReport {
    #[serde(flatten)]
    pub mode: RunMode,
    pub requested_runs: u32,
    pub state: SequenceState,
    pub results: Vec<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BenchmarkStats>,
    /// Human-readable reason for `Aborted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl SequenceReport {
    pub fn successful_runs(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool) -> RunResult {
        RunResult {
            run_index: 1,
            success,
            started_at: "2026-01-01T00:00:00Z".into(),
            duration: Duration::from_millis(1500),
            exit_code: Some(if success { 0 } else { 2 }),
            captured_lines: vec!["Test Loss: 0.41".into(), "done".into()],
            stderr_text: (!success).then(|| "boom".to_string()),
        }
    }

    #[test]
    fn test_failure_only_for_failed_runs() {
        assert!(result(true).failure().is_none());
        match result(false).failure() {
            Some(TrainerError::RunFailure { run_index, exit_code, stderr }) => {
                assert_eq!(run_index, 1);
                assert_eq!(exit_code, Some(2));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_metrics_from_captured_lines() {
        let metrics = result(true).metrics();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].raw_line, "Test Loss: 0.41");
    }

    #[test]
    fn test_run_mode_delay() {
        assert_eq!(
            RunMode::Repeat { delay: Duration::from_secs(3) }.delay(),
            Some(Duration::from_secs(3))
        );
        assert_eq!(RunMode::Repeat { delay: Duration::ZERO }.delay(), None);
        assert_eq!(RunMode::Benchmark.delay(), None);
    }

    #[test]
    fn test_report_json_shape() {
        let report = SequenceReport {
            mode: RunMode::Repeat { delay: Duration::from_secs(3) },
            requested_runs: 3,
            state: SequenceState::Aborted,
            results: vec![result(true), result(false)],
            stats: None,
            abort_reason: Some("run 2 failed".into()),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["mode"], "repeat");
        assert_eq!(json["delay"], 3.0);
        assert_eq!(json["state"]["state"], "aborted");
        assert_eq!(json["results"][0]["duration"], 1.5);
        assert!(json["results"][0].get("stderr_text").is_none());
        assert_eq!(json["results"][1]["stderr_text"], "boom");
        assert!(json.get("stats").is_none());
        assert_eq!(report.successful_runs(), 1);
    }
}
