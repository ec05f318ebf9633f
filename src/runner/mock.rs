//! Scripted runner for testing sequences without spawning processes.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::core::RunResult;
use crate::{TrainerError, TrainerResult, now_string};

use super::traits::{LineSink, ProcessRunner, RunTarget};

/// What one scripted launch does.
#[derive(Debug, Clone)]
pub enum MockRun {
    /// Emit `lines` and exit 0 after `duration`.
    Succeed { lines: Vec<String>, duration: Duration },
    /// Emit `lines` and exit with `exit_code`, writing `stderr`.
    Fail { lines: Vec<String>, exit_code: i32, stderr: String },
    /// Emit `lines`, then trip the caller's token as Ctrl-C would.
    Interrupt { lines: Vec<String> },
    /// Refuse to launch.
    SpawnError,
}

impl MockRun {
    pub fn succeed(secs: f64) -> Self {
        MockRun::Succeed {
            lines: vec!["Test Accuracy: 80.0%".into()],
            duration: Duration::from_secs_f64(secs),
        }
    }

    pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Self {
        MockRun::Fail { lines: Vec::new(), exit_code, stderr: stderr.into() }
    }
}

/// Plays back a script of [`MockRun`]s, one per launch.
///
/// Launches past the end of the script succeed with no output.
#[derive(Debug, Default)]
pub struct MockRunner {
    script: Mutex<Vec<MockRun>>,
    launches: AtomicUsize,
}

impl MockRunner {
    pub fn new(script: Vec<MockRun>) -> Self {
        let mut script = script;
        script.reverse();
        MockRunner { script: Mutex::new(script), launches: AtomicUsize::new(0) }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    fn next_run(&self) -> MockRun {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop())
            .unwrap_or(MockRun::Succeed { lines: Vec::new(), duration: Duration::ZERO })
    }
}

impl ProcessRunner for MockRunner {
    fn run(
        &self,
        target: &RunTarget,
        run_index: u32,
        sink: &mut dyn LineSink,
        cancel: &CancelToken,
    ) -> TrainerResult<RunResult> {
        let step = self.next_run();
        if !matches!(step, MockRun::SpawnError) {
            self.launches.fetch_add(1, Ordering::SeqCst);
        }
        let started_at = now_string();

        match step {
            MockRun::SpawnError => Err(TrainerError::SpawnFailure {
                path: target.executable.clone(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock"),
            }),
            MockRun::Succeed { lines, duration } => {
                emit_all(&lines, sink);
                if cancel.is_cancelled() {
                    return Err(TrainerError::UserCancelled);
                }
                Ok(RunResult {
                    run_index,
                    success: true,
                    started_at,
                    duration,
                    exit_code: Some(0),
                    captured_lines: lines,
                    stderr_text: None,
                })
            }
            MockRun::Fail { lines, exit_code, stderr } => {
                emit_all(&lines, sink);
                Ok(RunResult {
                    run_index,
                    success: false,
                    started_at,
                    duration: Duration::ZERO,
                    exit_code: Some(exit_code),
                    captured_lines: lines,
                    stderr_text: Some(stderr),
                })
            }
            MockRun::Interrupt { lines } => {
                emit_all(&lines, sink);
                cancel.cancel();
                Err(TrainerError::UserCancelled)
            }
        }
    }
}

fn emit_all(lines: &[String], sink: &mut dyn LineSink) {
    for l in lines {
        sink.emit(l);
    }
}
