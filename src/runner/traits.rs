//! Runner trait and the sink that receives live output.

use std::io::Write;
use std::path::PathBuf;

use crate::TrainerResult;
use crate::cancel::CancelToken;
use crate::core::RunResult;

/// What to launch.
#[derive(Debug, Clone, PartialEq)]
pub struct RunTarget {
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl RunTarget {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        RunTarget { executable: executable.into(), args: Vec::new() }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Receives each stdout line as soon as it is read.
pub trait LineSink {
    fn emit(&mut self, line: &str);
}

impl<F: FnMut(&str)> LineSink for F {
    fn emit(&mut self, line: &str) {
        self(line)
    }
}

/// Echoes to a standard stream, flushing per line so progress shows up
/// immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleSink {
    #[default]
    Stdout,
    Stderr,
}

impl LineSink for ConsoleSink {
    fn emit(&mut self, line: &str) {
        match self {
            ConsoleSink::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "{line}");
                let _ = out.flush();
            }
            ConsoleSink::Stderr => {
                let mut err = std::io::stderr().lock();
                let _ = writeln!(err, "{line}");
            }
        }
    }
}

/// Collects lines in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub lines: Vec<String>,
}

impl LineSink for VecSink {
    fn emit(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// Launches one trainer invocation and reports how it ended.
///
/// A non-zero exit is a normal `RunResult` with `success == false`. `Err` is
/// reserved for runs that never launched (`MissingExecutable`,
/// `SpawnFailure`), I/O errors while streaming, and `UserCancelled`.
pub trait ProcessRunner {
    fn run(
        &self,
        target: &RunTarget,
        run_index: u32,
        sink: &mut dyn LineSink,
        cancel: &CancelToken,
    ) -> TrainerResult<RunResult>;
}
