//! Real child-process runner.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::cancel::{ActiveChild, CancelToken};
use crate::core::RunResult;
use crate::{TrainerError, TrainerResult, now_string};

use super::traits::{LineSink, ProcessRunner, RunTarget};

/// Blocking iterator over the lines of a pipe.
///
/// Yields each line with its `\n` or `\r\n` terminator removed and returns
/// `None` at end-of-stream. Invalid UTF-8 is replaced lossily.
pub struct OutputLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    done: bool,
}

impl<R: Read> OutputLines<R> {
    pub fn new(inner: R) -> Self {
        OutputLines { reader: BufReader::new(inner), buf: Vec::new(), done: false }
    }
}

impl<R: Read> Iterator for OutputLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Spawns the trainer as a child process.
#[derive(Debug, Default)]
pub struct ChildRunner {
    launches: AtomicUsize,
}

impl ChildRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of processes this runner has spawned.
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

/// Kill the child's process group and reap the child, ignoring errors from
/// a child that already exited.
fn terminate(child: &mut Child, active: &ActiveChild) {
    active.terminate_group();
    let _ = child.kill();
    let _ = child.wait();
}

/// Everything the child wrote to stderr.
fn read_back(mut file: File) -> std::io::Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl ProcessRunner for ChildRunner {
    fn run(
        &self,
        target: &RunTarget,
        run_index: u32,
        sink: &mut dyn LineSink,
        cancel: &CancelToken,
    ) -> TrainerResult<RunResult> {
        if !target.executable.is_file() {
            return Err(TrainerError::MissingExecutable(target.executable.clone()));
        }

        if cancel.is_cancelled() {
            return Err(TrainerError::UserCancelled);
        }

        // Unbounded, unlike a pipe; read back only for failed runs.
        let stderr_file = tempfile::tempfile()?;
        let mut cmd = Command::new(&target.executable);
        cmd.args(&target.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::from(stderr_file.try_clone()?));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        debug!(executable = %target.executable.display(), args = ?target.args, "spawning trainer");

        let started_at = now_string();
        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| TrainerError::SpawnFailure {
            path: target.executable.clone(),
            source,
        })?;
        let active = ActiveChild::register(child.id());
        self.launches.fetch_add(1, Ordering::SeqCst);
        info!(run = run_index, pid = child.id(), "trainer started");

        // An interrupt that landed before the pid was registered.
        if cancel.is_cancelled() {
            warn!(run = run_index, "cancelled, terminating trainer");
            terminate(&mut child, &active);
            return Err(TrainerError::UserCancelled);
        }

        let Some(stdout) = child.stdout.take() else {
            terminate(&mut child, &active);
            return Err(TrainerError::Io(std::io::Error::other("child stdout not captured")));
        };

        let mut captured_lines = Vec::new();
        for line in OutputLines::new(stdout) {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    terminate(&mut child, &active);
                    return Err(TrainerError::Io(e));
                }
            };
            sink.emit(&line);
            captured_lines.push(line);
            if cancel.is_cancelled() {
                warn!(run = run_index, "cancelled, terminating trainer");
                terminate(&mut child, &active);
                return Err(TrainerError::UserCancelled);
            }
        }

        // stdout is closed; wait for the process itself so the exit status is final
        let status = match child.wait() {
            Ok(status) => status,
            Err(e) => {
                terminate(&mut child, &active);
                return Err(TrainerError::Io(e));
            }
        };
        let duration = start.elapsed();
        drop(active);

        if cancel.is_cancelled() {
            warn!(run = run_index, "cancelled while trainer was exiting");
            return Err(TrainerError::UserCancelled);
        }

        let success = status.success();
        let stderr_text = if success { None } else { Some(read_back(stderr_file)?) };

        if success {
            info!(run = run_index, elapsed_ms = duration.as_millis() as u64, "trainer finished");
        } else {
            warn!(run = run_index, exit_code = ?status.code(), "trainer failed");
        }

        Ok(RunResult {
            run_index,
            success,
            started_at,
            duration,
            exit_code: status.code(),
            captured_lines,
            stderr_text,
        })
    }
}
