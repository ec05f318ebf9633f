//! Compiler invocation for the trainer binary.
//!
//! Shells out to the configured C++ compiler with one fixed command line:
//! `<compiler> <flags> -o <output> <sources>`, run inside `project_dir`.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::{TrainerError, TrainerResult};

/// Output from a successful build.
#[derive(Debug, Clone)]
pub struct BuildArtifact {
    /// Path to the produced binary
    pub output_path: PathBuf,
    /// Size of the binary, if it could be read back
    pub size_bytes: Option<u64>,
    pub build_time: Duration,
}

impl BuildArtifact {
    pub fn size_kb(&self) -> Option<f64> {
        self.size_bytes.map(|b| b as f64 / 1024.0)
    }
}

pub struct Compiler {
    config: BuildConfig,
}

/// First non-empty line of `--version` output.
///
/// `g++ (Ubuntu 13.2.0-23ubuntu4) 13.2.0\nCopyright ...` gives the first line.
pub fn parse_compiler_version(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

impl Compiler {
    pub fn new(config: BuildConfig) -> Self {
        Compiler { config }
    }

    /// The full argv, compiler first.
    pub fn command_line(&self) -> Vec<String> {
        let c = &self.config;
        let mut argv = vec![c.compiler.to_string_lossy().into_owned()];
        argv.extend(c.flags.iter().cloned());
        argv.push("-o".into());
        argv.push(c.output.to_string_lossy().into_owned());
        argv.extend(c.sources.iter().map(|s| s.to_string_lossy().into_owned()));
        argv
    }

    /// The command line quoted for display.
    pub fn display_command(&self) -> String {
        let argv = self.command_line();
        shlex::try_join(argv.iter().map(String::as_str)).unwrap_or_else(|_| argv.join(" "))
    }

    pub fn version(&self) -> TrainerResult<String> {
        let output = Command::new(&self.config.compiler)
            .arg("--version")
            .output()
            .map_err(|e| {
                TrainerError::Config(format!(
                    "failed to run {} --version: {e}",
                    self.config.compiler.display()
                ))
            })?;

        if !output.status.success() {
            return Err(TrainerError::Config(format!(
                "{} --version failed with status: {}",
                self.config.compiler.display(),
                output.status
            )));
        }

        parse_compiler_version(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            TrainerError::Config("compiler printed no version".into())
        })
    }

    /// Source files that do not exist under `project_dir`.
    pub fn missing_sources(&self) -> Vec<PathBuf> {
        self.config
            .sources
            .iter()
            .map(|s| self.config.project_dir.join(s))
            .filter(|p| !p.exists())
            .collect()
    }

    pub fn build(&self) -> TrainerResult<BuildArtifact> {
        let missing = self.missing_sources();
        if !missing.is_empty() {
            return Err(TrainerError::MissingSources(missing));
        }

        let argv = self.command_line();
        debug!(command = %self.display_command(), dir = %self.config.project_dir.display(), "invoking compiler");

        let start = Instant::now();
        let output = Command::new(&self.config.compiler)
            .args(&argv[1..])
            .current_dir(&self.config.project_dir)
            .output()
            .map_err(|e| {
                let reason = if e.kind() == ErrorKind::NotFound {
                    format!("compiler {} not found", self.config.compiler.display())
                } else {
                    format!("failed to run {}: {e}", self.config.compiler.display())
                };
                TrainerError::BuildFailure { reason, stdout: String::new(), stderr: String::new() }
            })?;
        let build_time = start.elapsed();

        if !output.status.success() {
            return Err(TrainerError::BuildFailure {
                reason: format!(
                    "{} exited with {}",
                    self.config.compiler.display(),
                    output.status
                ),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let output_path = self.config.project_dir.join(&self.config.output);
        let size_bytes = std::fs::metadata(&output_path).ok().map(|m| m.len());
        info!(output = %output_path.display(), elapsed_ms = build_time.as_millis() as u64, "build finished");

        Ok(BuildArtifact { output_path, size_bytes, build_time })
    }
}
