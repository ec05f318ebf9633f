//! Checks that run before any launch: the trainer binary and its dataset.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::TrainerConfig;
use crate::{TrainerError, TrainerResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoundFile {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl FoundFile {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Which dataset files exist.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DataFileReport {
    pub data_dir: PathBuf,
    pub found: Vec<FoundFile>,
    pub missing: Vec<PathBuf>,
}

impl DataFileReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// `Err(MissingDataFiles)` listing every absent path.
    pub fn require_complete(&self) -> TrainerResult<()> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(TrainerError::MissingDataFiles(self.missing.clone()))
        }
    }
}

pub fn check_data_files(config: &TrainerConfig) -> DataFileReport {
    let mut report = DataFileReport { data_dir: config.data_dir.clone(), ..Default::default() };
    for path in config.data_paths() {
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => report.found.push(FoundFile { path, size_bytes: meta.len() }),
            _ => report.missing.push(path),
        }
    }
    report
}

/// Size of the trainer binary, or `MissingExecutable`.
pub fn check_executable(path: &Path) -> TrainerResult<u64> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(meta.len()),
        _ => Err(TrainerError::MissingExecutable(path.to_path_buf())),
    }
}

/// Both checks, in the order a launch needs them.
pub fn ensure_ready(config: &TrainerConfig) -> TrainerResult<DataFileReport> {
    check_executable(&config.executable)?;
    let report = check_data_files(config);
    report.require_complete()?;
    Ok(report)
}
