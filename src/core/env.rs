//! System requirements detection: compiler, disk space and host info.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::engine::toolchain::Compiler;

/// Snapshot of the host as it matters to building and running the trainer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_disk_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    pub os: String,
}

impl Default for SystemReport {
    fn default() -> Self {
        SystemReport {
            compiler_version: None,
            free_disk_bytes: None,
            cpu_model: None,
            cpu_cores: None,
            total_ram_bytes: None,
            os: std::env::consts::OS.to_string(),
        }
    }
}

impl SystemReport {
    pub fn detect(build: &BuildConfig) -> Self {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        let cwd = std::env::current_dir().unwrap_or_else(|_| build.project_dir.clone());

        SystemReport {
            compiler_version: Compiler::new(build.clone()).version().ok(),
            free_disk_bytes: free_space_at(&cwd),
            cpu_model: sys.cpus().first().map(|c| c.brand().to_string()),
            cpu_cores: sys.physical_core_count().map(|c| c as u32),
            total_ram_bytes: Some(sys.total_memory()),
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        }
    }

    /// The only hard requirement is a working compiler.
    pub fn meets_requirements(&self) -> bool {
        self.compiler_version.is_some()
    }

    pub fn free_disk_gb(&self) -> Option<f64> {
        self.free_disk_bytes.map(|b| b as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Available bytes on the filesystem whose mount point is the longest
/// prefix of `path`.
fn free_space_at(path: &Path) -> Option<u64> {
    use sysinfo::Disks;

    let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .map(|d| d.available_space())
}
