//! Harness configuration.
//!
//! Everything the harness needs to locate and run the trainer lives in one
//! immutable [`TrainerConfig`]. Values come from the documented defaults,
//! optionally overlaid by a TOML file and then by CLI flags in `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{TrainerError, TrainerResult};

pub const DEFAULT_EXECUTABLE: &str = "FashionMNISTTransformer.exe";
pub const DEFAULT_DATA_DIR: &str = "data/fashion-mnist";
pub const DEFAULT_RUNS: u32 = 3;
pub const DEFAULT_BENCH_RUNS: u32 = 3;
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

pub const DATA_FILES: [&str; 4] = [
    "train-images-idx3-ubyte",
    "train-labels-idx1-ubyte",
    "t10k-images-idx3-ubyte",
    "t10k-labels-idx1-ubyte",
];

pub const SOURCE_FILES: [&str; 4] = [
    "main.cpp",
    "src/matrix.cpp",
    "src/mnist_loader.cpp",
    "src/transformer.cpp",
];

/// How the trainer binary is compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Compiler binary (default: `g++` from PATH)
    pub compiler: PathBuf,
    /// Flags placed before `-o <output>`
    pub flags: Vec<String>,
    /// Source files, relative to `project_dir`
    pub sources: Vec<PathBuf>,
    /// Output binary, relative to `project_dir`
    pub output: PathBuf,
    /// Directory the compiler runs in
    pub project_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            compiler: PathBuf::from("g++"),
            flags: vec!["-std=c++14".into(), "-O2".into(), "-I./include".into()],
            sources: SOURCE_FILES.iter().map(PathBuf::from).collect(),
            output: PathBuf::from(DEFAULT_EXECUTABLE),
            project_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Trainer binary to launch
    pub executable: PathBuf,
    /// Arguments passed to every launch (none by default)
    pub args: Vec<String>,
    /// Directory holding the dataset files
    pub data_dir: PathBuf,
    /// Dataset file names expected under `data_dir`
    pub data_files: Vec<String>,
    /// Runs in a multi-run sequence (default 3)
    pub runs: u32,
    /// Runs in a benchmark session (default 3)
    pub bench_runs: u32,
    /// Pause between successful multi-run launches (default 3 s)
    pub delay: Duration,
    pub build: BuildConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            args: Vec::new(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            data_files: DATA_FILES.iter().map(|s| s.to_string()).collect(),
            runs: DEFAULT_RUNS,
            bench_runs: DEFAULT_BENCH_RUNS,
            delay: DEFAULT_DELAY,
            build: BuildConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    executable: Option<PathBuf>,
    args: Option<Vec<String>>,
    data_dir: Option<PathBuf>,
    data_files: Option<Vec<String>>,
    runs: Option<u32>,
    bench_runs: Option<u32>,
    delay_secs: Option<f64>,
    build: Option<RawBuild>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuild {
    compiler: Option<PathBuf>,
    flags: Option<Vec<String>>,
    sources: Option<Vec<PathBuf>>,
    output: Option<PathBuf>,
    project_dir: Option<PathBuf>,
}

impl TrainerConfig {
    /// Load from a TOML file; absent keys keep their defaults.
    pub fn load(path: &Path) -> TrainerResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            TrainerError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> TrainerResult<Self> {
        let raw: RawConfig = toml::from_str(s).map_err(|e| TrainerError::Config(e.to_string()))?;
        let mut cfg = TrainerConfig::default();
        if let Some(v) = raw.executable {
            cfg.executable = v;
        }
        if let Some(v) = raw.args {
            cfg.args = v;
        }
        if let Some(v) = raw.data_dir {
            cfg.data_dir = v;
        }
        if let Some(v) = raw.data_files {
            cfg.data_files = v;
        }
        if let Some(v) = raw.runs {
            cfg.runs = v;
        }
        if let Some(v) = raw.bench_runs {
            cfg.bench_runs = v;
        }
        if let Some(secs) = raw.delay_secs {
            cfg.delay = Duration::try_from_secs_f64(secs)
                .map_err(|e| TrainerError::Config(format!("delay_secs: {e}")))?;
        }
        if let Some(b) = raw.build {
            if let Some(v) = b.compiler {
                cfg.build.compiler = v;
            }
            if let Some(v) = b.flags {
                cfg.build.flags = v;
            }
            if let Some(v) = b.sources {
                cfg.build.sources = v;
            }
            if let Some(v) = b.output {
                cfg.build.output = v;
            }
            if let Some(v) = b.project_dir {
                cfg.build.project_dir = v;
            }
        }
        Ok(cfg)
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Full paths of the expected dataset files, in declaration order.
    pub fn data_paths(&self) -> Vec<PathBuf> {
        self.data_files.iter().map(|f| self.data_dir.join(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = TrainerConfig::default();
        assert_eq!(cfg.executable, PathBuf::from("FashionMNISTTransformer.exe"));
        assert!(cfg.args.is_empty());
        assert_eq!(cfg.runs, 3);
        assert_eq!(cfg.bench_runs, 3);
        assert_eq!(cfg.delay, Duration::from_secs(3));
        assert_eq!(cfg.data_files.len(), 4);
        assert_eq!(cfg.build.compiler, PathBuf::from("g++"));
        assert_eq!(cfg.build.sources.len(), 4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg = TrainerConfig::from_toml_str(
            r#"
executable = "bin/trainer"
delay_secs = 0.5

[build]
compiler = "clang++"
"#,
        )
        .unwrap();
        assert_eq!(cfg.executable, PathBuf::from("bin/trainer"));
        assert_eq!(cfg.delay, Duration::from_millis(500));
        assert_eq!(cfg.runs, 3);
        assert_eq!(cfg.build.compiler, PathBuf::from("clang++"));
        assert_eq!(cfg.build.flags, BuildConfig::default().flags);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = TrainerConfig::from_toml_str("retries = 2\n").unwrap_err();
        assert!(matches!(err, TrainerError::Config(_)));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let err = TrainerConfig::from_toml_str("delay_secs = -1.0\n").unwrap_err();
        assert!(err.to_string().contains("delay_secs"));
    }

    #[test]
    fn test_data_paths_join_dir() {
        let cfg = TrainerConfig::default().with_data_dir("/data");
        let paths = cfg.data_paths();
        assert_eq!(paths[0], PathBuf::from("/data/train-images-idx3-ubyte"));
        assert_eq!(paths[3], PathBuf::from("/data/t10k-labels-idx1-ubyte"));
    }
}
