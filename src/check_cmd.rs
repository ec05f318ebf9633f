//! Read-only checks: dataset files, resolved paths and the host system.

use crate::config::TrainerConfig;
use crate::core::SystemReport;
use crate::preflight::{self, DataFileReport};
use crate::report::console::{format_data_report, format_paths, format_system_report, print_lines};
use crate::runner::LineSink;
use crate::{TrainerError, TrainerResult};

/// Report on the trainer binary and the dataset.
///
/// Everything is printed before an error is returned, so one call shows
/// every problem at once.
pub fn files(config: &TrainerConfig, out: &mut dyn LineSink) -> TrainerResult<DataFileReport> {
    let exe = preflight::check_executable(&config.executable);
    match &exe {
        Ok(size) => out.emit(&format!(
            "Executable found: {} ({:.1} KB)",
            config.executable.display(),
            *size as f64 / 1024.0
        )),
        Err(_) => out.emit(&format!("Executable missing: {}", config.executable.display())),
    }

    let report = preflight::check_data_files(config);
    print_lines(&format_data_report(&report), out);

    exe?;
    report.require_complete()?;
    Ok(report)
}

pub fn paths(config: &TrainerConfig, out: &mut dyn LineSink) -> TrainerResult<()> {
    let cwd = std::env::current_dir().map_err(TrainerError::Io)?;
    print_lines(&format_paths(&config.data_dir, &config.executable, &cwd), out);
    Ok(())
}

pub fn system(config: &TrainerConfig, out: &mut dyn LineSink) -> SystemReport {
    let report = SystemReport::detect(&config.build);
    out.emit("System check:");
    print_lines(&format_system_report(&report), out);
    if !report.meets_requirements() {
        out.emit(&format!(
            "Warning: {} is not available; building will fail",
            config.build.compiler.display()
        ));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DATA_FILES;
    use crate::runner::VecSink;

    #[test]
    fn test_files_reports_everything_before_failing() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig::default()
            .with_data_dir(dir.path())
            .with_executable(dir.path().join("trainer"));
        let mut sink = VecSink::default();

        let err = files(&config, &mut sink).unwrap_err();
        assert!(matches!(err, TrainerError::MissingExecutable(_)));
        assert!(sink.lines[0].starts_with("Executable missing: "));
        assert!(sink.lines.contains(&"Missing data files:".to_string()));
    }

    #[test]
    fn test_files_all_present() {
        let dir = tempfile::tempdir().unwrap();
        for name in DATA_FILES {
            std::fs::write(dir.path().join(name), vec![0u8; 1024 * 1024]).unwrap();
        }
        std::fs::write(dir.path().join("trainer"), vec![0u8; 2048]).unwrap();
        let config = TrainerConfig::default()
            .with_data_dir(dir.path())
            .with_executable(dir.path().join("trainer"));
        let mut sink = VecSink::default();

        let report = files(&config, &mut sink).unwrap();
        assert_eq!(report.found.len(), 4);
        assert!(sink.lines[0].ends_with("trainer (2.0 KB)"));
        assert!(sink.lines.contains(&"  found train-images-idx3-ubyte (1.0 MB)".to_string()));
    }

    #[test]
    fn test_paths_lists_data_and_executable() {
        let config = TrainerConfig::default();
        let mut sink = VecSink::default();
        paths(&config, &mut sink).unwrap();
        assert_eq!(sink.lines[0], "File paths:");
        assert_eq!(sink.lines[1], "  Data: data/fashion-mnist");
        assert_eq!(sink.lines[2], "  Executable: FashionMNISTTransformer.exe");
    }
}
