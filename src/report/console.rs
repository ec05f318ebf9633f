//! Plain-text rendering of runs, sequences and checks.
//!
//! Formatters return lines so they can be tested; the `print_*` helpers push
//! them through a [`LineSink`].

use std::path::Path;
use std::time::Duration;

use crate::core::{BenchmarkStats, RunResult, SequenceReport, SequenceState, SystemReport};
use crate::engine::SequenceObserver;
use crate::engine::metrics::Metric;
use crate::preflight::DataFileReport;
use crate::runner::LineSink;

const RULE: &str = "--------------------------------------------------";

pub fn rule() -> &'static str {
    RULE
}

pub fn format_run_summary(result: &RunResult) -> Vec<String> {
    let mut out = vec![RULE.to_string()];
    if result.success {
        out.push(format!("Run {} completed successfully", result.run_index));
        out.push(format!("Total time: {:.2}s", result.duration.as_secs_f64()));
    } else {
        let code = result
            .exit_code
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        out.push(format!("Run {} failed (exit code: {code})", result.run_index));
        if let Some(stderr) = result.stderr_text.as_deref().filter(|s| !s.trim().is_empty()) {
            out.extend(stderr.trim_end().lines().map(str::to_string));
        }
    }
    out
}

pub fn format_metrics(metrics: &[Metric]) -> Vec<String> {
    if metrics.is_empty() {
        return vec!["No metrics found in output".to_string()];
    }
    let mut out = vec!["Extracted metrics:".to_string()];
    out.extend(
        metrics
            .iter()
            .map(|m| format!("  [{}] {}", m.kind.label(), m.raw_line)),
    );
    out
}

pub fn format_stats(stats: &BenchmarkStats) -> Vec<String> {
    if stats.sample_count == 0 {
        return vec!["No successful runs to summarize".to_string()];
    }
    let mut out = vec![
        "Performance statistics:".to_string(),
        format!("  Average time: {:.2}s", stats.mean.as_secs_f64()),
    ];
    if stats.sample_count > 1 {
        if let Some(sd) = stats.stddev {
            out.push(format!("  Std deviation: {:.2}s", sd.as_secs_f64()));
        }
        if let Some(min) = stats.min {
            out.push(format!("  Min time: {:.2}s", min.as_secs_f64()));
        }
        if let Some(max) = stats.max {
            out.push(format!("  Max time: {:.2}s", max.as_secs_f64()));
        }
    }
    out.push(format!("  Runs: {}", stats.sample_count));
    out
}

pub fn format_sequence_summary(report: &SequenceReport) -> Vec<String> {
    let mut out = vec!["Results summary:".to_string()];
    for r in &report.results {
        let status = if r.success { "ok" } else { "FAILED" };
        out.push(format!(
            "  [{status}] Run {} - {} ({:.2}s)",
            r.run_index,
            r.started_at,
            r.duration.as_secs_f64()
        ));
    }
    let state = match report.state {
        SequenceState::Completed => format!("All {} runs succeeded", report.requested_runs),
        SequenceState::Aborted => format!(
            "Stopped after {} of {} runs",
            report.results.len(),
            report.requested_runs
        ),
        SequenceState::Cancelled => format!(
            "Interrupted by user after {} completed runs",
            report.successful_runs()
        ),
        SequenceState::Idle | SequenceState::Running(_) => "Sequence did not finish".to_string(),
    };
    out.push(state);
    out
}

pub fn format_data_report(report: &DataFileReport) -> Vec<String> {
    let mut out: Vec<String> = report
        .found
        .iter()
        .map(|f| {
            let name = f.path.file_name().map_or_else(
                || f.path.display().to_string(),
                |n| n.to_string_lossy().into_owned(),
            );
            format!("  found {name} ({:.1} MB)", f.size_mb())
        })
        .collect();
    if report.is_complete() {
        out.push(format!("All data files found in {}", report.data_dir.display()));
    } else {
        out.push("Missing data files:".to_string());
        out.extend(report.missing.iter().map(|p| format!("  - {}", p.display())));
    }
    out
}

pub fn format_system_report(report: &SystemReport) -> Vec<String> {
    let mut out = Vec::new();
    match &report.compiler_version {
        Some(v) => out.push(format!("Compiler: {v}")),
        None => out.push("Compiler: not found".to_string()),
    }
    if let Some(gb) = report.free_disk_gb() {
        out.push(format!("Free disk space: {gb:.2} GB"));
    }
    if let Some(cpu) = &report.cpu_model {
        let cores = report.cpu_cores.map(|c| format!(" ({c} cores)")).unwrap_or_default();
        out.push(format!("CPU: {cpu}{cores}"));
    }
    if let Some(ram) = report.total_ram_bytes {
        out.push(format!("RAM: {:.1} GB", ram as f64 / (1024.0 * 1024.0 * 1024.0)));
    }
    out.push(format!("OS: {}", report.os));
    out
}

pub fn format_paths(data_dir: &Path, executable: &Path, cwd: &Path) -> Vec<String> {
    vec![
        "File paths:".to_string(),
        format!("  Data: {}", data_dir.display()),
        format!("  Executable: {}", executable.display()),
        format!("  Current directory: {}", cwd.display()),
    ]
}

pub fn print_lines(lines: &[String], sink: &mut dyn LineSink) {
    for line in lines {
        sink.emit(line);
    }
}

/// Echo extracted metrics to the sink.
pub fn print_metrics(metrics: &[Metric], sink: &mut dyn LineSink) {
    print_lines(&format_metrics(metrics), sink);
}

/// Prints a header before each run and a summary with metrics after it.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleObserver {
    label: &'static str,
}

impl ConsoleObserver {
    pub fn new(label: &'static str) -> Self {
        ConsoleObserver { label }
    }
}

impl SequenceObserver for ConsoleObserver {
    fn run_started(&mut self, index: u32, total: u32, out: &mut dyn LineSink) {
        out.emit("");
        out.emit(&format!("{} {index}/{total}", self.label));
        out.emit("========================================");
    }

    fn run_finished(&mut self, result: &RunResult, out: &mut dyn LineSink) {
        print_lines(&format_run_summary(result), out);
        if result.success {
            print_metrics(&result.metrics(), out);
        }
    }

    fn pausing(&mut self, delay: Duration, out: &mut dyn LineSink) {
        out.emit(&format!("Pausing {:.1}s before the next run...", delay.as_secs_f64()));
    }
}
