//! Benchmark sessions: fixed-count runs with timing statistics.

use tracing::info;

use crate::TrainerResult;
use crate::cancel::CancelToken;
use crate::config::TrainerConfig;
use crate::core::RunMode;
use crate::engine::RunAggregator;
use crate::preflight;
use crate::report::console::{ConsoleObserver, format_sequence_summary, format_stats, print_lines};
use crate::runner::{LineSink, ProcessRunner};
use crate::train_cmd::{SequenceOutput, target_for};

/// Run `runs` back-to-back launches and summarize their durations.
///
/// Statistics cover the successful runs only; a failure stops the session
/// but the runs before it are still summarized.
pub fn run(
    config: &TrainerConfig,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    runs: u32,
    out: &mut dyn LineSink,
) -> TrainerResult<SequenceOutput> {
    out.emit(&format!("Benchmark mode: {runs} runs"));
    preflight::ensure_ready(config)?;

    let mut aggregator = RunAggregator::new(runner, target_for(config), cancel.clone());
    let mut observer = ConsoleObserver::new("Benchmark run");
    aggregator.run_sequence(runs, RunMode::Benchmark, out, &mut observer);
    let (report, reason) = aggregator.finish();

    out.emit("");
    print_lines(&format_sequence_summary(&report), out);
    if let Some(stats) = &report.stats {
        info!(
            samples = stats.sample_count,
            mean_s = stats.mean.as_secs_f64(),
            "benchmark finished"
        );
        print_lines(&format_stats(stats), out);
    }
    Ok(SequenceOutput::from_parts(report, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrainerError;
    use crate::config::DATA_FILES;
    use crate::core::SequenceState;
    use crate::runner::{MockRun, MockRunner, VecSink};

    fn ready_config(dir: &std::path::Path) -> TrainerConfig {
        for name in DATA_FILES {
            std::fs::write(dir.join(name), b"idx").unwrap();
        }
        std::fs::write(dir.join("trainer"), b"").unwrap();
        TrainerConfig::default().with_data_dir(dir).with_executable(dir.join("trainer"))
    }

    #[test]
    fn test_benchmark_prints_stats() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new(vec![
            MockRun::succeed(2.0),
            MockRun::succeed(3.0),
            MockRun::succeed(4.0),
        ]);
        let mut sink = VecSink::default();
        let output = run(&ready_config(dir.path()), &runner, &CancelToken::new(), 3, &mut sink).unwrap();

        let stats = output.report.stats.clone().unwrap();
        assert_eq!(stats.sample_count, 3);
        assert!(sink.lines.contains(&"Benchmark run 3/3".to_string()));
        assert!(sink.lines.contains(&"  Average time: 3.00s".to_string()));
        assert!(sink.lines.contains(&"  Std deviation: 0.82s".to_string()));
        assert!(output.into_result().is_ok());
    }

    #[test]
    fn test_benchmark_failure_keeps_earlier_stats() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new(vec![MockRun::succeed(2.0), MockRun::fail(1, "crash")]);
        let mut sink = VecSink::default();
        let output = run(&ready_config(dir.path()), &runner, &CancelToken::new(), 5, &mut sink).unwrap();

        assert_eq!(output.report.state, SequenceState::Aborted);
        assert_eq!(output.report.stats.as_ref().unwrap().sample_count, 1);
        assert!(sink.lines.contains(&"  Runs: 1".to_string()));
        assert!(matches!(output.error, Some(TrainerError::RunFailure { run_index: 2, .. })));
    }

    #[test]
    fn test_benchmark_all_failed_reports_no_stats() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MockRunner::new(vec![MockRun::fail(2, "")]);
        let mut sink = VecSink::default();
        run(&ready_config(dir.path()), &runner, &CancelToken::new(), 3, &mut sink).unwrap();
        assert!(sink.lines.contains(&"No successful runs to summarize".to_string()));
    }
}
