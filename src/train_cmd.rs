//! Single runs and multi-run sequences of the trainer.

use tracing::info;

use crate::cancel::CancelToken;
use crate::config::TrainerConfig;
use crate::core::{RunMode, RunResult, SequenceReport, SequenceState};
use crate::engine::RunAggregator;
use crate::preflight;
use crate::report::console::{
    ConsoleObserver, format_data_report, format_run_summary, format_sequence_summary,
    print_lines, print_metrics, rule,
};
use crate::runner::{LineSink, ProcessRunner, RunTarget};
use crate::{TrainerError, TrainerResult};

/// A finished sequence and, when it did not complete, the reason.
#[derive(Debug)]
pub struct SequenceOutput {
    pub report: SequenceReport,
    pub error: Option<TrainerError>,
}

impl SequenceOutput {
    pub(crate) fn from_parts(report: SequenceReport, abort_reason: Option<TrainerError>) -> Self {
        let error = match report.state {
            SequenceState::Cancelled => Some(TrainerError::UserCancelled),
            _ => abort_reason,
        };
        SequenceOutput { report, error }
    }

    pub fn into_result(self) -> TrainerResult<SequenceReport> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

pub(crate) fn target_for(config: &TrainerConfig) -> RunTarget {
    RunTarget::new(&config.executable).with_args(config.args.clone())
}

/// Launch the trainer once.
///
/// Returns the result even when the trainer exits non-zero; use
/// [`RunResult::failure`] to turn that into an error.
pub fn run(
    config: &TrainerConfig,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    out: &mut dyn LineSink,
) -> TrainerResult<RunResult> {
    out.emit("Starting training");
    let data = preflight::ensure_ready(config)?;
    out.emit(&format!("Executable found: {}", config.executable.display()));
    print_lines(&format_data_report(&data), out);

    info!(executable = %config.executable.display(), "launching trainer");
    out.emit("Program output:");
    out.emit(rule());
    let result = runner.run(&target_for(config), 1, out, cancel)?;

    print_lines(&format_run_summary(&result), out);
    if result.success {
        print_metrics(&result.metrics(), out);
    }
    Ok(result)
}

/// Launch the trainer `runs` times with `config.delay` between launches.
pub fn run_multi(
    config: &TrainerConfig,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    runs: u32,
    out: &mut dyn LineSink,
) -> TrainerResult<SequenceOutput> {
    out.emit(&format!("Multi-run mode: {runs} runs of the same configuration"));
    preflight::ensure_ready(config)?;

    let mut aggregator = RunAggregator::new(runner, target_for(config), cancel.clone());
    let mut observer = ConsoleObserver::new("Run");
    aggregator.run_sequence(runs, RunMode::Repeat { delay: config.delay }, out, &mut observer);
    let (report, reason) = aggregator.finish();
    info!(state = ?report.state, completed = report.results.len(), "multi-run finished");

    out.emit("");
    print_lines(&format_sequence_summary(&report), out);
    Ok(SequenceOutput::from_parts(report, reason))
}
