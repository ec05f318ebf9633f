//! Sequencing of repeated trainer runs.
//!
//! The aggregator launches the same target up to `count` times, strictly one
//! after another, and stops at the first run that fails or cannot launch.
//! Results collected before a stop are kept.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::TrainerError;
use crate::cancel::CancelToken;
use crate::core::{BenchmarkStats, RunMode, RunResult, SequenceReport, SequenceState};
use crate::runner::{LineSink, ProcessRunner, RunTarget};

/// Granularity at which the inter-run pause checks for cancellation.
const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Progress hooks, called on the control thread between blocking steps.
///
/// `out` is the same sink the runner streams output lines to.
pub trait SequenceObserver {
    fn run_started(&mut self, _index: u32, _total: u32, _out: &mut dyn LineSink) {}
    fn run_finished(&mut self, _result: &RunResult, _out: &mut dyn LineSink) {}
    fn pausing(&mut self, _delay: Duration, _out: &mut dyn LineSink) {}
}

/// Observes nothing.
impl SequenceObserver for () {}

pub struct RunAggregator<'a> {
    runner: &'a dyn ProcessRunner,
    target: RunTarget,
    cancel: CancelToken,
    state: SequenceState,
    mode: Option<RunMode>,
    requested: u32,
    results: Vec<RunResult>,
    stats: Option<BenchmarkStats>,
    abort_reason: Option<TrainerError>,
}

impl<'a> RunAggregator<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, target: RunTarget, cancel: CancelToken) -> Self {
        RunAggregator {
            runner,
            target,
            cancel,
            state: SequenceState::Idle,
            mode: None,
            requested: 0,
            results: Vec::new(),
            stats: None,
            abort_reason: None,
        }
    }

    /// Run up to `count` launches of the target.
    ///
    /// `out` receives every output line of every run. Returns the results
    /// collected so far; `state()` tells how the sequence ended.
    pub fn run_sequence(
        &mut self,
        count: u32,
        mode: RunMode,
        out: &mut dyn LineSink,
        observer: &mut dyn SequenceObserver,
    ) -> &[RunResult] {
        self.mode = Some(mode);
        self.requested = count;
        self.results.clear();
        self.stats = None;
        self.abort_reason = None;
        self.state = SequenceState::Idle;

        for i in 1..=count {
            self.state = SequenceState::Running(i);
            observer.run_started(i, count, out);
            info!(run = i, total = count, "starting run");

            match self.runner.run(&self.target, i, out, &self.cancel) {
                Ok(result) => {
                    let success = result.success;
                    observer.run_finished(&result, out);
                    self.results.push(result);
                    if !success {
                        warn!(run = i, "run failed, stopping sequence");
                        self.abort_reason = self.results.last().and_then(RunResult::failure);
                        self.state = SequenceState::Aborted;
                        break;
                    }
                }
                Err(TrainerError::UserCancelled) => {
                    warn!(run = i, "sequence cancelled");
                    self.state = SequenceState::Cancelled;
                    break;
                }
                Err(e) => {
                    warn!(run = i, error = %e, "run could not complete, stopping sequence");
                    self.abort_reason = Some(e);
                    self.state = SequenceState::Aborted;
                    break;
                }
            }

            if i < count {
                if let Some(delay) = mode.delay() {
                    observer.pausing(delay, out);
                    if !self.pause(delay) {
                        warn!(after_run = i, "sequence cancelled during pause");
                        self.state = SequenceState::Cancelled;
                        break;
                    }
                }
            }
        }

        if !self.state.is_terminal() {
            self.state = SequenceState::Completed;
        }

        if mode.is_benchmark() {
            let durations: Vec<Duration> = self
                .results
                .iter()
                .filter(|r| r.success)
                .map(|r| r.duration)
                .collect();
            self.stats = Some(BenchmarkStats::from_durations(&durations));
        }

        &self.results
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    pub fn stats(&self) -> Option<&BenchmarkStats> {
        self.stats.as_ref()
    }

    /// Why the sequence was aborted, if it was.
    pub fn abort_reason(&self) -> Option<&TrainerError> {
        self.abort_reason.as_ref()
    }

    /// Consume the aggregator, keeping the abort reason as a typed error.
    pub fn finish(self) -> (SequenceReport, Option<TrainerError>) {
        let report = SequenceReport {
            mode: self.mode.unwrap_or(RunMode::Benchmark),
            requested_runs: self.requested,
            state: self.state,
            results: self.results,
            stats: self.stats,
            abort_reason: self.abort_reason.as_ref().map(|e| e.to_string()),
        };
        (report, self.abort_reason)
    }

    /// Sleep for `delay`, returning `false` if cancelled meanwhile.
    fn pause(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(PAUSE_SLICE.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{MockRun, MockRunner, VecSink};

    fn target() -> RunTarget {
        RunTarget::new("/mock/trainer")
    }

    fn run(runner: &MockRunner, count: u32, mode: RunMode) -> RunAggregator<'_> {
        let mut agg = RunAggregator::new(runner, target(), CancelToken::new());
        let mut sink = VecSink::default();
        agg.run_sequence(count, mode, &mut sink, &mut ());
        agg
    }

    fn repeat() -> RunMode {
        RunMode::Repeat { delay: Duration::ZERO }
    }

    #[test]
    fn test_all_runs_succeed() {
        let runner = MockRunner::new(vec![MockRun::succeed(1.0), MockRun::succeed(1.0), MockRun::succeed(1.0)]);
        let agg = run(&runner, 3, repeat());
        assert_eq!(agg.state(), SequenceState::Completed);
        assert_eq!(agg.results().len(), 3);
        let indices: Vec<u32> = agg.results().iter().map(|r| r.run_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(agg.stats().is_none());
        assert!(agg.abort_reason().is_none());
    }

    #[test]
    fn test_failure_stops_sequence() {
        for k in 1..=3u32 {
            let mut script: Vec<MockRun> = (1..k).map(|_| MockRun::succeed(1.0)).collect();
            script.push(MockRun::fail(2, "bad input"));
            script.push(MockRun::succeed(1.0));
            let runner = MockRunner::new(script);
            let agg = run(&runner, 3, repeat());

            assert_eq!(agg.results().len(), k as usize);
            assert!(!agg.results().last().unwrap().success);
            assert!(agg.results()[..k as usize - 1].iter().all(|r| r.success));
            assert_eq!(agg.state(), SequenceState::Aborted);
            assert_eq!(runner.launches(), k as usize);
            assert!(matches!(
                agg.abort_reason(),
                Some(TrainerError::RunFailure { run_index, exit_code: Some(2), .. }) if *run_index == k
            ));
        }
    }

    #[test]
    fn test_launch_error_aborts_without_entry() {
        let runner = MockRunner::new(vec![MockRun::succeed(1.0), MockRun::SpawnError]);
        let agg = run(&runner, 3, repeat());
        assert_eq!(agg.results().len(), 1);
        assert_eq!(agg.state(), SequenceState::Aborted);
        assert!(matches!(agg.abort_reason(), Some(TrainerError::SpawnFailure { .. })));
    }

    #[test]
    fn test_cancel_during_second_run_keeps_first() {
        let runner = MockRunner::new(vec![
            MockRun::succeed(1.0),
            MockRun::Interrupt { lines: vec!["Loading Fashion-MNIST dataset...".into()] },
            MockRun::succeed(1.0),
        ]);
        let agg = run(&runner, 3, repeat());
        assert_eq!(agg.state(), SequenceState::Cancelled);
        assert_eq!(agg.results().len(), 1);
        assert!(agg.results()[0].success);
        assert_eq!(runner.launches(), 2);
        assert!(agg.abort_reason().is_none());
    }

    /// Succeeds, then trips the token as if Ctrl-C arrived right after exit.
    struct CancelAfterRun {
        inner: MockRunner,
    }

    impl ProcessRunner for CancelAfterRun {
        fn run(
            &self,
            target: &RunTarget,
            run_index: u32,
            sink: &mut dyn LineSink,
            cancel: &CancelToken,
        ) -> crate::TrainerResult<RunResult> {
            let result = self.inner.run(target, run_index, sink, cancel);
            cancel.cancel();
            result
        }
    }

    #[test]
    fn test_cancel_during_pause() {
        let runner = CancelAfterRun { inner: MockRunner::new(vec![MockRun::succeed(1.0)]) };
        let mut agg = RunAggregator::new(&runner, target(), CancelToken::new());
        let mut sink = VecSink::default();
        let started = Instant::now();
        agg.run_sequence(3, RunMode::Repeat { delay: Duration::from_secs(30) }, &mut sink, &mut ());
        assert_eq!(agg.state(), SequenceState::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(agg.results().len(), 1);
        assert_eq!(runner.inner.launches(), 1);
    }

    struct CancelOnStart(CancelToken);

    impl SequenceObserver for CancelOnStart {
        fn run_started(&mut self, _index: u32, _total: u32, _out: &mut dyn LineSink) {
            self.0.cancel();
        }
    }

    #[test]
    fn test_cancel_before_launch_returns_from_runner() {
        let runner = MockRunner::new(vec![MockRun::succeed(1.0)]);
        let cancel = CancelToken::new();
        let mut agg = RunAggregator::new(&runner, target(), cancel.clone());
        let mut sink = VecSink::default();
        agg.run_sequence(2, repeat(), &mut sink, &mut CancelOnStart(cancel.clone()));
        assert_eq!(agg.state(), SequenceState::Cancelled);
        assert!(agg.results().is_empty());
    }

    #[test]
    fn test_benchmark_stats_count_successes_only() {
        let runner = MockRunner::new(vec![MockRun::succeed(2.0), MockRun::succeed(4.0), MockRun::fail(1, "oom")]);
        let agg = run(&runner, 3, RunMode::Benchmark);
        let stats = agg.stats().unwrap();
        assert_eq!(stats.sample_count, 2);
        assert!((stats.mean.as_secs_f64() - 3.0).abs() < 1e-9);
        assert_eq!(stats.min, Some(Duration::from_secs(2)));
        assert_eq!(stats.max, Some(Duration::from_secs(4)));
        assert_eq!(agg.state(), SequenceState::Aborted);
    }

    #[test]
    fn test_benchmark_single_success() {
        let runner = MockRunner::new(vec![MockRun::succeed(2.0), MockRun::fail(1, "")]);
        let agg = run(&runner, 3, RunMode::Benchmark);
        let stats = agg.stats().unwrap();
        assert_eq!(stats.sample_count, 1);
        assert!(stats.stddev.is_none());
        assert_eq!(stats.mean, Duration::from_secs(2));
    }

    #[test]
    fn test_zero_runs_completes_empty() {
        let runner = MockRunner::new(vec![]);
        let agg = run(&runner, 0, RunMode::Benchmark);
        assert_eq!(agg.state(), SequenceState::Completed);
        assert!(agg.results().is_empty());
        assert_eq!(agg.stats().unwrap().sample_count, 0);
        assert_eq!(runner.launches(), 0);
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<(u32, u32)>,
        finished: Vec<(u32, bool)>,
        pauses: usize,
    }

    impl SequenceObserver for Recorder {
        fn run_started(&mut self, index: u32, total: u32, _out: &mut dyn LineSink) {
            self.started.push((index, total));
        }

        fn run_finished(&mut self, result: &RunResult, out: &mut dyn LineSink) {
            self.finished.push((result.run_index, result.success));
            out.emit("finished");
        }

        fn pausing(&mut self, _delay: Duration, _out: &mut dyn LineSink) {
            self.pauses += 1;
        }
    }

    #[test]
    fn test_observer_sees_every_step() {
        let runner = MockRunner::new(vec![MockRun::succeed(1.0), MockRun::succeed(1.0), MockRun::fail(1, "")]);
        let mut agg = RunAggregator::new(&runner, target(), CancelToken::new());
        let mut sink = VecSink::default();
        let mut recorder = Recorder::default();
        agg.run_sequence(3, RunMode::Repeat { delay: Duration::from_millis(1) }, &mut sink, &mut recorder);
        assert_eq!(recorder.started, vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(recorder.finished, vec![(1, true), (2, true), (3, false)]);
        assert_eq!(recorder.pauses, 2);
        // run output and observer output share one sink, in order
        assert_eq!(
            sink.lines,
            vec!["Test Accuracy: 80.0%", "finished", "Test Accuracy: 80.0%", "finished", "finished"]
        );
    }

    #[test]
    fn test_benchmark_mode_never_pauses() {
        let runner = MockRunner::new(vec![MockRun::succeed(1.0), MockRun::succeed(1.0)]);
        let mut agg = RunAggregator::new(&runner, target(), CancelToken::new());
        let mut recorder = Recorder::default();
        agg.run_sequence(2, RunMode::Benchmark, &mut VecSink::default(), &mut recorder);
        assert_eq!(recorder.pauses, 0);
    }

    #[test]
    fn test_report_carries_reason() {
        let runner = MockRunner::new(vec![MockRun::fail(3, "segfault")]);
        let agg = run(&runner, 3, repeat());
        let (report, reason) = agg.finish();
        assert_eq!(report.requested_runs, 3);
        assert_eq!(report.state, SequenceState::Aborted);
        assert!(report.abort_reason.unwrap().contains("exit code 3"));
        assert!(matches!(reason, Some(TrainerError::RunFailure { .. })));
    }
}
