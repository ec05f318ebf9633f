//! Interactive numbered menu.
//!
//! Each choice runs one command; its error, if any, is printed and the menu
//! comes back. End of input exits.

use std::io::BufRead;

use anyhow::Context;

use crate::cancel::CancelToken;
use crate::config::TrainerConfig;
use crate::runner::{LineSink, ProcessRunner};
use crate::{TrainerError, TrainerResult, bench_cmd, build_cmd, check_cmd, train_cmd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Build,
    SingleRun,
    MultiRun,
    Benchmark,
    CheckFiles,
    ShowPaths,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 7] = [
        MenuChoice::Build,
        MenuChoice::SingleRun,
        MenuChoice::MultiRun,
        MenuChoice::Benchmark,
        MenuChoice::CheckFiles,
        MenuChoice::ShowPaths,
        MenuChoice::Exit,
    ];

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Build),
            "2" => Some(MenuChoice::SingleRun),
            "3" => Some(MenuChoice::MultiRun),
            "4" => Some(MenuChoice::Benchmark),
            "5" => Some(MenuChoice::CheckFiles),
            "6" => Some(MenuChoice::ShowPaths),
            "7" => Some(MenuChoice::Exit),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::Build => "Compile trainer",
            MenuChoice::SingleRun => "Single training run",
            MenuChoice::MultiRun => "Multiple training runs",
            MenuChoice::Benchmark => "Performance benchmark",
            MenuChoice::CheckFiles => "Check data files",
            MenuChoice::ShowPaths => "Show file paths",
            MenuChoice::Exit => "Exit",
        }
    }
}

fn print_menu(out: &mut dyn LineSink) {
    out.emit("");
    out.emit("Select an option:");
    for (i, choice) in MenuChoice::ALL.iter().enumerate() {
        out.emit(&format!("  {}. {}", i + 1, choice.label()));
    }
    out.emit("Choice (1-7):");
}

fn dispatch(
    choice: MenuChoice,
    config: &TrainerConfig,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    out: &mut dyn LineSink,
) -> anyhow::Result<()> {
    match choice {
        MenuChoice::Build => {
            build_cmd::run(config, out).context("build")?;
        }
        MenuChoice::SingleRun => {
            // A failed run has already been summarized with its stderr.
            train_cmd::run(config, runner, cancel, out).context("training run")?;
        }
        MenuChoice::MultiRun => {
            let output = train_cmd::run_multi(config, runner, cancel, config.runs, out)
                .context("multi-run")?;
            cancelled(output.error)?;
        }
        MenuChoice::Benchmark => {
            let output = bench_cmd::run(config, runner, cancel, config.bench_runs, out)
                .context("benchmark")?;
            cancelled(output.error)?;
        }
        MenuChoice::CheckFiles => {
            check_cmd::files(config, out).context("file check")?;
        }
        MenuChoice::ShowPaths => {
            check_cmd::paths(config, out).context("paths")?;
        }
        MenuChoice::Exit => {}
    }
    Ok(())
}

/// Sequence summaries already show why a sequence stopped; only a
/// cancellation is raised again.
fn cancelled(error: Option<TrainerError>) -> TrainerResult<()> {
    match error {
        Some(TrainerError::UserCancelled) => Err(TrainerError::UserCancelled),
        _ => Ok(()),
    }
}

fn is_cancellation(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|e| matches!(e.downcast_ref::<TrainerError>(), Some(TrainerError::UserCancelled)))
}

/// Read choices from `input` until Exit or end of input.
pub fn run<R: BufRead>(
    config: &TrainerConfig,
    runner: &dyn ProcessRunner,
    cancel: &CancelToken,
    mut input: R,
    out: &mut dyn LineSink,
) -> TrainerResult<()> {
    loop {
        print_menu(out);
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            out.emit("Goodbye!");
            return Ok(());
        }

        let Some(choice) = MenuChoice::parse(&line) else {
            out.emit(&format!("Invalid option: {:?}. Please enter 1-7.", line.trim()));
            continue;
        };
        if choice == MenuChoice::Exit {
            out.emit("Goodbye!");
            return Ok(());
        }

        cancel.reset();
        if let Err(err) = dispatch(choice, config, runner, cancel, out) {
            if is_cancellation(&err) {
                out.emit("Interrupted by user");
            } else {
                out.emit(&format!("Error: {err:#}"));
            }
        }
    }
}
