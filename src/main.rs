#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use train_harness::cancel::{self, CancelToken};
use train_harness::config::TrainerConfig;
use train_harness::report::to_json;
use train_harness::runner::{ChildRunner, ConsoleSink, LineSink};
use train_harness::train_cmd::SequenceOutput;
use train_harness::{
    TrainerError, TrainerResult, bench_cmd, build_cmd, check_cmd, menu_cmd, train_cmd,
};

#[derive(Parser, Debug)]
#[command(name = "train-harness")]
#[command(about = "Build, run and benchmark the Fashion-MNIST transformer trainer", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set TRAIN_HARNESS_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    /// TOML file overriding the built-in defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Trainer binary to launch
    #[arg(long, global = true, value_name = "PATH")]
    exe: Option<PathBuf>,

    /// Directory holding the dataset files
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Arguments passed to the trainer, as one shell-quoted string
    #[arg(long, global = true, allow_hyphen_values = true)]
    args: Option<String>,

    /// Print a JSON report on stdout; human output moves to stderr
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile the trainer from its sources
    Build,
    /// Run the trainer once
    Run,
    /// Run the trainer several times with a pause between runs
    Multi {
        /// Number of runs
        #[arg(long)]
        runs: Option<u32>,
        /// Seconds to pause between runs
        #[arg(long)]
        delay: Option<f64>,
    },
    /// Run back-to-back and report timing statistics
    Bench {
        /// Number of runs
        #[arg(long)]
        runs: Option<u32>,
    },
    /// Check the trainer binary and dataset files
    Check,
    /// Show resolved file paths
    Paths,
    /// Show compiler, disk, CPU and memory information
    System,
    /// Interactive menu (the default)
    Menu,
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("TRAIN_HARNESS_LOG").unwrap_or_else(|_| {
        if verbose { "train_harness=debug".to_string() } else { "train_harness=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn load_config(cli: &Cli) -> TrainerResult<TrainerConfig> {
    let mut config = match &cli.config {
        Some(path) => TrainerConfig::load(path)?,
        None => TrainerConfig::default(),
    };
    if let Some(exe) = &cli.exe {
        config = config.with_executable(exe);
    }
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(args) = &cli.args {
        let split = shlex::split(args)
            .ok_or_else(|| TrainerError::Config(format!("cannot split --args {args:?}")))?;
        config = config.with_args(split);
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> TrainerResult<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

fn finish_sequence(output: SequenceOutput, json: bool) -> TrainerResult<()> {
    if json {
        print_json(&output.report)?;
    }
    output.into_result().map(|_| ())
}

fn dispatch(cli: Cli) -> TrainerResult<()> {
    let mut config = load_config(&cli)?;
    let cancel = CancelToken::watching_interrupts();
    let runner = ChildRunner::new();
    let mut out = if cli.json { ConsoleSink::Stderr } else { ConsoleSink::Stdout };

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Build => {
            build_cmd::run(&config, &mut out)?;
        }
        Commands::Run => {
            let result = train_cmd::run(&config, &runner, &cancel, &mut out)?;
            if cli.json {
                print_json(&serde_json::json!({
                    "result": &result,
                    "metrics": result.metrics(),
                }))?;
            }
            if let Some(err) = result.failure() {
                return Err(err);
            }
        }
        Commands::Multi { runs, delay } => {
            if let Some(secs) = delay {
                let delay = Duration::try_from_secs_f64(secs)
                    .map_err(|e| TrainerError::Config(format!("--delay {secs}: {e}")))?;
                config = config.with_delay(delay);
            }
            let runs = runs.unwrap_or(config.runs);
            let output = train_cmd::run_multi(&config, &runner, &cancel, runs, &mut out)?;
            finish_sequence(output, cli.json)?;
        }
        Commands::Bench { runs } => {
            let runs = runs.unwrap_or(config.bench_runs);
            let output = bench_cmd::run(&config, &runner, &cancel, runs, &mut out)?;
            finish_sequence(output, cli.json)?;
        }
        Commands::Check => {
            let report = check_cmd::files(&config, &mut out)?;
            if cli.json {
                print_json(&report)?;
            }
        }
        Commands::Paths => check_cmd::paths(&config, &mut out)?,
        Commands::System => {
            let report = check_cmd::system(&config, &mut out);
            if cli.json {
                print_json(&report)?;
            }
        }
        Commands::Menu => {
            out.emit("Fashion-MNIST transformer trainer");
            check_cmd::system(&config, &mut out);
            let stdin = std::io::stdin();
            menu_cmd::run(&config, &runner, &cancel, stdin.lock(), &mut out)?;
        }
    }
    Ok(())
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cancel::install_interrupt_handler();

    if let Err(e) = dispatch(cli) {
        // Run failures were already summarized with their stderr.
        if !matches!(e, TrainerError::RunFailure { .. }) {
            eprintln!("{:#}", e);
        }
        std::process::exit(e.exit_status());
    }
}
