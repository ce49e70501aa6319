use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use commands::{
    export::{self, ExportArgs},
    log::{self, LogDocumentArgs, LogsArgs},
    run::{self, CreateRunArgs, RunsArgs},
    sweep::{self, CreateSweepArgs, IterateArgs},
    Context,
};
use config::{CliConfig, Overrides};

mod commands;
mod config;
mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "hps", about = "Hyperparameter sweep allocation and run registry")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite registry path; overrides `store.path`.
    #[arg(long, global = true, env = "HPS_DB")]
    db: Option<PathBuf>,
    /// Master seed for random sweeps; overrides `rng.seed`.
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Declare a sweep over a parameter space.
    CreateSweep(CreateSweepArgs),
    /// Register a run, drawing its parameters from a sweep when given.
    CreateRun(CreateRunArgs),
    /// Append a JSON document to a run's log stream.
    LogDocument(LogDocumentArgs),
    /// Allocate the next configuration of a sweep without creating a run.
    Iterate(IterateArgs),
    /// List runs, optionally for a single sweep.
    Runs(RunsArgs),
    /// Print the log stream of a run.
    Logs(LogsArgs),
    /// Export a sweep and its runs as canonical JSON.
    Export(ExportArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.as_deref())?.apply(&Overrides {
        db: cli.db,
        seed: cli.seed,
    });
    telemetry::init_logging(&config.log.filter)?;
    let mut ctx = Context::open(&config)?;
    match cli.command {
        Command::CreateSweep(args) => sweep::create(&mut ctx, &args),
        Command::CreateRun(args) => run::create(&mut ctx, &args),
        Command::LogDocument(args) => log::append(&mut ctx, &args),
        Command::Iterate(args) => sweep::iterate(&mut ctx, &args),
        Command::Runs(args) => run::list(&mut ctx, &args),
        Command::Logs(args) => log::list(&mut ctx, &args),
        Command::Export(args) => export::run(&mut ctx, &args),
    }
}
