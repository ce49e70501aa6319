use std::error::Error;

use clap::Args;
use hps_core::{Assignment, NewRun, RunId, SweepId};
use serde::Serialize;

use super::{emit, Context};

#[derive(Args, Debug)]
pub struct CreateRunArgs {
    #[arg(long)]
    pub commit_hash: String,
    /// Command line the run executes.
    #[arg(long)]
    pub command: String,
    #[arg(long)]
    pub description: Option<String>,
    /// Sweep to draw the run's parameters from.
    #[arg(long = "sweep")]
    pub sweep_id: Option<i64>,
}

#[derive(Args, Debug)]
pub struct RunsArgs {
    #[arg(long = "sweep")]
    pub sweep_id: Option<i64>,
}

#[derive(Serialize)]
struct RunCreated {
    #[serde(rename = "RunID")]
    run_id: RunId,
    #[serde(rename = "Parameters", skip_serializing_if = "Option::is_none")]
    parameters: Option<Assignment>,
}

pub fn create(ctx: &mut Context, args: &CreateRunArgs) -> Result<(), Box<dyn Error>> {
    let run = NewRun {
        commit_hash: args.commit_hash.clone(),
        command: args.command.clone(),
        description: args.description.clone(),
        sweep_id: args.sweep_id.map(SweepId::from_raw),
    };
    let record = ctx.allocator.create_run(&run, &mut ctx.rng)?;
    emit(&RunCreated {
        run_id: record.id,
        parameters: record.assignment,
    })
}

pub fn list(ctx: &mut Context, args: &RunsArgs) -> Result<(), Box<dyn Error>> {
    let runs = ctx.allocator.runs(args.sweep_id.map(SweepId::from_raw))?;
    emit(&runs)
}
