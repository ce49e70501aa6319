use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use hps_core::{Assignment, NewSweep, ParameterSpace, SweepId};
use hps_exp::{from_json_or_yaml_slice, from_json_slice};
use serde::Serialize;
use serde_json::Value;

use super::{emit, Context};

#[derive(Args, Debug)]
pub struct CreateSweepArgs {
    /// Traversal method: `random` or `grid`.
    #[arg(long)]
    pub method: String,
    /// JSON or YAML file mapping parameter names to candidate lists.
    #[arg(long)]
    pub parameters: PathBuf,
    #[arg(long)]
    pub description: Option<String>,
    /// Free-form JSON metadata stored with the sweep.
    #[arg(long)]
    pub metadata: Option<String>,
}

#[derive(Args, Debug)]
pub struct IterateArgs {
    #[arg(long = "sweep")]
    pub sweep_id: i64,
}

#[derive(Serialize)]
struct SweepCreated {
    #[serde(rename = "SweepID")]
    sweep_id: SweepId,
}

#[derive(Serialize)]
struct Iterated {
    #[serde(rename = "Parameters")]
    parameters: Assignment,
}

pub fn create(ctx: &mut Context, args: &CreateSweepArgs) -> Result<(), Box<dyn Error>> {
    let raw = fs::read(&args.parameters)?;
    // Validated after decoding so an empty candidate list stays a space error.
    let declared: BTreeMap<String, Vec<Value>> = from_json_or_yaml_slice(&raw)?;
    let parameters = ParameterSpace::new(declared)?;
    let metadata = match &args.metadata {
        Some(text) => Some(from_json_slice(text.as_bytes())?),
        None => None,
    };
    let sweep_id = ctx.allocator.create_sweep(&NewSweep {
        method: args.method.clone(),
        parameters,
        description: args.description.clone(),
        metadata,
    })?;
    emit(&SweepCreated { sweep_id })
}

pub fn iterate(ctx: &mut Context, args: &IterateArgs) -> Result<(), Box<dyn Error>> {
    let allocation = ctx
        .allocator
        .allocate(SweepId::from_raw(args.sweep_id), &mut ctx.rng)?;
    emit(&Iterated {
        parameters: allocation.assignment,
    })
}
