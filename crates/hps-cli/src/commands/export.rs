use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use hps_core::SweepId;
use hps_dsr::{export_json, SweepExport};

use super::{emit, Context};

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long = "sweep")]
    pub sweep_id: i64,
    /// Output file; stdout when omitted.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run(ctx: &mut Context, args: &ExportArgs) -> Result<(), Box<dyn Error>> {
    let sweep = SweepId::from_raw(args.sweep_id);
    let store = ctx.allocator.store();
    match &args.out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent)?;
            }
            export_json(store, sweep, out)?;
            Ok(())
        }
        None => emit(&SweepExport::load(store, sweep)?),
    }
}
