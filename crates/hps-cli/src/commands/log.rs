use std::error::Error;

use clap::Args;
use hps_core::{LogId, RunId};
use hps_exp::from_json_slice;
use serde::Serialize;
use serde_json::Value;

use super::{emit, Context};

#[derive(Args, Debug)]
pub struct LogDocumentArgs {
    #[arg(long = "run")]
    pub run_id: i64,
    /// JSON document to append.
    #[arg(long)]
    pub document: String,
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    #[arg(long = "run")]
    pub run_id: i64,
}

#[derive(Serialize)]
struct LogAppended {
    #[serde(rename = "LogID")]
    log_id: LogId,
}

pub fn append(ctx: &mut Context, args: &LogDocumentArgs) -> Result<(), Box<dyn Error>> {
    let document: Value = from_json_slice(args.document.as_bytes())?;
    let log_id = ctx
        .allocator
        .log_document(RunId::from_raw(args.run_id), &document)?;
    emit(&LogAppended { log_id })
}

pub fn list(ctx: &mut Context, args: &LogsArgs) -> Result<(), Box<dyn Error>> {
    let logs = ctx.allocator.logs(RunId::from_raw(args.run_id))?;
    emit(&logs)
}
