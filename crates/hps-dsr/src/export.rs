use std::fs;
use std::path::Path;

use hps_core::errors::{ErrorInfo, HpsError};
use hps_core::{RunRecord, SweepId, SweepRecord, SweepStore};
use hps_exp::{space_hash, to_canonical_json_bytes};
use serde::{Deserialize, Serialize};

/// A sweep together with every run allocated from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepExport {
    pub sweep: SweepRecord,
    pub space_hash: String,
    pub runs: Vec<RunRecord>,
}

impl SweepExport {
    /// Reads the sweep and its runs in one unit of work, so the cursor and
    /// the run list describe the same moment.
    pub fn load<S: SweepStore>(store: &S, sweep: SweepId) -> Result<Self, HpsError> {
        store.transaction(|tx| {
            let record = tx.lock_sweep(sweep)?;
            let runs = tx.list_runs(Some(sweep))?;
            Ok(Self {
                space_hash: space_hash(&record.parameters)?,
                sweep: record,
                runs,
            })
        })
    }
}

/// Writes the canonical JSON export of `sweep` to `out_path`.
pub fn export_json<S: SweepStore>(
    store: &S,
    sweep: SweepId,
    out_path: &Path,
) -> Result<(), HpsError> {
    let export = SweepExport::load(store, sweep)?;
    let bytes = to_canonical_json_bytes(&export)?;
    fs::write(out_path, bytes).map_err(|err| {
        HpsError::Storage(
            ErrorInfo::new("hps_dsr.export", err.to_string())
                .with_context("path", out_path.display().to_string()),
        )
    })
}
