use hps_core::errors::HpsError;
use hps_core::{
    Assignment, Coordinate, LogId, LogRecord, NewRun, NewSweep, RunId, RunRecord, SweepId,
    SweepMethod, SweepStore, SweepTransaction,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec;
use crate::hash::space_hash;
use crate::sampler;

/// Result of allocating one configuration from a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub sweep_id: SweepId,
    pub method: SweepMethod,
    /// Grid index consumed by this allocation; `None` for random sweeps.
    pub cursor: Option<u64>,
    pub coordinate: Coordinate,
    pub assignment: Assignment,
}

/// Allocation service over a transactional sweep store.
///
/// Every public operation is one unit of work against the store: either all
/// of its writes commit or none do.
#[derive(Debug, Clone)]
pub struct Allocator<S> {
    store: S,
}

impl<S: SweepStore> Allocator<S> {
    /// Wraps a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrows the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the underlying store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Validates and persists a new sweep with its cursor at zero.
    pub fn create_sweep(&self, sweep: &NewSweep) -> Result<SweepId, HpsError> {
        let method: SweepMethod = sweep.method.parse()?;
        let cardinalities = sweep.parameters.cardinalities();
        if method == SweepMethod::Grid {
            codec::product(&cardinalities)?;
        }
        let fingerprint = space_hash(&sweep.parameters)?;
        let id = self.store.transaction(|tx| tx.insert_sweep(sweep))?;
        info!(
            sweep_id = %id,
            method = %method,
            dimensions = cardinalities.len(),
            space_hash = %fingerprint,
            "created sweep"
        );
        Ok(id)
    }

    /// Allocates the next configuration of a sweep.
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        sweep: SweepId,
        rng: &mut R,
    ) -> Result<Allocation, HpsError> {
        self.store
            .transaction(|tx| allocate_in(tx, sweep, rng))
            .map_err(|err| rolled_back("allocate", err))
    }

    /// Creates a run, drawing its assignment from `run.sweep_id` when set.
    ///
    /// The allocation and the run insert share one unit of work, so a failed
    /// insert never consumes a grid cursor.
    pub fn create_run<R: Rng + ?Sized>(
        &self,
        run: &NewRun,
        rng: &mut R,
    ) -> Result<RunRecord, HpsError> {
        self.store
            .transaction(|tx| {
                let assignment = match run.sweep_id {
                    Some(sweep) => Some(allocate_in(tx, sweep, rng)?.assignment),
                    None => None,
                };
                let id = tx.insert_run(run, assignment.as_ref())?;
                tx.load_run(id)
            })
            .map_err(|err| rolled_back("create_run", err))
    }

    /// Appends a JSON document to a run's log stream.
    pub fn log_document(&self, run: RunId, document: &Value) -> Result<LogId, HpsError> {
        self.store.transaction(|tx| tx.insert_log(run, document))
    }

    /// Loads a run.
    pub fn run(&self, id: RunId) -> Result<RunRecord, HpsError> {
        self.store.transaction(|tx| tx.load_run(id))
    }

    /// Lists runs, optionally restricted to one sweep.
    pub fn runs(&self, sweep: Option<SweepId>) -> Result<Vec<RunRecord>, HpsError> {
        self.store.transaction(|tx| tx.list_runs(sweep))
    }

    /// Loads the log stream of a run.
    pub fn logs(&self, run: RunId) -> Result<Vec<LogRecord>, HpsError> {
        self.store.transaction(|tx| tx.load_logs(run))
    }
}

/// Allocation steps run inside an already open unit of work.
///
/// The sweep stays locked from the read of its cursor until the unit of work
/// ends, so the cursor write below cannot interleave with another allocation.
pub fn allocate_in<R: Rng + ?Sized>(
    tx: &mut dyn SweepTransaction,
    sweep: SweepId,
    rng: &mut R,
) -> Result<Allocation, HpsError> {
    let record = tx.lock_sweep(sweep)?;
    let cardinalities = record.parameters.cardinalities();
    let drawn = sampler::sample(&record.method, &cardinalities, record.cursor, rng)?;
    if let Some(next) = drawn.next_cursor {
        tx.store_cursor(sweep, next)?;
    }
    let assignment = record.parameters.resolve(&drawn.coordinate)?;
    let cursor = drawn.next_cursor.map(|_| record.cursor);
    debug!(
        sweep_id = %sweep,
        method = %drawn.method,
        cursor = ?cursor,
        coordinate = ?drawn.coordinate.digits(),
        "allocated configuration"
    );
    Ok(Allocation {
        sweep_id: sweep,
        method: drawn.method,
        cursor,
        coordinate: drawn.coordinate,
        assignment,
    })
}

fn rolled_back(operation: &str, err: HpsError) -> HpsError {
    warn!(
        operation,
        code = %err.info().code,
        retryable = err.is_retryable(),
        "unit of work rolled back"
    );
    err
}
