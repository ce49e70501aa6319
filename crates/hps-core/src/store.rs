//! Persistence contract consumed by the allocation service.

use serde_json::Value;

use crate::errors::HpsError;
use crate::types::{
    Assignment, LogId, LogRecord, NewRun, NewSweep, RunId, RunRecord, SweepId, SweepRecord,
};

/// Operations available inside one unit of work.
///
/// Nothing written through a transaction is visible to other units of work
/// until the enclosing [`SweepStore::transaction`] commits.
pub trait SweepTransaction {
    /// Inserts a sweep with its cursor at zero.
    fn insert_sweep(&mut self, sweep: &NewSweep) -> Result<SweepId, HpsError>;

    /// Loads a sweep and holds its lock until the unit of work ends.
    ///
    /// Fails with [`HpsError::NotFound`] when the sweep does not exist.
    fn lock_sweep(&mut self, id: SweepId) -> Result<SweepRecord, HpsError>;

    /// Overwrites the cursor of a sweep previously locked in this unit of work.
    fn store_cursor(&mut self, id: SweepId, cursor: u64) -> Result<(), HpsError>;

    /// Inserts a run together with its resolved assignment.
    fn insert_run(
        &mut self,
        run: &NewRun,
        assignment: Option<&Assignment>,
    ) -> Result<RunId, HpsError>;

    /// Loads a single run.
    fn load_run(&mut self, id: RunId) -> Result<RunRecord, HpsError>;

    /// Lists runs ordered by id, optionally restricted to one sweep.
    fn list_runs(&mut self, sweep: Option<SweepId>) -> Result<Vec<RunRecord>, HpsError>;

    /// Appends a document to the log stream of an existing run.
    fn insert_log(&mut self, run: RunId, document: &Value) -> Result<LogId, HpsError>;

    /// Loads the log stream of a run ordered by id.
    fn load_logs(&mut self, run: RunId) -> Result<Vec<LogRecord>, HpsError>;
}

/// Transactional storage backend.
pub trait SweepStore {
    /// Runs `work` as a single atomic unit of work.
    ///
    /// Commits when `work` returns `Ok`. When `work` fails, or the commit
    /// itself fails, every effect of the unit of work is discarded and the
    /// error is returned unchanged.
    fn transaction<T, F>(&self, work: F) -> Result<T, HpsError>
    where
        F: FnOnce(&mut dyn SweepTransaction) -> Result<T, HpsError>;
}

impl<S: SweepStore + ?Sized> SweepStore for &S {
    fn transaction<T, F>(&self, work: F) -> Result<T, HpsError>
    where
        F: FnOnce(&mut dyn SweepTransaction) -> Result<T, HpsError>,
    {
        (**self).transaction(work)
    }
}
