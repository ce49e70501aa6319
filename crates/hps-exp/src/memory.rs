//! In-process [`SweepStore`] used by tests, benchmarks and embedders that do
//! not need durability.
//!
//! A unit of work holds the store mutex from start to finish and writes to the
//! tables in place, recording an undo entry per write. A failed unit replays
//! its undo log in reverse. Units of work are therefore serialised, which
//! makes every sweep lock trivially exclusive.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use hps_core::errors::{ErrorInfo, HpsError};
use hps_core::{
    Assignment, LogId, LogRecord, NewRun, NewSweep, ParameterSpace, RunId, RunRecord, SweepId,
    SweepRecord, SweepStore, SweepTransaction,
};
use serde_json::Value;
use tracing::trace;

#[derive(Debug, Default)]
struct Tables {
    sweeps: BTreeMap<SweepId, SweepRecord>,
    runs: BTreeMap<RunId, RunRecord>,
    logs: BTreeMap<LogId, LogRecord>,
    next_sweep: i64,
    next_run: i64,
    next_log: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn push_sweep(&mut self, sweep: &NewSweep) -> SweepId {
        let id = SweepId::from_raw(Self::next_id(&mut self.next_sweep));
        self.sweeps.insert(
            id,
            SweepRecord {
                id,
                method: sweep.method.clone(),
                cursor: 0,
                parameters: sweep.parameters.clone(),
                description: sweep.description.clone(),
                metadata: sweep.metadata.clone(),
            },
        );
        id
    }
}

#[derive(Debug, Clone, Copy)]
struct Counters {
    sweep: i64,
    run: i64,
    log: i64,
}

#[derive(Debug)]
enum Undo {
    SweepInserted(SweepId),
    CursorStored { sweep: SweepId, previous: u64 },
    RunInserted(RunId),
    LogInserted(LogId),
}

impl Tables {
    fn counters(&self) -> Counters {
        Counters {
            sweep: self.next_sweep,
            run: self.next_run,
            log: self.next_log,
        }
    }

    fn rollback(&mut self, undo: Vec<Undo>, counters: Counters) {
        for entry in undo.into_iter().rev() {
            match entry {
                Undo::SweepInserted(id) => {
                    self.sweeps.remove(&id);
                }
                Undo::CursorStored { sweep, previous } => {
                    if let Some(record) = self.sweeps.get_mut(&sweep) {
                        record.cursor = previous;
                    }
                }
                Undo::RunInserted(id) => {
                    self.runs.remove(&id);
                }
                Undo::LogInserted(id) => {
                    self.logs.remove(&id);
                }
            }
        }
        self.next_sweep = counters.sweep;
        self.next_run = counters.run;
        self.next_log = counters.log;
    }
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    failing_commits: u32,
}

/// Mutex-guarded in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` commits fail with [`HpsError::Storage`] after
    /// the work itself succeeded.
    pub fn fail_next_commits(&self, count: u32) -> Result<(), HpsError> {
        self.lock()?.failing_commits = count;
        Ok(())
    }

    /// Committed cursor of a sweep.
    pub fn cursor(&self, id: SweepId) -> Result<u64, HpsError> {
        self.lock()?
            .tables
            .sweeps
            .get(&id)
            .map(|sweep| sweep.cursor)
            .ok_or_else(|| HpsError::sweep_not_found(id))
    }

    /// Inserts a sweep without validating its method tag.
    ///
    /// Lets callers reproduce rows written by older or foreign writers.
    pub fn insert_raw_sweep(
        &self,
        method: &str,
        parameters: ParameterSpace,
    ) -> Result<SweepId, HpsError> {
        let sweep = NewSweep {
            method: method.to_owned(),
            parameters,
            description: None,
            metadata: None,
        };
        Ok(self.lock()?.tables.push_sweep(&sweep))
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, HpsError> {
        self.state.lock().map_err(|_| {
            HpsError::Storage(
                ErrorInfo::new("lock-poisoned", "memory store lock poisoned")
                    .with_hint("a previous unit of work panicked"),
            )
        })
    }
}

impl SweepStore for MemoryStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, HpsError>
    where
        F: FnOnce(&mut dyn SweepTransaction) -> Result<T, HpsError>,
    {
        let mut state = self.lock()?;
        let State {
            tables,
            failing_commits,
        } = &mut *state;
        let counters = tables.counters();
        let mut tx = MemoryTransaction {
            tables,
            undo: Vec::new(),
            locked: BTreeSet::new(),
        };
        let outcome = work(&mut tx).and_then(|value| {
            if *failing_commits > 0 {
                *failing_commits -= 1;
                trace!("injected commit failure");
                return Err(HpsError::Storage(ErrorInfo::new(
                    "commit-failed",
                    "injected commit failure",
                )));
            }
            Ok(value)
        });
        if outcome.is_err() {
            let undo = std::mem::take(&mut tx.undo);
            tx.tables.rollback(undo, counters);
        }
        outcome
    }
}

struct MemoryTransaction<'a> {
    tables: &'a mut Tables,
    undo: Vec<Undo>,
    locked: BTreeSet<SweepId>,
}

impl MemoryTransaction<'_> {
    fn ensure_run(&self, run: RunId) -> Result<(), HpsError> {
        if self.tables.runs.contains_key(&run) {
            Ok(())
        } else {
            Err(HpsError::run_not_found(run))
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl SweepTransaction for MemoryTransaction<'_> {
    fn insert_sweep(&mut self, sweep: &NewSweep) -> Result<SweepId, HpsError> {
        let id = self.tables.push_sweep(sweep);
        self.undo.push(Undo::SweepInserted(id));
        Ok(id)
    }

    fn lock_sweep(&mut self, id: SweepId) -> Result<SweepRecord, HpsError> {
        let record = self
            .tables
            .sweeps
            .get(&id)
            .cloned()
            .ok_or_else(|| HpsError::sweep_not_found(id))?;
        self.locked.insert(id);
        Ok(record)
    }

    fn store_cursor(&mut self, id: SweepId, cursor: u64) -> Result<(), HpsError> {
        if !self.locked.contains(&id) {
            return Err(HpsError::Storage(
                ErrorInfo::new("cursor-unlocked", "cursor written without holding the sweep lock")
                    .with_context("sweep_id", id.to_string()),
            ));
        }
        let sweep = self
            .tables
            .sweeps
            .get_mut(&id)
            .ok_or_else(|| HpsError::sweep_not_found(id))?;
        let previous = std::mem::replace(&mut sweep.cursor, cursor);
        self.undo.push(Undo::CursorStored { sweep: id, previous });
        Ok(())
    }

    fn insert_run(
        &mut self,
        run: &NewRun,
        assignment: Option<&Assignment>,
    ) -> Result<RunId, HpsError> {
        if let Some(sweep) = run.sweep_id {
            if !self.tables.sweeps.contains_key(&sweep) {
                return Err(HpsError::sweep_not_found(sweep));
            }
        }
        let id = RunId::from_raw(Tables::next_id(&mut self.tables.next_run));
        self.tables.runs.insert(
            id,
            RunRecord {
                id,
                commit_hash: run.commit_hash.clone(),
                command: run.command.clone(),
                description: run.description.clone(),
                sweep_id: run.sweep_id,
                assignment: assignment.cloned(),
                created_at: now(),
            },
        );
        self.undo.push(Undo::RunInserted(id));
        Ok(id)
    }

    fn load_run(&mut self, id: RunId) -> Result<RunRecord, HpsError> {
        self.tables
            .runs
            .get(&id)
            .cloned()
            .ok_or_else(|| HpsError::run_not_found(id))
    }

    fn list_runs(&mut self, sweep: Option<SweepId>) -> Result<Vec<RunRecord>, HpsError> {
        Ok(self
            .tables
            .runs
            .values()
            .filter(|run| sweep.is_none() || run.sweep_id == sweep)
            .cloned()
            .collect())
    }

    fn insert_log(&mut self, run: RunId, document: &Value) -> Result<LogId, HpsError> {
        self.ensure_run(run)?;
        let id = LogId::from_raw(Tables::next_id(&mut self.tables.next_log));
        self.tables.logs.insert(
            id,
            LogRecord {
                id,
                run_id: run,
                document: document.clone(),
                created_at: now(),
            },
        );
        self.undo.push(Undo::LogInserted(id));
        Ok(id)
    }

    fn load_logs(&mut self, run: RunId) -> Result<Vec<LogRecord>, HpsError> {
        self.ensure_run(run)?;
        Ok(self
            .tables
            .logs
            .values()
            .filter(|log| log.run_id == run)
            .cloned()
            .collect())
    }
}
