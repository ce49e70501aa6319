use std::cell::RefCell;

use hps_core::{
    Assignment, HpsError, LogId, LogRecord, NewRun, NewSweep, RunId, RunRecord, SweepId,
    SweepRecord, SweepStore, SweepTransaction,
};
use serde_json::Value;

#[derive(Default)]
struct CountingStore {
    commits: RefCell<usize>,
    rollbacks: RefCell<usize>,
}

struct NullTransaction;

impl SweepTransaction for NullTransaction {
    fn insert_sweep(&mut self, _sweep: &NewSweep) -> Result<SweepId, HpsError> {
        Ok(SweepId::from_raw(1))
    }

    fn lock_sweep(&mut self, id: SweepId) -> Result<SweepRecord, HpsError> {
        Err(HpsError::sweep_not_found(id))
    }

    fn store_cursor(&mut self, _id: SweepId, _cursor: u64) -> Result<(), HpsError> {
        Ok(())
    }

    fn insert_run(
        &mut self,
        _run: &NewRun,
        _assignment: Option<&Assignment>,
    ) -> Result<RunId, HpsError> {
        Ok(RunId::from_raw(1))
    }

    fn load_run(&mut self, id: RunId) -> Result<RunRecord, HpsError> {
        Err(HpsError::run_not_found(id))
    }

    fn list_runs(&mut self, _sweep: Option<SweepId>) -> Result<Vec<RunRecord>, HpsError> {
        Ok(Vec::new())
    }

    fn insert_log(&mut self, _run: RunId, _document: &Value) -> Result<LogId, HpsError> {
        Ok(LogId::from_raw(1))
    }

    fn load_logs(&mut self, _run: RunId) -> Result<Vec<LogRecord>, HpsError> {
        Ok(Vec::new())
    }
}

impl SweepStore for CountingStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, HpsError>
    where
        F: FnOnce(&mut dyn SweepTransaction) -> Result<T, HpsError>,
    {
        let mut tx = NullTransaction;
        let outcome = work(&mut tx);
        match &outcome {
            Ok(_) => *self.commits.borrow_mut() += 1,
            Err(_) => *self.rollbacks.borrow_mut() += 1,
        }
        outcome
    }
}

#[test]
fn store_trait_is_implementable_and_borrowable() {
    let store = CountingStore::default();
    let id = store
        .transaction(|tx| tx.insert_sweep(&NewSweep {
            method: "grid".into(),
            parameters: Default::default(),
            description: None,
            metadata: None,
        }))
        .expect("insert");
    assert_eq!(id.as_raw(), 1);

    let borrowed = &store;
    let err = borrowed
        .transaction(|tx| tx.lock_sweep(SweepId::from_raw(9)))
        .unwrap_err();
    assert!(matches!(err, HpsError::NotFound(_)));
    assert_eq!(*store.commits.borrow(), 1);
    assert_eq!(*store.rollbacks.borrow(), 1);
}
