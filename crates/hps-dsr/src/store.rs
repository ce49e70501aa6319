//! [`SweepStore`] over a single SQLite database file.
//!
//! Every unit of work runs inside `BEGIN IMMEDIATE`, which takes the database
//! write lock up front. Two allocators on the same sweep, whether they share a
//! store, hold separate connections or live in separate processes, therefore
//! serialise on that lock; a writer that cannot get it within the busy timeout
//! fails with a retryable [`HpsError::Storage`] and leaves nothing behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use hps_core::errors::{ErrorInfo, HpsError};
use hps_core::{
    Assignment, LogId, LogRecord, NewRun, NewSweep, ParameterSpace, RunId, RunRecord, SweepId,
    SweepRecord, SweepStore, SweepTransaction,
};
use hps_exp::{from_json_slice, to_canonical_json_bytes};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::schema::{init_schema, sqlite_error};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    pub fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "wal",
            JournalMode::Delete => "delete",
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Connection settings for [`SqliteStore::open`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// How long a unit of work waits for the write lock, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    #[serde(default)]
    pub journal_mode: JournalMode,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
        }
    }

    pub fn validate(&self) -> Result<(), HpsError> {
        if self.busy_timeout_ms == 0 {
            return Err(HpsError::Config(
                ErrorInfo::new("busy-timeout", "busy timeout must be positive")
                    .with_hint("set store.busy_timeout_ms to at least 1"),
            ));
        }
        if self.path.as_os_str().is_empty() {
            return Err(HpsError::Config(ErrorInfo::new(
                "store-path",
                "database path must not be empty",
            )));
        }
        Ok(())
    }
}

/// Sweep registry backed by one SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (creating when missing) the registry at `config.path`.
    pub fn open(config: &StoreConfig) -> Result<Self, HpsError> {
        config.validate()?;
        let mut conn = Connection::open(&config.path).map_err(|err| {
            let path = config.path.display().to_string();
            match sqlite_error("hps_dsr.open", err) {
                HpsError::Storage(info) => HpsError::Storage(info.with_context("path", path)),
                other => other,
            }
        })?;
        apply_pragmas(&conn, config)?;
        init_schema(&mut conn)?;
        info!(
            path = %config.path.display(),
            journal_mode = config.journal_mode.pragma_value(),
            busy_timeout_ms = config.busy_timeout_ms,
            "opened sweep registry"
        );
        Ok(Self {
            conn: Mutex::new(conn),
            path: config.path.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HpsError> {
        self.conn.lock().map_err(|_| {
            HpsError::Storage(ErrorInfo::new(
                "lock-poisoned",
                "sqlite connection lock poisoned",
            ))
        })
    }
}

fn apply_pragmas(conn: &Connection, config: &StoreConfig) -> Result<(), HpsError> {
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| sqlite_error("hps_dsr.pragma", err))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| sqlite_error("hps_dsr.pragma", err))?;
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = {};",
        config.journal_mode.pragma_value()
    ))
    .map_err(|err| sqlite_error("hps_dsr.pragma", err))?;
    Ok(())
}

impl SweepStore for SqliteStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, HpsError>
    where
        F: FnOnce(&mut dyn SweepTransaction) -> Result<T, HpsError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| sqlite_error("hps_dsr.begin", err))?;
        let mut unit = SqliteTransaction { tx };
        // Dropping `unit` on the error path rolls the transaction back.
        let value = work(&mut unit)?;
        unit.tx
            .commit()
            .map_err(|err| sqlite_error("hps_dsr.commit", err))?;
        Ok(value)
    }
}

struct SqliteTransaction<'conn> {
    tx: Transaction<'conn>,
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn json_text<T: Serialize>(value: &T) -> Result<String, HpsError> {
    let bytes = to_canonical_json_bytes(value)?;
    String::from_utf8(bytes)
        .map_err(|err| HpsError::Serde(ErrorInfo::new("json_utf8", err.to_string())))
}

fn parse_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, HpsError> {
    from_json_slice(text.as_bytes())
}

struct RunRow {
    id: i64,
    sweep_id: Option<i64>,
    commit_hash: String,
    command: String,
    description: Option<String>,
    assignment: Option<String>,
    created_at: String,
}

impl RunRow {
    const COLUMNS: &'static str =
        "id, sweep_id, commit_hash, command, description, assignment, created_at";

    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sweep_id: row.get(1)?,
            commit_hash: row.get(2)?,
            command: row.get(3)?,
            description: row.get(4)?,
            assignment: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<RunRecord, HpsError> {
        let assignment = self
            .assignment
            .as_deref()
            .map(parse_json::<Assignment>)
            .transpose()?;
        Ok(RunRecord {
            id: RunId::from_raw(self.id),
            commit_hash: self.commit_hash,
            command: self.command,
            description: self.description,
            sweep_id: self.sweep_id.map(SweepId::from_raw),
            assignment,
            created_at: self.created_at,
        })
    }
}

impl SqliteTransaction<'_> {
    fn sweep_exists(&self, id: SweepId) -> Result<bool, HpsError> {
        self.tx
            .query_row("SELECT 1 FROM sweep WHERE id = ?", [id.as_raw()], |_| Ok(()))
            .optional()
            .map(|found| found.is_some())
            .map_err(|err| sqlite_error("hps_dsr.query", err))
    }

    fn ensure_run(&self, id: RunId) -> Result<(), HpsError> {
        let found = self
            .tx
            .query_row("SELECT 1 FROM run WHERE id = ?", [id.as_raw()], |_| Ok(()))
            .optional()
            .map_err(|err| sqlite_error("hps_dsr.query", err))?;
        found.ok_or_else(|| HpsError::run_not_found(id))
    }

    fn load_space(&self, id: SweepId) -> Result<ParameterSpace, HpsError> {
        let mut stmt = self
            .tx
            .prepare("SELECT key, candidates FROM sweep_parameter WHERE sweep_id = ? ORDER BY key")
            .map_err(|err| sqlite_error("hps_dsr.query", err))?;
        let rows = stmt
            .query_map([id.as_raw()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|err| sqlite_error("hps_dsr.query", err))?;
        let mut parameters = BTreeMap::new();
        for row in rows {
            let (key, candidates) = row.map_err(|err| sqlite_error("hps_dsr.query", err))?;
            parameters.insert(key, parse_json::<Vec<Value>>(&candidates)?);
        }
        ParameterSpace::new(parameters)
    }
}

impl SweepTransaction for SqliteTransaction<'_> {
    fn insert_sweep(&mut self, sweep: &NewSweep) -> Result<SweepId, HpsError> {
        let metadata = sweep.metadata.as_ref().map(json_text).transpose()?;
        self.tx
            .execute(
                "INSERT INTO sweep(method, cursor, description, metadata, created_at) VALUES (?, 0, ?, ?, ?)",
                params![sweep.method, sweep.description, metadata, now()],
            )
            .map_err(|err| sqlite_error("hps_dsr.insert_sweep", err))?;
        let id = SweepId::from_raw(self.tx.last_insert_rowid());
        for name in sweep.parameters.dimensions() {
            let candidates = sweep.parameters.candidates(name).unwrap_or_default();
            self.tx
                .execute(
                    "INSERT INTO sweep_parameter(sweep_id, key, candidates) VALUES (?, ?, ?)",
                    params![id.as_raw(), name, json_text(&candidates)?],
                )
                .map_err(|err| sqlite_error("hps_dsr.insert_sweep", err))?;
        }
        Ok(id)
    }

    fn lock_sweep(&mut self, id: SweepId) -> Result<SweepRecord, HpsError> {
        let row = self
            .tx
            .query_row(
                "SELECT method, cursor, description, metadata FROM sweep WHERE id = ?",
                [id.as_raw()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(|err| sqlite_error("hps_dsr.lock_sweep", err))?;
        let (method, cursor, description, metadata) =
            row.ok_or_else(|| HpsError::sweep_not_found(id))?;
        let cursor = u64::try_from(cursor).map_err(|_| {
            HpsError::Storage(
                ErrorInfo::new("corrupt-cursor", "stored cursor is negative")
                    .with_context("sweep_id", id.to_string())
                    .with_context("cursor", cursor.to_string()),
            )
        })?;
        Ok(SweepRecord {
            id,
            method,
            cursor,
            parameters: self.load_space(id)?,
            description,
            metadata: metadata.as_deref().map(parse_json::<Value>).transpose()?,
        })
    }

    fn store_cursor(&mut self, id: SweepId, cursor: u64) -> Result<(), HpsError> {
        let stored = i64::try_from(cursor).map_err(|_| {
            HpsError::Overflow(
                ErrorInfo::new("cursor-overflow", "cursor exceeds the registry integer range")
                    .with_context("sweep_id", id.to_string())
                    .with_context("cursor", cursor.to_string()),
            )
        })?;
        let changed = self
            .tx
            .execute(
                "UPDATE sweep SET cursor = ? WHERE id = ?",
                params![stored, id.as_raw()],
            )
            .map_err(|err| sqlite_error("hps_dsr.store_cursor", err))?;
        if changed == 0 {
            return Err(HpsError::sweep_not_found(id));
        }
        debug!(sweep_id = %id, cursor, "stored cursor");
        Ok(())
    }

    fn insert_run(
        &mut self,
        run: &NewRun,
        assignment: Option<&Assignment>,
    ) -> Result<RunId, HpsError> {
        if let Some(sweep) = run.sweep_id {
            if !self.sweep_exists(sweep)? {
                return Err(HpsError::sweep_not_found(sweep));
            }
        }
        let assignment = assignment.map(json_text).transpose()?;
        self.tx
            .execute(
                "INSERT INTO run(sweep_id, commit_hash, command, description, assignment, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    run.sweep_id.map(|id| id.as_raw()),
                    run.commit_hash,
                    run.command,
                    run.description,
                    assignment,
                    now()
                ],
            )
            .map_err(|err| sqlite_error("hps_dsr.insert_run", err))?;
        Ok(RunId::from_raw(self.tx.last_insert_rowid()))
    }

    fn load_run(&mut self, id: RunId) -> Result<RunRecord, HpsError> {
        let row = self
            .tx
            .query_row(
                &format!("SELECT {} FROM run WHERE id = ?", RunRow::COLUMNS),
                [id.as_raw()],
                RunRow::read,
            )
            .optional()
            .map_err(|err| sqlite_error("hps_dsr.load_run", err))?;
        row.ok_or_else(|| HpsError::run_not_found(id))?.into_record()
    }

    fn list_runs(&mut self, sweep: Option<SweepId>) -> Result<Vec<RunRecord>, HpsError> {
        let mut stmt = self
            .tx
            .prepare(&format!(
                "SELECT {} FROM run WHERE (?1 IS NULL OR sweep_id = ?1) ORDER BY id",
                RunRow::COLUMNS
            ))
            .map_err(|err| sqlite_error("hps_dsr.list_runs", err))?;
        let rows = stmt
            .query_map([sweep.map(|id| id.as_raw())], RunRow::read)
            .map_err(|err| sqlite_error("hps_dsr.list_runs", err))?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(
                row.map_err(|err| sqlite_error("hps_dsr.list_runs", err))?
                    .into_record()?,
            );
        }
        Ok(runs)
    }

    fn insert_log(&mut self, run: RunId, document: &Value) -> Result<LogId, HpsError> {
        self.ensure_run(run)?;
        self.tx
            .execute(
                "INSERT INTO run_log(run_id, document, created_at) VALUES (?, ?, ?)",
                params![run.as_raw(), json_text(document)?, now()],
            )
            .map_err(|err| sqlite_error("hps_dsr.insert_log", err))?;
        Ok(LogId::from_raw(self.tx.last_insert_rowid()))
    }

    fn load_logs(&mut self, run: RunId) -> Result<Vec<LogRecord>, HpsError> {
        self.ensure_run(run)?;
        let mut stmt = self
            .tx
            .prepare("SELECT id, document, created_at FROM run_log WHERE run_id = ? ORDER BY id")
            .map_err(|err| sqlite_error("hps_dsr.load_logs", err))?;
        let rows = stmt
            .query_map([run.as_raw()], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|err| sqlite_error("hps_dsr.load_logs", err))?;
        let mut logs = Vec::new();
        for row in rows {
            let (id, document, created_at) =
                row.map_err(|err| sqlite_error("hps_dsr.load_logs", err))?;
            logs.push(LogRecord {
                id: LogId::from_raw(id),
                run_id: run,
                document: parse_json(&document)?,
                created_at,
            });
        }
        Ok(logs)
    }
}
