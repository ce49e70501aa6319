use hps_core::errors::{ErrorInfo, HpsError};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

pub const SCHEMA_VERSION: i64 = 1;

pub(crate) fn sqlite_error(code: &str, err: rusqlite::Error) -> HpsError {
    let busy = matches!(
        &err,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    );
    let info = ErrorInfo::new(code, err.to_string());
    if busy {
        HpsError::Storage(
            info.with_context("sqlite", "busy")
                .with_hint("another writer holds the database; retry the operation"),
        )
    } else {
        HpsError::Storage(info)
    }
}

/// Creates the registry tables, or checks the version of an existing registry.
pub fn init_schema(conn: &mut Connection) -> Result<(), HpsError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|err| sqlite_error("hps_dsr.schema", err))?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta(version INTEGER NOT NULL);
        CREATE TABLE IF NOT EXISTS sweep(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            method TEXT NOT NULL,
            cursor INTEGER NOT NULL DEFAULT 0 CHECK(cursor >= 0),
            description TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS sweep_parameter(
            sweep_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            candidates TEXT NOT NULL,
            PRIMARY KEY(sweep_id, key),
            FOREIGN KEY(sweep_id) REFERENCES sweep(id)
        );
        CREATE TABLE IF NOT EXISTS run(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sweep_id INTEGER,
            commit_hash TEXT NOT NULL,
            command TEXT NOT NULL,
            description TEXT,
            assignment TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(sweep_id) REFERENCES sweep(id)
        );
        CREATE INDEX IF NOT EXISTS run_sweep ON run(sweep_id);
        CREATE TABLE IF NOT EXISTS run_log(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL,
            document TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(run_id) REFERENCES run(id)
        );
        CREATE INDEX IF NOT EXISTS run_log_run ON run_log(run_id);",
    )
    .map_err(|err| sqlite_error("hps_dsr.schema", err))?;
    set_version(&tx, SCHEMA_VERSION)?;
    tx.commit()
        .map_err(|err| sqlite_error("hps_dsr.schema", err))
}

fn set_version(conn: &Connection, version: i64) -> Result<(), HpsError> {
    let existing: Option<i64> = conn
        .query_row("SELECT version FROM meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|err| sqlite_error("hps_dsr.schema", err))?;
    match existing {
        Some(current) if current == version => Ok(()),
        Some(current) => Err(HpsError::Storage(
            ErrorInfo::new(
                "schema-version",
                format!("registry schema {current} incompatible with expected {version}"),
            )
            .with_context("found", current.to_string())
            .with_context("expected", version.to_string()),
        )),
        None => {
            conn.execute("INSERT INTO meta(version) VALUES (?)", params![version])
                .map_err(|err| sqlite_error("hps_dsr.schema", err))?;
            Ok(())
        }
    }
}
