//! SQLite-backed sweep and run registry.

pub mod export;
pub mod schema;
pub mod store;

pub use export::{export_json, SweepExport};
pub use schema::{init_schema, SCHEMA_VERSION};
pub use store::{JournalMode, SqliteStore, StoreConfig};
