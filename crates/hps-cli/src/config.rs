//! Layered CLI configuration: optional YAML file, then command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use hps_core::errors::{ErrorInfo, HpsError};
use hps_dsr::{JournalMode, StoreConfig};
use hps_exp::from_yaml_slice;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_PATH: &str = "hps.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5_000,
            journal_mode: JournalMode::Wal,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RngSection {
    /// Master seed for random sweeps; OS entropy when absent.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub store: StoreSection,
    pub rng: RngSection,
    pub log: LogSection,
}

/// Values given on the command line; each one wins over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub db: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl CliConfig {
    /// Reads `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, HpsError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let bytes = fs::read(path).map_err(|err| {
            HpsError::Config(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        from_yaml_slice(&bytes).map_err(|err| {
            HpsError::Config(
                ErrorInfo::new("config-parse", err.info().message.clone())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    pub fn apply(mut self, overrides: &Overrides) -> Self {
        if let Some(db) = &overrides.db {
            self.store.path = Some(db.clone());
        }
        if overrides.seed.is_some() {
            self.rng.seed = overrides.seed;
        }
        self
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self
                .store
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            busy_timeout_ms: self.store.busy_timeout_ms,
            journal_mode: self.store.journal_mode,
        }
    }
}
