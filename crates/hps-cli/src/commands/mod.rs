use std::error::Error;
use std::io::{self, Write};

use hps_core::{HpsError, RngHandle};
use hps_dsr::SqliteStore;
use hps_exp::{to_canonical_json_bytes, Allocator};
use serde::Serialize;
use tracing::debug;

use crate::config::CliConfig;

pub mod export;
pub mod log;
pub mod run;
pub mod sweep;

/// State shared by every subcommand.
pub struct Context {
    pub allocator: Allocator<SqliteStore>,
    pub rng: RngHandle,
}

impl Context {
    pub fn open(config: &CliConfig) -> Result<Self, HpsError> {
        let store = SqliteStore::open(&config.store_config())?;
        debug!(seeded = config.rng.seed.is_some(), "rng ready");
        Ok(Self {
            allocator: Allocator::new(store),
            rng: RngHandle::from_optional_seed(config.rng.seed),
        })
    }
}

/// Writes one canonical JSON document followed by a newline to stdout.
pub fn emit<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    let bytes = to_canonical_json_bytes(value)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(&bytes)?;
    stdout.write_all(b"\n")?;
    Ok(())
}
