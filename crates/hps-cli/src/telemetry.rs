use hps_core::errors::{ErrorInfo, HpsError};
use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `RUST_LOG` wins over `fallback`.
pub fn init_logging(fallback: &str) -> Result<(), HpsError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback).map_err(|err| {
            HpsError::Config(
                ErrorInfo::new("log-filter", err.to_string()).with_context("filter", fallback),
            )
        })?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| HpsError::Config(ErrorInfo::new("log-init", err.to_string())))
}
