#![deny(missing_docs)]
#![doc = "Core data model, error taxonomy and persistence traits for hyperparameter sweeps."]

pub mod errors;
pub mod rng;
pub mod store;
mod types;

pub use errors::{ErrorInfo, HpsError};
pub use rng::{derive_substream_seed, RngHandle};
pub use store::{SweepStore, SweepTransaction};
pub use types::{
    Assignment, Coordinate, LogId, LogRecord, NewRun, NewSweep, ParameterSpace, RunId, RunRecord,
    SweepId, SweepMethod, SweepRecord,
};
