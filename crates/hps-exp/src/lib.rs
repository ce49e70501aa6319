//! Sweep allocation engine: mixed-radix codec, samplers and the transactional
//! allocation service over any [`hps_core::SweepStore`].

mod allocate;
pub mod codec;
mod hash;
mod memory;
pub mod sampler;
mod serde;

pub use allocate::{allocate_in, Allocation, Allocator};
pub use codec::{decode, encode, product};
pub use hash::{space_hash, stable_hash_string};
pub use memory::MemoryStore;
pub use sampler::{sample, sample_grid, sample_random, Sample};

pub use crate::serde::{
    from_json_or_yaml_slice, from_json_slice, from_yaml_slice, to_canonical_json_bytes,
};
