use hps_core::errors::HpsError;
use hps_core::ParameterSpace;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::serde::to_canonical_json_bytes;

/// Computes a stable hexadecimal hash for the provided serializable payload.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, HpsError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}

/// Fingerprint of a parameter space: identical for spaces that declare the
/// same names with the same candidate lists in the same order.
pub fn space_hash(space: &ParameterSpace) -> Result<String, HpsError> {
    stable_hash_string(space)
}
