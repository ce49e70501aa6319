use std::collections::BTreeMap;
use std::iter::FromIterator;

use hps_core::errors::{ErrorInfo, HpsError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

fn serde_error(code: &str, err: impl ToString) -> HpsError {
    HpsError::Serde(ErrorInfo::new(code, err.to_string()))
}

// Object keys sorted at every depth; array order is data and stays untouched.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes with deterministic key order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HpsError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    let canonical = canonicalize(value);
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonical).map_err(|err| serde_error("json_write", err))?;
    Ok(bytes)
}

/// Deserializes a value from JSON bytes.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, HpsError> {
    serde_json::from_slice(data).map_err(|err| serde_error("json_deserialize", err))
}

/// Deserializes a YAML payload into the requested type.
pub fn from_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, HpsError> {
    serde_yaml::from_slice(data).map_err(|err| serde_error("yaml_deserialize", err))
}

/// Deserializes a JSON or YAML payload.
///
/// JSON is tried first so numbers outside the YAML number range still parse;
/// the YAML error is reported when neither parser accepts the payload.
pub fn from_json_or_yaml_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, HpsError> {
    match serde_json::from_slice(data) {
        Ok(value) => Ok(value),
        Err(_) => from_yaml_slice(data),
    }
}
