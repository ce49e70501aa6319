use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, HpsError};

macro_rules! raw_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier from its raw integer representation.
            pub fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw integer representation of the identifier.
            pub fn as_raw(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

raw_id!(
    /// Identifier of a sweep.
    SweepId
);
raw_id!(
    /// Identifier of a run.
    RunId
);
raw_id!(
    /// Identifier of a log document appended to a run.
    LogId
);

/// Traversal method of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMethod {
    /// Independent uniform draw per parameter.
    Random,
    /// Exhaustive walk over the Cartesian product, one cycle at a time.
    Grid,
}

impl SweepMethod {
    /// Tag persisted alongside the sweep.
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepMethod::Random => "random",
            SweepMethod::Grid => "grid",
        }
    }
}

impl fmt::Display for SweepMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SweepMethod {
    type Err = HpsError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "random" => Ok(SweepMethod::Random),
            "grid" => Ok(SweepMethod::Grid),
            other => Err(HpsError::Method(
                ErrorInfo::new("invalid-method", format!("invalid method {other:?}"))
                    .with_context("method", other)
                    .with_hint("expected one of: random, grid"),
            )),
        }
    }
}

/// Declared search space: parameter name to ordered candidate values.
///
/// Names are kept in lexicographic order; position `i` in that order is the
/// dimension index used by coordinates. Candidate values are opaque and are
/// only ever addressed by position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<Value>>",
    into = "BTreeMap<String, Vec<Value>>"
)]
pub struct ParameterSpace {
    parameters: BTreeMap<String, Vec<Value>>,
}

impl ParameterSpace {
    /// Validates and wraps a parameter map.
    pub fn new(parameters: BTreeMap<String, Vec<Value>>) -> Result<Self, HpsError> {
        if let Some((name, _)) = parameters.iter().find(|(_, values)| values.is_empty()) {
            return Err(HpsError::Space(
                ErrorInfo::new("empty-candidates", "parameter has no candidate values")
                    .with_context("parameter", name.as_str()),
            ));
        }
        Ok(Self { parameters })
    }

    /// Parameter names in dimension order.
    pub fn dimensions(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.parameters.keys().map(String::as_str)
    }

    /// Candidate list lengths in dimension order.
    pub fn cardinalities(&self) -> Vec<u64> {
        self.parameters
            .values()
            .map(|values| values.len() as u64)
            .collect()
    }

    /// Candidate values of a single parameter.
    pub fn candidates(&self, name: &str) -> Option<&[Value]> {
        self.parameters.get(name).map(Vec::as_slice)
    }

    /// Number of declared parameters.
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// True when the space declares no parameters at all.
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Maps a coordinate back onto named candidate values.
    pub fn resolve(&self, coordinate: &Coordinate) -> Result<Assignment, HpsError> {
        if coordinate.len() != self.parameters.len() {
            return Err(HpsError::Space(
                ErrorInfo::new("coordinate-rank", "coordinate rank does not match space")
                    .with_context("expected", self.parameters.len().to_string())
                    .with_context("actual", coordinate.len().to_string()),
            ));
        }
        let mut chosen = BTreeMap::new();
        for ((name, values), digit) in self.parameters.iter().zip(coordinate.digits()) {
            let value = usize::try_from(*digit)
                .ok()
                .and_then(|idx| values.get(idx))
                .ok_or_else(|| {
                    HpsError::Space(
                        ErrorInfo::new("coordinate-range", "coordinate digit out of range")
                            .with_context("parameter", name.as_str())
                            .with_context("digit", digit.to_string())
                            .with_context("cardinality", values.len().to_string()),
                    )
                })?;
            chosen.insert(name.clone(), value.clone());
        }
        Ok(Assignment(chosen))
    }
}

impl TryFrom<BTreeMap<String, Vec<Value>>> for ParameterSpace {
    type Error = HpsError;

    fn try_from(parameters: BTreeMap<String, Vec<Value>>) -> Result<Self, Self::Error> {
        Self::new(parameters)
    }
}

impl From<ParameterSpace> for BTreeMap<String, Vec<Value>> {
    fn from(space: ParameterSpace) -> Self {
        space.parameters
    }
}

/// One point of the Cartesian product, one digit per dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coordinate(Vec<u64>);

impl Coordinate {
    /// Wraps raw digits.
    pub fn new(digits: Vec<u64>) -> Self {
        Self(digits)
    }

    /// Digits in dimension order.
    pub fn digits(&self) -> &[u64] {
        &self.0
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the zero-dimensional coordinate.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolved parameter values handed to a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<String, Value>);

impl Assignment {
    /// Value chosen for `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Iterates over chosen values in dimension order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of chosen parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the assignment of a zero-parameter sweep.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the assignment returning the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl From<BTreeMap<String, Value>> for Assignment {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self(values)
    }
}

/// Request to create a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSweep {
    /// Method tag, `random` or `grid`.
    pub method: String,
    /// Declared search space.
    pub parameters: ParameterSpace,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form metadata payload.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Persisted sweep as seen inside a unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    /// Sweep identifier.
    pub id: SweepId,
    /// Raw method tag; parsed only when allocating.
    pub method: String,
    /// Next grid index to hand out. Stays at zero for random sweeps.
    pub cursor: u64,
    /// Declared search space.
    pub parameters: ParameterSpace,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form metadata payload.
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Request to create a run, optionally drawing its configuration from a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRun {
    /// Commit the run was launched from.
    pub commit_hash: String,
    /// Command line that launched the run.
    pub command: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Sweep to draw the run's assignment from.
    #[serde(default)]
    pub sweep_id: Option<SweepId>,
}

/// Persisted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run identifier.
    pub id: RunId,
    /// Commit the run was launched from.
    pub commit_hash: String,
    /// Command line that launched the run.
    pub command: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Owning sweep, if any.
    #[serde(default)]
    pub sweep_id: Option<SweepId>,
    /// Parameter values allocated from the owning sweep.
    #[serde(default)]
    pub assignment: Option<Assignment>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// One document of a run's log stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Log identifier.
    pub id: LogId,
    /// Run the document belongs to.
    pub run_id: RunId,
    /// Opaque JSON document.
    pub document: Value,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}
