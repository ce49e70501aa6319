//! Structured error types shared across HPS crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`HpsError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for sweep allocation and run bookkeeping.
///
/// Every failure aborts the enclosing unit of work; only [`HpsError::Storage`]
/// is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum HpsError {
    /// Unrecognised sweep method tag.
    #[error("method error: {0}")]
    Method(ErrorInfo),
    /// Unknown sweep, run or log identifier.
    #[error("not found: {0}")]
    NotFound(ErrorInfo),
    /// Malformed parameter space or coordinate.
    #[error("space error: {0}")]
    Space(ErrorInfo),
    /// Combination count or cursor outside the supported integer range.
    #[error("overflow error: {0}")]
    Overflow(ErrorInfo),
    /// Persistence layer failure; the unit of work was rolled back.
    #[error("storage error: {0}")]
    Storage(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl HpsError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            HpsError::Method(info)
            | HpsError::NotFound(info)
            | HpsError::Space(info)
            | HpsError::Overflow(info)
            | HpsError::Storage(info)
            | HpsError::Serde(info)
            | HpsError::Config(info) => info,
        }
    }

    /// Whether repeating the whole operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HpsError::Storage(_))
    }

    /// Builds the error raised for an unknown sweep identifier.
    pub fn sweep_not_found(id: impl Display) -> Self {
        HpsError::NotFound(
            ErrorInfo::new("sweep-not-found", "sweep does not exist")
                .with_context("sweep_id", id.to_string()),
        )
    }

    /// Builds the error raised for an unknown run identifier.
    pub fn run_not_found(id: impl Display) -> Self {
        HpsError::NotFound(
            ErrorInfo::new("run-not-found", "run does not exist")
                .with_context("run_id", id.to_string()),
        )
    }
}
