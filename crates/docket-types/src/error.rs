//! Error types shared across the docket crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes the pipelines branch on.
///
/// Every crate-level error maps onto one of these through a `kind()`
/// method, so the loops can decide between "leave it for the next cycle"
/// and "move it aside" without matching on concrete error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unsupported or corrupt content
    Extraction,
    /// Blob download/upload/move failure
    Storage,
    /// Document repository write/read failure
    Persistence,
    /// Missing or invalid settings (fatal at startup)
    Configuration,
    /// The item itself can never be stored as given
    InvalidInput,
}

impl ErrorKind {
    /// Whether the same operation may succeed on a later cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Storage | ErrorKind::Persistence)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Extraction => "extraction",
            ErrorKind::Storage => "storage",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Configuration => "configuration",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for docket domain operations.
#[derive(Debug, Error)]
pub enum DocketError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input error
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl DocketError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocketError::Config(_) => ErrorKind::Configuration,
            DocketError::InvalidInput(_) => ErrorKind::InvalidInput,
            DocketError::Storage(_) => ErrorKind::Storage,
            DocketError::Serialization(_) | DocketError::NotFound(_) => ErrorKind::Persistence,
        }
    }
}
