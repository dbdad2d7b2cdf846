//! Search error types.

use docket_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// Query parse error
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Index is locked (another process has it open)
    #[error("Index is locked: {0}")]
    IndexLocked(String),

    /// Document cannot be indexed in its current state
    #[error("Document rejected: {0}")]
    Rejected(String),
}

impl SearchError {
    /// Index failures leave documents eligible for the next cycle.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Storage
    }
}
