//! Error types for the reconciliation loop.

use docket_search::SearchError;
use docket_storage::StorageError;
use docket_types::ErrorKind;
use thiserror::Error;

/// Cycle-level failures. Per-document failures never surface here; they
/// are counted in the report and the document stays eligible.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Querying the document store failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Health check failed; the cycle did nothing
    #[error("Search backend unavailable: {0}")]
    Unhealthy(String),
}

impl IndexingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IndexingError::Storage(e) => e.kind(),
            IndexingError::Search(e) => e.kind(),
            IndexingError::Unhealthy(_) => ErrorKind::Storage,
        }
    }
}
