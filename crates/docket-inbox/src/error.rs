//! Error types for the inbox cycle.

use thiserror::Error;

use docket_blob::BlobError;
use docket_storage::StorageError;
use docket_types::ErrorKind;

/// Cycle-level failures.
///
/// Per-item failures never surface here; they are recorded in the
/// [`CycleReport`](crate::CycleReport) and the cycle moves on.
#[derive(Debug, Error)]
pub enum InboxError {
    #[error("Blob error: {0}")]
    Blob(#[from] BlobError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Processing task failed: {0}")]
    Task(String),
}

impl InboxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InboxError::Blob(e) => e.kind(),
            InboxError::Storage(e) => e.kind(),
            InboxError::Task(_) => ErrorKind::Extraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_failure_is_retryable() {
        let err = InboxError::from(BlobError::ListFailed("connection reset".into()));
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.kind().is_retryable());
    }
}
