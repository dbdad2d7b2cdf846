//! Blob store error types.

use docket_types::ErrorKind;
use thiserror::Error;

/// Errors from blob area operations
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob not found: {area}/{name}")]
    NotFound { area: String, name: String },

    #[error("Invalid blob name: {0}")]
    InvalidName(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Move failed: {0}")]
    MoveFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BlobError {
    pub fn not_found(area: impl ToString, name: impl Into<String>) -> Self {
        BlobError::NotFound {
            area: area.to_string(),
            name: name.into(),
        }
    }

    /// Configuration problems are fatal and unusable names are final;
    /// everything else is a storage failure that leaves the blob where it
    /// was.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlobError::Config(_) => ErrorKind::Configuration,
            BlobError::InvalidName(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Storage,
        }
    }
}

/// Result type for blob operations
pub type BlobResult<T> = Result<T, BlobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(BlobError::MoveFailed("x".into()).kind(), ErrorKind::Storage);
        assert!(BlobError::ListFailed("x".into()).kind().is_retryable());
        assert_eq!(
            BlobError::InvalidName("../etc".into()).kind(),
            ErrorKind::InvalidInput
        );
        assert!(!BlobError::InvalidName("../etc".into()).kind().is_retryable());
    }
}
