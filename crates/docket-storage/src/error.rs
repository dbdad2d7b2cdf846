//! Storage layer error types.

use docket_types::ErrorKind;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Document not found
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Document violates a record invariant
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Internal lock poisoned by a panicking writer
    #[error("Storage lock poisoned: {0}")]
    Lock(String),
}

impl StorageError {
    /// A rejected record is final; everything else behind the repository
    /// is a persistence failure worth retrying.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidDocument(_) => ErrorKind::InvalidInput,
            _ => ErrorKind::Persistence,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<docket_types::DocketError> for StorageError {
    fn from(err: docket_types::DocketError) -> Self {
        StorageError::InvalidDocument(err.to_string())
    }
}
