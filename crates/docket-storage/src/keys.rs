//! Key encoding and decoding for storage layer.
//!
//! - documents: `doc:{document_id}`
//! - content_hashes: `hash:{tenant_id}:{content_hash}`
//! - batches: `batch:{started_ms:013}:{batch_id}`
//!
//! Document ids are ULIDs, so iterating the documents column family in key
//! order visits documents oldest first. Batch keys are zero-padded for
//! lexicographic time ordering.

use crate::error::StorageError;

/// Key for a document record
/// Format: doc:{document_id}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub document_id: String,
}

impl DocumentKey {
    pub const PREFIX: &'static str = "doc:";

    pub fn new(document_id: impl Into<String>) -> Result<Self, StorageError> {
        let document_id = document_id.into();
        if document_id.is_empty() || document_id.contains(':') {
            return Err(StorageError::Key(format!(
                "Invalid document id: {:?}",
                document_id
            )));
        }
        Ok(Self { document_id })
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{}", Self::PREFIX, self.document_id).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let id = s
            .strip_prefix(Self::PREFIX)
            .ok_or_else(|| StorageError::Key(format!("Invalid document key format: {}", s)))?;
        Self::new(id)
    }
}

/// Key for the dedup index
/// Format: hash:{tenant_id}:{content_hash}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHashKey {
    pub tenant_id: String,
    pub content_hash: String,
}

impl ContentHashKey {
    pub fn new(tenant_id: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            content_hash: content_hash.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("hash:{}:{}", self.tenant_id, self.content_hash).into_bytes()
    }

    /// Decode key from bytes. The hash is the last segment, so tenant ids
    /// may themselves contain `:`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let rest = s
            .strip_prefix("hash:")
            .ok_or_else(|| StorageError::Key(format!("Invalid hash key format: {}", s)))?;
        let (tenant_id, content_hash) = rest
            .rsplit_once(':')
            .ok_or_else(|| StorageError::Key(format!("Invalid hash key format: {}", s)))?;
        Ok(Self::new(tenant_id, content_hash))
    }
}

/// Key for batch outcome records
/// Format: batch:{started_ms:013}:{batch_id}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchKey {
    pub started_ms: i64,
    pub batch_id: String,
}

impl BatchKey {
    pub const PREFIX: &'static str = "batch:";

    pub fn new(started_ms: i64, batch_id: impl Into<String>) -> Self {
        Self {
            started_ms,
            batch_id: batch_id.into(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("{}{:013}:{}", Self::PREFIX, self.started_ms, self.batch_id).into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let parts: Vec<&str> = s.splitn(3, ':').collect();
        if parts.len() != 3 || parts[0] != "batch" {
            return Err(StorageError::Key(format!("Invalid batch key format: {}", s)));
        }
        let started_ms: i64 = parts[1]
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid timestamp: {}", e)))?;

        Ok(Self::new(started_ms, parts[2]))
    }
}
