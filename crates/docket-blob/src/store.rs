//! Blob store abstraction.
//!
//! Every backend exposes the same four areas with list, download, upload
//! and move. A move is the only way a blob leaves the inbox; nothing is
//! deleted without a successful move.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::area::BlobArea;
use crate::error::{BlobError, BlobResult};

/// Metadata attached to a blob
pub type BlobMetadata = BTreeMap<String, String>;

/// Reserved directory name for metadata sidecars
pub const META_DIR: &str = ".meta";

/// Descriptor returned by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobItem {
    /// Name relative to the area (may contain `/`)
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BlobMetadata,
}

/// A downloaded blob.
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub item: BlobItem,
    pub bytes: Vec<u8>,
}

/// Object storage with named areas.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// All blobs in an area, oldest first, ties broken by name.
    async fn list(&self, area: BlobArea) -> BlobResult<Vec<BlobItem>>;

    async fn download(&self, area: BlobArea, name: &str) -> BlobResult<BlobObject>;

    /// Write a blob, replacing any existing blob with the same name.
    async fn upload(
        &self,
        area: BlobArea,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> BlobResult<()>;

    /// Move a blob between areas, merging `extra_metadata` over its
    /// existing metadata.
    ///
    /// Moving a blob that is already at the destination and gone from the
    /// source succeeds, so a retried move is harmless.
    async fn move_blob(
        &self,
        from: BlobArea,
        to: BlobArea,
        name: &str,
        extra_metadata: BlobMetadata,
    ) -> BlobResult<()>;

    async fn exists(&self, area: BlobArea, name: &str) -> BlobResult<bool>;

    /// Backend label for logging
    fn backend_name(&self) -> &'static str;
}

/// Reject names that could escape their area or collide with sidecars.
pub fn validate_name(name: &str) -> BlobResult<()> {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return Err(BlobError::InvalidName(name.to_string()));
    }
    for segment in name.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment == META_DIR {
            return Err(BlobError::InvalidName(name.to_string()));
        }
    }
    Ok(())
}

/// Content type for a blob without a recorded one.
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
