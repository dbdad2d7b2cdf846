//! In-memory blob store for tests and dry runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::area::BlobArea;
use crate::error::{BlobError, BlobResult};
use crate::store::{validate_name, BlobItem, BlobMetadata, BlobObject, BlobStore};

#[derive(Debug, Clone)]
struct MemoryBlob {
    bytes: Vec<u8>,
    content_type: String,
    metadata: BlobMetadata,
    created_at: DateTime<Utc>,
}

impl MemoryBlob {
    fn item(&self, name: &str) -> BlobItem {
        BlobItem {
            name: name.to_string(),
            content_type: self.content_type.clone(),
            size_bytes: self.bytes.len() as u64,
            created_at: self.created_at,
            metadata: self.metadata.clone(),
        }
    }
}

/// Blob store backed by a map.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<(BlobArea, String), MemoryBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob with an explicit creation time.
    pub fn insert(
        &self,
        area: BlobArea,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
        created_at: DateTime<Utc>,
    ) -> BlobResult<()> {
        validate_name(name)?;
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        blobs.insert(
            (area, name.to_string()),
            MemoryBlob {
                bytes,
                content_type: content_type.to_string(),
                metadata,
                created_at,
            },
        );
        Ok(())
    }

    /// Names currently stored in an area, sorted.
    pub fn names(&self, area: BlobArea) -> Vec<String> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs
            .keys()
            .filter(|(a, _)| *a == area)
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Metadata of a stored blob.
    pub fn metadata(&self, area: BlobArea, name: &str) -> Option<BlobMetadata> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        blobs
            .get(&(area, name.to_string()))
            .map(|b| b.metadata.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, area: BlobArea) -> BlobResult<Vec<BlobItem>> {
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        let mut items: Vec<BlobItem> = blobs
            .iter()
            .filter(|((a, _), _)| *a == area)
            .map(|((_, name), blob)| blob.item(name))
            .collect();
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(items)
    }

    async fn download(&self, area: BlobArea, name: &str) -> BlobResult<BlobObject> {
        validate_name(name)?;
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        let blob = blobs
            .get(&(area, name.to_string()))
            .ok_or_else(|| BlobError::not_found(area, name))?;
        Ok(BlobObject {
            item: blob.item(name),
            bytes: blob.bytes.clone(),
        })
    }

    async fn upload(
        &self,
        area: BlobArea,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> BlobResult<()> {
        self.insert(area, name, bytes, content_type, metadata, Utc::now())
    }

    async fn move_blob(
        &self,
        from: BlobArea,
        to: BlobArea,
        name: &str,
        extra_metadata: BlobMetadata,
    ) -> BlobResult<()> {
        validate_name(name)?;
        let mut blobs = self.blobs.write().unwrap_or_else(|e| e.into_inner());
        let Some(mut blob) = blobs.remove(&(from, name.to_string())) else {
            if blobs.contains_key(&(to, name.to_string())) {
                return Ok(());
            }
            return Err(BlobError::not_found(from, name));
        };
        blob.metadata.extend(extra_metadata);
        blobs.insert((to, name.to_string()), blob);
        Ok(())
    }

    async fn exists(&self, area: BlobArea, name: &str) -> BlobResult<bool> {
        validate_name(name)?;
        let blobs = self.blobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(blobs.contains_key(&(area, name.to_string())))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
