//! Persisted document records.
//!
//! A `Document` is created by the inbox pipeline after successful
//! extraction. Only the reconciliation loop writes `search_index_id`
//! and `last_indexed_at`; soft delete and archive are set by callers
//! outside the pipelines.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::DocketError;

/// Generate a fresh document id (ULID string).
pub fn new_document_id() -> String {
    Ulid::new().to_string()
}

/// Long-term storage path for a document's raw content:
/// `{tenant}/{type}/{yyyy}/{mm}/{dd}/{document_id}/{file_name}`.
pub fn document_storage_path(
    tenant_id: &str,
    document_type_id: &str,
    date: DateTime<Utc>,
    document_id: &str,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{:04}/{:02}/{:02}/{}/{}",
        tenant_id,
        document_type_id,
        date.year(),
        date.month(),
        date.day(),
        document_id,
        file_name
    )
}

/// A durable, searchable document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (ULID)
    pub document_id: String,

    pub tenant_id: String,

    pub document_type_id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Path of the raw content in the documents area
    #[serde(default)]
    pub storage_path: Option<String>,

    /// Lowercase hex SHA-256 of the raw bytes
    pub content_hash: String,

    pub size_bytes: u64,

    pub mime_type: String,

    pub original_filename: String,

    /// Free-form key/value metadata
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub extracted_text: String,

    /// Monotonic within a version chain, starts at 1
    pub version: u32,

    pub is_current_version: bool,

    /// Root of the version chain (None for the first version)
    #[serde(default)]
    pub parent_document_id: Option<String>,

    #[serde(default)]
    pub search_index_id: Option<String>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_indexed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub deleted_reason: Option<String>,

    #[serde(default)]
    pub deleted_by: Option<String>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub deleted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_archived: bool,

    pub created_by: String,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Last modification of anything other than the index fields
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a first-version document with a fresh id.
    ///
    /// The title defaults to the file name without its extension.
    pub fn new(
        tenant_id: impl Into<String>,
        document_type_id: impl Into<String>,
        original_filename: impl Into<String>,
        mime_type: impl Into<String>,
        content_hash: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        let original_filename = original_filename.into();
        let now = Utc::now();
        Self {
            document_id: new_document_id(),
            tenant_id: tenant_id.into(),
            document_type_id: document_type_id.into(),
            title: title_from_filename(&original_filename),
            description: None,
            storage_path: None,
            content_hash: content_hash.into(),
            size_bytes,
            mime_type: mime_type.into(),
            original_filename,
            metadata: BTreeMap::new(),
            tags: Vec::new(),
            extracted_text: String::new(),
            version: 1,
            is_current_version: true,
            parent_document_id: None,
            search_index_id: None,
            last_indexed_at: None,
            is_deleted: false,
            deleted_reason: None,
            deleted_by: None,
            deleted_at: None,
            is_archived: false,
            created_by: "system".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = document_id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<String>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn with_extracted_text(mut self, text: impl Into<String>) -> Self {
        self.extracted_text = text.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = user.into();
        self
    }

    /// Reconciliation eligibility.
    ///
    /// True when the document is live and either has no index entry or its
    /// entry predates the last modification.
    pub fn needs_indexing(&self) -> bool {
        if self.is_deleted {
            return false;
        }
        match (&self.search_index_id, self.last_indexed_at) {
            (None, _) | (_, None) => true,
            (Some(_), Some(indexed_at)) => indexed_at < self.updated_at,
        }
    }

    /// Soft-deleted but still present in the search index.
    pub fn is_pending_removal(&self) -> bool {
        self.is_deleted && self.search_index_id.is_some()
    }

    /// Check record invariants before it is written.
    pub fn validate(&self) -> Result<(), DocketError> {
        if self.document_id.is_empty() {
            return Err(DocketError::InvalidInput("document_id is empty".into()));
        }
        if self.tenant_id.is_empty() {
            return Err(DocketError::InvalidInput(format!(
                "document {} has no tenant_id",
                self.document_id
            )));
        }
        if self.version < 1 {
            return Err(DocketError::InvalidInput(format!(
                "document {} has version {}",
                self.document_id, self.version
            )));
        }
        if self.last_indexed_at.is_some() && self.search_index_id.is_none() {
            return Err(DocketError::InvalidInput(format!(
                "document {} has last_indexed_at without search_index_id",
                self.document_id
            )));
        }
        Ok(())
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn title_from_filename(filename: &str) -> String {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}
