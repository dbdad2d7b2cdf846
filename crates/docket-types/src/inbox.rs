//! Inbound file items.
//!
//! An `InboxItem` lives only for the duration of one inbox cycle. It is
//! built from a downloaded blob and dropped once the source blob has been
//! moved out of the inbox area.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Metadata key carrying the tenant id on an inbox blob.
pub const META_TENANT_ID: &str = "tenant_id";

/// Metadata key carrying the document type id on an inbox blob.
pub const META_DOCUMENT_TYPE_ID: &str = "document_type_id";

/// A file awaiting ingestion, with its content already downloaded.
#[derive(Debug, Clone)]
pub struct InboxItem {
    /// Blob name inside the inbox area (may contain `/`)
    pub name: String,
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub tenant_id: String,
    pub document_type_id: String,
    /// Metadata attached to the blob
    pub metadata: BTreeMap<String, String>,
}

impl InboxItem {
    /// Build an item, resolving tenant and document type from metadata,
    /// then the naming convention, then the supplied defaults.
    pub fn new(
        name: impl Into<String>,
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        created_at: DateTime<Utc>,
        metadata: BTreeMap<String, String>,
        defaults: &ItemDefaults,
    ) -> Self {
        let name = name.into();
        let (tenant_id, document_type_id) = resolve_identity(&name, &metadata, defaults);
        Self {
            size_bytes: bytes.len() as u64,
            name,
            bytes,
            content_type: content_type.into(),
            created_at,
            tenant_id,
            document_type_id,
            metadata,
        }
    }

    /// Last path segment of the blob name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Fallback identity for items that carry none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDefaults {
    pub tenant_id: String,
    pub document_type_id: String,
}

impl ItemDefaults {
    pub fn new(tenant_id: impl Into<String>, document_type_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            document_type_id: document_type_id.into(),
        }
    }
}

/// Resolve `(tenant_id, document_type_id)` for a blob.
///
/// Each id is resolved independently: metadata first, then a
/// `{tenant}/{type}/{file}` name, then the default.
pub fn resolve_identity(
    name: &str,
    metadata: &BTreeMap<String, String>,
    defaults: &ItemDefaults,
) -> (String, String) {
    let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
    let (named_tenant, named_type) = if segments.len() >= 3 {
        (Some(segments[0]), Some(segments[1]))
    } else {
        (None, None)
    };

    let pick = |key: &str, named: Option<&str>, default: &str| -> String {
        metadata
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .or(named)
            .unwrap_or(default)
            .to_string()
    };

    (
        pick(META_TENANT_ID, named_tenant, &defaults.tenant_id),
        pick(
            META_DOCUMENT_TYPE_ID,
            named_type,
            &defaults.document_type_id,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> ItemDefaults {
        ItemDefaults::new("default", "general")
    }

    #[test]
    fn test_resolve_falls_back_to_defaults() {
        let (tenant, doc_type) = resolve_identity("notes.txt", &BTreeMap::new(), &defaults());
        assert_eq!(tenant, "default");
        assert_eq!(doc_type, "general");
    }

    #[test]
    fn test_resolve_from_naming_convention() {
        let (tenant, doc_type) =
            resolve_identity("acme/invoice/scan.pdf", &BTreeMap::new(), &defaults());
        assert_eq!(tenant, "acme");
        assert_eq!(doc_type, "invoice");
    }

    #[test]
    fn test_two_segments_is_not_a_convention() {
        let (tenant, doc_type) = resolve_identity("acme/scan.pdf", &BTreeMap::new(), &defaults());
        assert_eq!(tenant, "default");
        assert_eq!(doc_type, "general");
    }

    #[test]
    fn test_metadata_wins_over_name() {
        let mut metadata = BTreeMap::new();
        metadata.insert(META_TENANT_ID.to_string(), "globex".to_string());
        metadata.insert(META_DOCUMENT_TYPE_ID.to_string(), "  ".to_string());

        let (tenant, doc_type) = resolve_identity("acme/invoice/scan.pdf", &metadata, &defaults());
        assert_eq!(tenant, "globex");
        // Blank metadata is ignored
        assert_eq!(doc_type, "invoice");
    }

    #[test]
    fn test_item_file_name_and_size() {
        let item = InboxItem::new(
            "acme/invoice/scan.pdf",
            vec![1, 2, 3],
            "application/pdf",
            Utc::now(),
            BTreeMap::new(),
            &defaults(),
        );
        assert_eq!(item.file_name(), "scan.pdf");
        assert_eq!(item.size_bytes, 3);
        assert_eq!(item.tenant_id, "acme");
    }
}
