//! Document processor: extraction plus hashing for one inbox item.
//!
//! The processor has no side effects. Persisting the result and moving
//! the source blob are the caller's job, so processing can be retried
//! freely.

use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use docket_types::{InboxItem, ProcessingResult};

use crate::extractors::normalize_mime;
use crate::registry::ExtractorRegistry;

const OCTET_STREAM: &str = "application/octet-stream";

/// Hex-encoded SHA-256 of the raw bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// MIME type used for extraction: the declared type unless it is missing
/// or generic, in which case the file name decides.
pub fn effective_mime(content_type: &str, name: &str) -> String {
    let declared = normalize_mime(content_type);
    if declared.is_empty() || declared == OCTET_STREAM {
        mime_guess::from_path(name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    } else {
        declared
    }
}

pub struct DocumentProcessor {
    registry: ExtractorRegistry,
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(ExtractorRegistry::with_defaults())
    }
}

impl DocumentProcessor {
    pub fn new(registry: ExtractorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Process one item into a success or failure result.
    ///
    /// Types without an extractor succeed with empty text. Extraction
    /// errors become a failure naming the item and the extractor.
    pub fn process_document(&self, item: &InboxItem) -> ProcessingResult {
        let started = Instant::now();
        let mime_type = effective_mime(&item.content_type, &item.name);

        let extracted_text = match self.registry.select(&mime_type) {
            None => {
                debug!(item = %item.name, mime = %mime_type, "No extractor, skipping text");
                String::new()
            }
            Some(extractor) => match extractor.extract_text(&item.bytes, &mime_type) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        item = %item.name,
                        tenant = %item.tenant_id,
                        extractor = extractor.name(),
                        error = %e,
                        "Content extraction failed"
                    );
                    return ProcessingResult::failure(
                        &item.name,
                        e.to_string(),
                        Some(format!("extractor={} mime={}", extractor.name(), mime_type)),
                        item.size_bytes,
                        mime_type,
                        started.elapsed(),
                    );
                }
            },
        };

        let hash = content_hash(&item.bytes);
        debug!(
            item = %item.name,
            mime = %mime_type,
            chars = extracted_text.len(),
            "Processed inbox item"
        );
        ProcessingResult::success(
            &item.name,
            extracted_text,
            hash,
            item.size_bytes,
            mime_type,
            started.elapsed(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docket_types::ItemDefaults;
    use std::collections::BTreeMap;

    fn item(name: &str, bytes: &[u8], content_type: &str) -> InboxItem {
        InboxItem::new(
            name,
            bytes.to_vec(),
            content_type,
            Utc::now(),
            BTreeMap::new(),
            &ItemDefaults::new("default", "general"),
        )
    }

    #[test]
    fn test_plain_text_success() {
        let processor = DocumentProcessor::default();
        let result = processor.process_document(&item("notes.txt", b"hello", "text/plain"));

        assert!(result.is_success());
        assert_eq!(result.extracted_text(), Some("hello"));
        assert_eq!(result.mime_type(), "text/plain");
        assert_eq!(result.size_bytes(), 5);
        assert_eq!(
            result.content_hash(),
            Some("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
        );
        assert_eq!(result.source_name(), "notes.txt");
    }

    #[test]
    fn test_hash_is_deterministic() {
        let processor = DocumentProcessor::default();
        let a = processor.process_document(&item("a.txt", b"same bytes", "text/plain"));
        let b = processor.process_document(&item("b.bin", b"same bytes", "image/png"));
        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_unsupported_type_succeeds_with_empty_text() {
        let processor = DocumentProcessor::default();
        let result = processor.process_document(&item("photo.png", &[0x89, b'P', b'N', b'G'], "image/png"));
        assert!(result.is_success());
        assert_eq!(result.extracted_text(), Some(""));
        assert!(result.content_hash().is_some());
    }

    #[test]
    fn test_malformed_pdf_fails_with_attribution() {
        let processor = DocumentProcessor::default();
        let result = processor.process_document(&item("scan.pdf", b"garbage", "application/pdf"));

        assert!(!result.is_success());
        assert!(!result.error_message().unwrap().is_empty());
        assert!(result.error_detail().unwrap().contains("extractor=pdf"));
        assert_eq!(result.source_name(), "scan.pdf");
        assert!(result.content_hash().is_none());
    }

    #[test]
    fn test_generic_type_falls_back_to_file_name() {
        assert_eq!(effective_mime("application/octet-stream", "notes.txt"), "text/plain");
        assert_eq!(effective_mime("", "scan.pdf"), "application/pdf");
        assert_eq!(effective_mime("text/markdown; charset=utf-8", "x.bin"), "text/markdown");
    }

    #[test]
    fn test_empty_registry_never_fails() {
        let processor = DocumentProcessor::new(ExtractorRegistry::empty());
        let result = processor.process_document(&item("scan.pdf", b"garbage", "application/pdf"));
        assert!(result.is_success());
        assert_eq!(result.extracted_text(), Some(""));
    }
}
