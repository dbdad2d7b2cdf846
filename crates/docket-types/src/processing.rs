//! Outcome of processing a single inbox item.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result fields that exist only on one side of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Outcome {
    Success {
        document_id: Option<String>,
        extracted_text: String,
        content_hash: String,
    },
    Failure {
        error: String,
        detail: Option<String>,
    },
}

/// Immutable outcome of `process_document`.
///
/// Built only through [`ProcessingResult::success`] or
/// [`ProcessingResult::failure`], so a result never carries both success
/// and failure fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult {
    source_name: String,
    size_bytes: u64,
    mime_type: String,
    duration_ms: u64,
    #[serde(flatten)]
    outcome: Outcome,
}

impl ProcessingResult {
    pub fn success(
        source_name: impl Into<String>,
        extracted_text: impl Into<String>,
        content_hash: impl Into<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            duration_ms: duration.as_millis() as u64,
            outcome: Outcome::Success {
                document_id: None,
                extracted_text: extracted_text.into(),
                content_hash: content_hash.into(),
            },
        }
    }

    pub fn failure(
        source_name: impl Into<String>,
        error: impl Into<String>,
        detail: Option<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
        duration: Duration,
    ) -> Self {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "unknown processing error".to_string();
        }
        Self {
            source_name: source_name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            duration_ms: duration.as_millis() as u64,
            outcome: Outcome::Failure { error, detail },
        }
    }

    /// Attach the persisted document id to a successful result.
    ///
    /// Failures are returned unchanged.
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        if let Outcome::Success { document_id, .. } = &mut self.outcome {
            *document_id = Some(id.into());
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success { .. })
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn document_id(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { document_id, .. } => document_id.as_deref(),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn extracted_text(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { extracted_text, .. } => Some(extracted_text),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn content_hash(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success { content_hash, .. } => Some(content_hash),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { error, .. } => Some(error),
            Outcome::Success { .. } => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failure { detail, .. } => detail.as_deref(),
            Outcome::Success { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_failure_fields() {
        let result = ProcessingResult::success(
            "notes.txt",
            "hello",
            "2cf24dba",
            5,
            "text/plain",
            Duration::from_millis(3),
        );
        assert!(result.is_success());
        assert_eq!(result.extracted_text(), Some("hello"));
        assert_eq!(result.content_hash(), Some("2cf24dba"));
        assert!(result.error_message().is_none());
        assert!(result.error_detail().is_none());
        assert_eq!(result.duration_ms(), 3);
    }

    #[test]
    fn test_failure_has_no_success_fields() {
        let result = ProcessingResult::failure(
            "bad.pdf",
            "invalid PDF header",
            Some("offset 0".to_string()),
            12,
            "application/pdf",
            Duration::from_millis(1),
        );
        assert!(!result.is_success());
        assert_eq!(result.error_message(), Some("invalid PDF header"));
        assert_eq!(result.error_detail(), Some("offset 0"));
        assert!(result.extracted_text().is_none());
        assert!(result.content_hash().is_none());
        assert_eq!(result.source_name(), "bad.pdf");
    }

    #[test]
    fn test_failure_error_never_empty() {
        let result = ProcessingResult::failure("x", "", None, 0, "text/plain", Duration::ZERO);
        assert!(!result.error_message().unwrap().is_empty());
    }

    #[test]
    fn test_with_document_id_ignored_on_failure() {
        let failed = ProcessingResult::failure("x", "boom", None, 0, "text/plain", Duration::ZERO)
            .with_document_id("01HX");
        assert!(failed.document_id().is_none());

        let ok = ProcessingResult::success("x", "", "h", 0, "text/plain", Duration::ZERO)
            .with_document_id("01HX");
        assert_eq!(ok.document_id(), Some("01HX"));
    }

    #[test]
    fn test_serialized_shape_is_tagged() {
        let result = ProcessingResult::failure("x", "boom", None, 0, "text/plain", Duration::ZERO);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failure");
        assert!(json.get("content_hash").is_none());
    }
}
