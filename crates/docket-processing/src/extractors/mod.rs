//! Content extractors.
//!
//! Each extractor declares the MIME types it handles through a pure
//! `supports` predicate; the registry picks the first match.

mod ooxml;
mod pdf;
mod plain_text;

pub use ooxml::{OoxmlExtractor, DOCX_MIME, PPTX_MIME, XLSX_MIME};
pub use pdf::PdfExtractor;
pub use plain_text::PlainTextExtractor;

use crate::error::ExtractionError;

/// Turns the bytes of one MIME type family into plain text.
///
/// Input is untrusted. Implementations return an error for corrupt
/// content and must not panic out of `extract_text`.
pub trait ContentExtractor: Send + Sync {
    /// Name used in logs and failure details.
    fn name(&self) -> &'static str;

    /// Whether this extractor handles `mime_type` (already normalized).
    fn supports(&self, mime_type: &str) -> bool;

    fn extract_text(&self, bytes: &[u8], mime_type: &str) -> Result<String, ExtractionError>;
}

/// Lowercase the essence and drop parameters such as `charset`.
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Render a `catch_unwind` payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
