//! # docket-processing
//!
//! Turns an [`InboxItem`](docket_types::InboxItem) into a
//! [`ProcessingResult`](docket_types::ProcessingResult): pick an extractor
//! by MIME type, extract text, hash the raw bytes.
//!
//! Supported formats are plain text, PDF and Office Open XML. Anything else
//! is ingested with empty text.

pub mod error;
pub mod extractors;
pub mod processor;
pub mod registry;

pub use error::ExtractionError;
pub use extractors::{
    normalize_mime, ContentExtractor, OoxmlExtractor, PdfExtractor, PlainTextExtractor,
};
pub use processor::{content_hash, effective_mime, DocumentProcessor};
pub use registry::ExtractorRegistry;
