//! Extraction error types.

use docket_types::ErrorKind;
use thiserror::Error;

/// Errors raised while turning bytes into text.
///
/// Never fatal to a cycle: the processor turns these into a failed
/// `ProcessingResult` for the item.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported content type: {0}")]
    Unsupported(String),

    #[error("Corrupt {format} content: {message}")]
    Corrupt { format: &'static str, message: String },

    #[error("Extractor panicked on {format} content: {message}")]
    Panicked { format: &'static str, message: String },
}

impl ExtractionError {
    pub fn corrupt(format: &'static str, message: impl Into<String>) -> Self {
        ExtractionError::Corrupt {
            format,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Extraction
    }
}
