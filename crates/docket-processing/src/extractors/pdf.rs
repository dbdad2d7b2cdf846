use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use crate::error::ExtractionError;

use super::{panic_message, ContentExtractor};

const PDF_MAGIC: &[u8] = b"%PDF-";
/// Readers accept the header anywhere in the first KiB.
const HEADER_WINDOW: usize = 1024;

/// PDF text via `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl ContentExtractor for PdfExtractor {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn supports(&self, mime_type: &str) -> bool {
        mime_type == "application/pdf"
    }

    fn extract_text(&self, bytes: &[u8], _mime_type: &str) -> Result<String, ExtractionError> {
        let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
        if !window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
            return Err(ExtractionError::corrupt("PDF", "missing %PDF- header"));
        }

        // pdf-extract panics on some malformed inputs
        match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionError::corrupt("PDF", e.to_string())),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(error = %message, "pdf-extract panicked");
                Err(ExtractionError::Panicked {
                    format: "PDF",
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_missing_header() {
        let err = PdfExtractor
            .extract_text(b"this is not a pdf", "application/pdf")
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { format: "PDF", .. }));
    }

    #[test]
    fn test_truncated_pdf_is_an_error_not_a_panic() {
        let result = PdfExtractor.extract_text(b"%PDF-1.7\n1 0 obj\n<<", "application/pdf");
        assert!(result.is_err());
    }
}
