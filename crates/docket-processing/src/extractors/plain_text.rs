use crate::error::ExtractionError;

use super::ContentExtractor;

const UTF8_BOM: &str = "\u{feff}";

/// Text formats: anything under `text/` plus JSON and XML.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl ContentExtractor for PlainTextExtractor {
    fn name(&self) -> &'static str {
        "plain_text"
    }

    fn supports(&self, mime_type: &str) -> bool {
        mime_type.starts_with("text/")
            || mime_type == "application/json"
            || mime_type == "application/xml"
    }

    /// Invalid UTF-8 sequences are replaced rather than rejected.
    fn extract_text(&self, bytes: &[u8], _mime_type: &str) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(bytes);
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(&text).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports() {
        let extractor = PlainTextExtractor;
        assert!(extractor.supports("text/plain"));
        assert!(extractor.supports("text/markdown"));
        assert!(extractor.supports("application/json"));
        assert!(!extractor.supports("application/pdf"));
    }

    #[test]
    fn test_extract_strips_bom_and_keeps_content() {
        let mut bytes = UTF8_BOM.as_bytes().to_vec();
        bytes.extend_from_slice(b"hello");
        assert_eq!(
            PlainTextExtractor.extract_text(&bytes, "text/plain").unwrap(),
            "hello"
        );
    }

    #[test]
    fn test_extract_lossy_on_invalid_utf8() {
        let text = PlainTextExtractor
            .extract_text(&[b'a', 0xff, b'b'], "text/plain")
            .unwrap();
        assert_eq!(text, "a\u{fffd}b");
    }
}
