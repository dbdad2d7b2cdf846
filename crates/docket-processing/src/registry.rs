//! Ordered extractor dispatch.

use tracing::debug;

use crate::extractors::{
    normalize_mime, ContentExtractor, OoxmlExtractor, PdfExtractor, PlainTextExtractor,
};

/// Extractors in registration order. Selection is first match wins.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn ContentExtractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ExtractorRegistry {
    /// An empty registry. Every item gets empty text.
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Plain text, PDF and Office Open XML.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PlainTextExtractor));
        registry.register(Box::new(PdfExtractor));
        registry.register(Box::new(OoxmlExtractor));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn ContentExtractor>) {
        debug!(extractor = extractor.name(), "Registered content extractor");
        self.extractors.push(extractor);
    }

    /// First extractor that supports `mime_type`.
    pub fn select(&self, mime_type: &str) -> Option<&dyn ContentExtractor> {
        let mime = normalize_mime(mime_type);
        self.extractors
            .iter()
            .find(|e| e.supports(&mime))
            .map(|e| e.as_ref())
    }

    /// Names of every extractor claiming `mime_type`, in order.
    pub fn claimants(&self, mime_type: &str) -> Vec<&'static str> {
        let mime = normalize_mime(mime_type);
        self.extractors
            .iter()
            .filter(|e| e.supports(&mime))
            .map(|e| e.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}
