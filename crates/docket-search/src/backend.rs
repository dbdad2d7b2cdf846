//! Indexing contract consumed by the reconciliation loop.

use std::collections::HashMap;

use docket_types::Document;

use crate::error::SearchError;

/// A batch-oriented document index.
///
/// Batch calls report per-item outcomes through their return value. A
/// document missing from an `index_batch` result was not indexed and
/// stays eligible for the next cycle; an `Err` means nothing in the batch
/// was confirmed.
pub trait SearchBackend: Send + Sync {
    /// Index one document and return its index id.
    fn index_one(&self, document: &Document) -> Result<String, SearchError>;

    /// Index a batch. Returns `document_id -> index_id` for confirmed items.
    fn index_batch(&self, documents: &[Document]) -> Result<HashMap<String, String>, SearchError>;

    /// Replace the entry of an already indexed document.
    fn update(&self, document: &Document) -> Result<(), SearchError>;

    fn remove(&self, index_id: &str) -> Result<(), SearchError>;

    /// Remove a batch. Returns the index ids confirmed removed.
    fn remove_batch(&self, index_ids: &[String]) -> Result<Vec<String>, SearchError>;

    fn is_healthy(&self) -> bool;

    /// Backend label for logging
    fn name(&self) -> &str;
}
