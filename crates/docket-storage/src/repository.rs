//! Persistence boundary consumed by the ingestion and reconciliation loops.
//!
//! The pipelines only see this trait; [`Storage`] is the RocksDB-backed
//! implementation used by the daemon.

use chrono::{DateTime, Utc};

use docket_types::{BatchOutcome, Document};

use crate::db::Storage;
use crate::error::StorageError;

/// Document store as seen by the inbox processor and the reconciler.
pub trait DocumentRepository: Send + Sync {
    /// Create a document. Returns the stored record and whether it was new.
    fn create_document(
        &self,
        doc: &Document,
        dedup: bool,
    ) -> Result<(Document, bool), StorageError>;

    fn update_document(&self, doc: &Document) -> Result<Document, StorageError>;

    fn get_document(&self, document_id: &str) -> Result<Option<Document>, StorageError>;

    fn find_by_content_hash(
        &self,
        tenant_id: &str,
        content_hash: &str,
    ) -> Result<Option<Document>, StorageError>;

    /// Live documents with a missing or stale index entry, oldest first.
    fn documents_needing_indexing(&self, limit: usize) -> Result<Vec<Document>, StorageError>;

    /// Soft-deleted documents that are still in the index.
    fn documents_pending_removal(&self, limit: usize) -> Result<Vec<Document>, StorageError>;

    /// Record a confirmed index entry. False when the document changed
    /// after `seen_updated_at` and must stay eligible.
    fn mark_indexed(
        &self,
        document_id: &str,
        search_index_id: &str,
        indexed_at: DateTime<Utc>,
        seen_updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    fn clear_index_fields(&self, document_id: &str) -> Result<bool, StorageError>;

    fn record_batch(&self, outcome: &BatchOutcome) -> Result<(), StorageError>;
}

impl DocumentRepository for Storage {
    fn create_document(
        &self,
        doc: &Document,
        dedup: bool,
    ) -> Result<(Document, bool), StorageError> {
        Storage::create_document(self, doc, dedup)
    }

    fn update_document(&self, doc: &Document) -> Result<Document, StorageError> {
        Storage::update_document(self, doc)
    }

    fn get_document(&self, document_id: &str) -> Result<Option<Document>, StorageError> {
        Storage::get_document(self, document_id)
    }

    fn find_by_content_hash(
        &self,
        tenant_id: &str,
        content_hash: &str,
    ) -> Result<Option<Document>, StorageError> {
        Storage::find_by_content_hash(self, tenant_id, content_hash)
    }

    fn documents_needing_indexing(&self, limit: usize) -> Result<Vec<Document>, StorageError> {
        Storage::documents_needing_indexing(self, limit)
    }

    fn documents_pending_removal(&self, limit: usize) -> Result<Vec<Document>, StorageError> {
        Storage::documents_pending_removal(self, limit)
    }

    fn mark_indexed(
        &self,
        document_id: &str,
        search_index_id: &str,
        indexed_at: DateTime<Utc>,
        seen_updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        Storage::mark_indexed(self, document_id, search_index_id, indexed_at, seen_updated_at)
    }

    fn clear_index_fields(&self, document_id: &str) -> Result<bool, StorageError> {
        Storage::clear_index_fields(self, document_id)
    }

    fn record_batch(&self, outcome: &BatchOutcome) -> Result<(), StorageError> {
        self.put_batch_outcome(outcome)
    }
}
