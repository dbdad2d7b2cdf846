//! RocksDB wrapper for docket storage.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Idempotent document creation with a tenant + content hash dedup index
//! - Index bookkeeping writes that leave `updated_at` untouched
//! - Version chains and soft delete
//! - Batch outcome audit records

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rocksdb::{ColumnFamily, Direction, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, info, warn};

use docket_types::{BatchOutcome, Document};

use crate::column_families::{
    build_cf_descriptors, ALL_CF_NAMES, CF_BATCHES, CF_CONTENT_HASHES, CF_DOCUMENTS,
};
use crate::error::StorageError;
use crate::keys::{BatchKey, ContentHashKey, DocumentKey};

/// Main storage interface for docket
pub struct Storage {
    db: DB,
    /// Serializes read-modify-write sequences on document records
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))
    }

    fn read_document(
        &self,
        cf: &ColumnFamily,
        key: &DocumentKey,
    ) -> Result<Option<Document>, StorageError> {
        match self.db.get_cf(cf, key.to_bytes())? {
            Some(bytes) => Ok(Some(Document::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn load_existing(&self, cf: &ColumnFamily, document_id: &str) -> Result<Document, StorageError> {
        let key = DocumentKey::new(document_id)?;
        self.read_document(cf, &key)?
            .ok_or_else(|| StorageError::NotFound(document_id.to_string()))
    }

    /// Live document the dedup index points at, if any.
    fn live_document_for_hash(
        &self,
        docs_cf: &ColumnFamily,
        hashes_cf: &ColumnFamily,
        hash_key: &ContentHashKey,
    ) -> Result<Option<Document>, StorageError> {
        let Some(id_bytes) = self.db.get_cf(hashes_cf, hash_key.to_bytes())? else {
            return Ok(None);
        };
        let document_id = String::from_utf8(id_bytes)
            .map_err(|e| StorageError::Serialization(format!("Invalid hash index value: {}", e)))?;
        let key = DocumentKey::new(document_id)?;
        Ok(self
            .read_document(docs_cf, &key)?
            .filter(|doc| !doc.is_deleted))
    }

    fn put_document(
        &self,
        batch: &mut WriteBatch,
        cf: &ColumnFamily,
        doc: &Document,
    ) -> Result<(), StorageError> {
        doc.validate()?;
        let key = DocumentKey::new(&doc.document_id)?;
        batch.put_cf(cf, key.to_bytes(), doc.to_bytes()?);
        Ok(())
    }

    // ==================== Document Methods ====================

    /// Store a new document.
    ///
    /// Returns `(document, created)`. `created` is false when the id already
    /// exists, or when `dedup` is set and a live document with the same
    /// tenant and content hash exists; the existing record is returned.
    /// The record and its dedup index entry are written atomically.
    pub fn create_document(
        &self,
        doc: &Document,
        dedup: bool,
    ) -> Result<(Document, bool), StorageError> {
        doc.validate()?;
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let hashes_cf = self.cf(CF_CONTENT_HASHES)?;
        let _guard = self.lock()?;

        let key = DocumentKey::new(&doc.document_id)?;
        if let Some(existing) = self.read_document(docs_cf, &key)? {
            debug!(document_id = %doc.document_id, "Document already exists, skipping");
            return Ok((existing, false));
        }

        let hash_key = ContentHashKey::new(&doc.tenant_id, &doc.content_hash);
        let indexed = self.live_document_for_hash(docs_cf, hashes_cf, &hash_key)?;

        if dedup {
            if let Some(existing) = indexed {
                debug!(
                    document_id = %existing.document_id,
                    tenant = %doc.tenant_id,
                    "Content hash already stored, reusing document"
                );
                return Ok((existing, false));
            }
        }

        let mut batch = WriteBatch::default();
        self.put_document(&mut batch, docs_cf, doc)?;
        // The index keeps pointing at the first live document for a hash
        if indexed.is_none() {
            batch.put_cf(hashes_cf, hash_key.to_bytes(), doc.document_id.as_bytes());
        }
        self.db.write(batch)?;

        debug!(
            document_id = %doc.document_id,
            tenant = %doc.tenant_id,
            version = doc.version,
            "Stored document"
        );
        Ok((doc.clone(), true))
    }

    /// Get a document by id.
    pub fn get_document(&self, document_id: &str) -> Result<Option<Document>, StorageError> {
        let cf = self.cf(CF_DOCUMENTS)?;
        let key = DocumentKey::new(document_id)?;
        self.read_document(cf, &key)
    }

    /// Live document with this tenant and content hash.
    pub fn find_by_content_hash(
        &self,
        tenant_id: &str,
        content_hash: &str,
    ) -> Result<Option<Document>, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let hashes_cf = self.cf(CF_CONTENT_HASHES)?;
        self.live_document_for_hash(docs_cf, hashes_cf, &ContentHashKey::new(tenant_id, content_hash))
    }

    /// Replace a document's content fields and bump `updated_at`.
    ///
    /// The index fields and `created_at` are carried over from the stored
    /// record; only the reconciliation loop writes those.
    pub fn update_document(&self, doc: &Document) -> Result<Document, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let hashes_cf = self.cf(CF_CONTENT_HASHES)?;
        let _guard = self.lock()?;

        let stored = self.load_existing(docs_cf, &doc.document_id)?;

        let mut updated = doc.clone();
        updated.search_index_id = stored.search_index_id.clone();
        updated.last_indexed_at = stored.last_indexed_at;
        updated.created_at = stored.created_at;
        updated.updated_at = next_modified(&stored);

        let mut batch = WriteBatch::default();
        self.put_document(&mut batch, docs_cf, &updated)?;

        if updated.content_hash != stored.content_hash || updated.tenant_id != stored.tenant_id {
            let old_key = ContentHashKey::new(&stored.tenant_id, &stored.content_hash);
            if self.db.get_cf(hashes_cf, old_key.to_bytes())?.as_deref()
                == Some(stored.document_id.as_bytes())
            {
                batch.delete_cf(hashes_cf, old_key.to_bytes());
            }
            let new_key = ContentHashKey::new(&updated.tenant_id, &updated.content_hash);
            if self
                .live_document_for_hash(docs_cf, hashes_cf, &new_key)?
                .is_none()
            {
                batch.put_cf(hashes_cf, new_key.to_bytes(), updated.document_id.as_bytes());
            }
        }

        self.db.write(batch)?;
        debug!(document_id = %updated.document_id, "Updated document");
        Ok(updated)
    }

    /// Record a confirmed index entry.
    ///
    /// Only the index fields change. Returns false, leaving the document
    /// eligible, when it vanished, was soft-deleted, or was modified after
    /// `seen_updated_at` (the version that was actually indexed).
    pub fn mark_indexed(
        &self,
        document_id: &str,
        search_index_id: &str,
        indexed_at: DateTime<Utc>,
        seen_updated_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let _guard = self.lock()?;

        let key = DocumentKey::new(document_id)?;
        let Some(mut doc) = self.read_document(docs_cf, &key)? else {
            debug!(document_id, "Document vanished before mark_indexed");
            return Ok(false);
        };
        if doc.is_deleted {
            debug!(document_id, "Document deleted before mark_indexed");
            return Ok(false);
        }
        if doc.updated_at.timestamp_millis() != seen_updated_at.timestamp_millis() {
            debug!(document_id, "Document modified while indexing, leaving eligible");
            return Ok(false);
        }

        doc.search_index_id = Some(search_index_id.to_string());
        doc.last_indexed_at = Some(indexed_at.max(doc.updated_at));

        let mut batch = WriteBatch::default();
        self.put_document(&mut batch, docs_cf, &doc)?;
        self.db.write(batch)?;
        Ok(true)
    }

    /// Drop the index fields after the entry was removed from the index.
    pub fn clear_index_fields(&self, document_id: &str) -> Result<bool, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let _guard = self.lock()?;

        let key = DocumentKey::new(document_id)?;
        let Some(mut doc) = self.read_document(docs_cf, &key)? else {
            return Ok(false);
        };
        if doc.search_index_id.is_none() && doc.last_indexed_at.is_none() {
            return Ok(false);
        }
        doc.search_index_id = None;
        doc.last_indexed_at = None;

        let mut batch = WriteBatch::default();
        self.put_document(&mut batch, docs_cf, &doc)?;
        self.db.write(batch)?;
        Ok(true)
    }

    /// Scan documents in id order, keeping those that match `predicate`.
    ///
    /// Undecodable records are logged and skipped so a single bad value
    /// cannot stall reconciliation.
    fn scan_documents<F>(&self, limit: usize, predicate: F) -> Result<Vec<Document>, StorageError>
    where
        F: Fn(&Document) -> bool,
    {
        let cf = self.cf(CF_DOCUMENTS)?;
        let prefix = DocumentKey::PREFIX.as_bytes();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        let mut results = Vec::new();
        for item in iter {
            if results.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            match Document::from_bytes(&value) {
                Ok(doc) if predicate(&doc) => results.push(doc),
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        key = %String::from_utf8_lossy(&key),
                        error = %e,
                        "Skipping undecodable document record"
                    );
                }
            }
        }
        Ok(results)
    }

    /// Documents that are live and lack a current index entry, oldest first.
    pub fn documents_needing_indexing(&self, limit: usize) -> Result<Vec<Document>, StorageError> {
        self.scan_documents(limit, Document::needs_indexing)
    }

    /// Soft-deleted documents that still have an index entry.
    pub fn documents_pending_removal(&self, limit: usize) -> Result<Vec<Document>, StorageError> {
        self.scan_documents(limit, Document::is_pending_removal)
    }

    /// All documents, oldest first.
    pub fn list_documents(&self, limit: usize) -> Result<Vec<Document>, StorageError> {
        self.scan_documents(limit, |_| true)
    }

    // ==================== Versions & Lifecycle ====================

    /// Store `draft` as the next version in `parent_id`'s chain.
    ///
    /// The previous current version loses its flag in the same write, so
    /// exactly one version of the chain stays current.
    pub fn create_version(
        &self,
        parent_id: &str,
        draft: &Document,
    ) -> Result<Document, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let hashes_cf = self.cf(CF_CONTENT_HASHES)?;
        let _guard = self.lock()?;

        let parent = self.load_existing(docs_cf, parent_id)?;
        let root_id = parent
            .parent_document_id
            .clone()
            .unwrap_or_else(|| parent.document_id.clone());

        let chain = self.chain_members(&root_id)?;
        let max_version = chain.iter().map(|d| d.version).max().unwrap_or(parent.version);

        let mut doc = draft.clone();
        doc.version = max_version + 1;
        doc.parent_document_id = Some(root_id.clone());
        doc.is_current_version = true;
        doc.search_index_id = None;
        doc.last_indexed_at = None;

        let mut batch = WriteBatch::default();
        for mut previous in chain.into_iter().filter(|d| d.is_current_version) {
            previous.is_current_version = false;
            previous.updated_at = next_modified(&previous);
            self.put_document(&mut batch, docs_cf, &previous)?;
        }
        self.put_document(&mut batch, docs_cf, &doc)?;

        let hash_key = ContentHashKey::new(&doc.tenant_id, &doc.content_hash);
        if self
            .live_document_for_hash(docs_cf, hashes_cf, &hash_key)?
            .is_none()
        {
            batch.put_cf(hashes_cf, hash_key.to_bytes(), doc.document_id.as_bytes());
        }
        self.db.write(batch)?;

        info!(
            document_id = %doc.document_id,
            root = %root_id,
            version = doc.version,
            "Stored new document version"
        );
        Ok(doc)
    }

    fn chain_members(&self, root_id: &str) -> Result<Vec<Document>, StorageError> {
        self.scan_documents(usize::MAX, |d| {
            d.document_id == root_id || d.parent_document_id.as_deref() == Some(root_id)
        })
    }

    /// Every version of the chain rooted at `root_id`, by version number.
    pub fn version_chain(&self, root_id: &str) -> Result<Vec<Document>, StorageError> {
        let mut chain = self.chain_members(root_id)?;
        chain.sort_by_key(|d| d.version);
        Ok(chain)
    }

    /// Soft-delete a document. Its index entry is removed on the next
    /// reconciliation cycle.
    pub fn soft_delete(
        &self,
        document_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<Document, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let _guard = self.lock()?;

        let mut doc = self.load_existing(docs_cf, document_id)?;
        if doc.is_deleted {
            return Ok(doc);
        }
        let now = next_modified(&doc);
        doc.is_deleted = true;
        doc.deleted_reason = Some(reason.to_string());
        doc.deleted_by = Some(actor.to_string());
        doc.deleted_at = Some(now);
        doc.updated_at = now;

        let mut batch = WriteBatch::default();
        self.put_document(&mut batch, docs_cf, &doc)?;
        self.db.write(batch)?;

        info!(document_id, reason, actor, "Soft-deleted document");
        Ok(doc)
    }

    /// Set or clear the archive flag.
    pub fn set_archived(&self, document_id: &str, archived: bool) -> Result<Document, StorageError> {
        let docs_cf = self.cf(CF_DOCUMENTS)?;
        let _guard = self.lock()?;

        let mut doc = self.load_existing(docs_cf, document_id)?;
        if doc.is_archived != archived {
            doc.is_archived = archived;
            doc.updated_at = next_modified(&doc);
            let mut batch = WriteBatch::default();
            self.put_document(&mut batch, docs_cf, &doc)?;
            self.db.write(batch)?;
        }
        Ok(doc)
    }

    // ==================== Batch Outcomes ====================

    /// Append a batch outcome to the audit trail.
    pub fn put_batch_outcome(&self, outcome: &BatchOutcome) -> Result<(), StorageError> {
        let cf = self.cf(CF_BATCHES)?;
        let key = BatchKey::new(outcome.started_at.timestamp_millis(), &outcome.batch_id);
        self.db.put_cf(cf, key.to_bytes(), outcome.to_bytes()?)?;
        debug!(batch_id = %outcome.batch_id, kind = %outcome.kind, "Stored batch outcome");
        Ok(())
    }

    /// Most recent batch outcomes, newest first.
    pub fn recent_batch_outcomes(&self, limit: usize) -> Result<Vec<BatchOutcome>, StorageError> {
        let cf = self.cf(CF_BATCHES)?;
        let iter = self.db.iterator_cf(cf, IteratorMode::End);

        let mut results = Vec::new();
        for item in iter.take(limit) {
            let (key, value) = item?;
            BatchKey::from_bytes(&key)?;
            results.push(BatchOutcome::from_bytes(&value)?);
        }
        Ok(results)
    }

    // ===== Admin Operations =====

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }

    /// Trigger manual compaction on all column families.
    pub fn compact(&self) -> Result<(), StorageError> {
        info!("Starting full compaction...");
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
            }
        }
        info!("Compaction complete");
        Ok(())
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        let mut stats = StorageStats::default();

        let cf = self.cf(CF_DOCUMENTS)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            stats.document_count += 1;
            if let Ok(doc) = Document::from_bytes(&value) {
                if doc.is_deleted {
                    stats.deleted_count += 1;
                }
                if doc.needs_indexing() {
                    stats.needs_indexing_count += 1;
                }
            }
        }

        let cf = self.cf(CF_BATCHES)?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            stats.batch_count += 1;
        }

        stats.disk_usage_bytes = self.get_disk_usage();
        Ok(stats)
    }

    fn get_disk_usage(&self) -> u64 {
        std::fs::read_dir(self.db.path())
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|e| e.metadata().ok())
                    .map(|m| m.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// A modification timestamp guaranteed to be newer than the last index
/// time, so the change is always picked up by reconciliation.
fn next_modified(stored: &Document) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = [Some(stored.updated_at), stored.last_indexed_at]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(now);
    if now.timestamp_millis() <= floor.timestamp_millis() {
        floor + Duration::milliseconds(1)
    } else {
        now
    }
}

/// Statistics about the storage.
#[derive(Debug, Default)]
pub struct StorageStats {
    pub document_count: u64,
    pub deleted_count: u64,
    pub needs_indexing_count: u64,
    pub batch_count: u64,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use docket_types::BatchKind;
    use tempfile::TempDir;

    fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Storage::open(temp_dir.path()).unwrap();
        (storage, temp_dir)
    }

    fn sample_doc(tenant: &str, hash: &str) -> Document {
        Document::new(tenant, "general", "notes.txt", "text/plain", hash, 5)
            .with_extracted_text("hello")
    }

    #[test]
    fn test_open_creates_column_families() {
        let (storage, _temp) = create_test_storage();
        for cf_name in ALL_CF_NAMES {
            assert!(
                storage.db.cf_handle(cf_name).is_some(),
                "CF {} should exist",
                cf_name
            );
        }
    }

    #[test]
    fn test_create_and_get_document() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h1");

        let (stored, created) = storage.create_document(&doc, true).unwrap();
        assert!(created);
        assert_eq!(stored.document_id, doc.document_id);

        let fetched = storage.get_document(&doc.document_id).unwrap().unwrap();
        assert_eq!(fetched.extracted_text, "hello");
        assert_eq!(fetched.version, 1);
    }

    #[test]
    fn test_create_same_id_is_idempotent() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h1");
        storage.create_document(&doc, false).unwrap();

        let (_, created) = storage.create_document(&doc, false).unwrap();
        assert!(!created);
        assert_eq!(storage.list_documents(10).unwrap().len(), 1);
    }

    #[test]
    fn test_dedup_by_tenant_and_hash() {
        let (storage, _temp) = create_test_storage();
        let first = sample_doc("acme", "same-hash");
        storage.create_document(&first, true).unwrap();

        let second = sample_doc("acme", "same-hash");
        let (existing, created) = storage.create_document(&second, true).unwrap();
        assert!(!created);
        assert_eq!(existing.document_id, first.document_id);

        // Other tenants are independent
        let other = sample_doc("globex", "same-hash");
        let (_, created) = storage.create_document(&other, true).unwrap();
        assert!(created);

        // Dedup disabled inserts anyway
        let third = sample_doc("acme", "same-hash");
        let (_, created) = storage.create_document(&third, false).unwrap();
        assert!(created);
        assert_eq!(storage.list_documents(10).unwrap().len(), 3);
    }

    #[test]
    fn test_dedup_ignores_deleted_documents() {
        let (storage, _temp) = create_test_storage();
        let first = sample_doc("acme", "h");
        storage.create_document(&first, true).unwrap();
        storage.soft_delete(&first.document_id, "dup", "admin").unwrap();

        assert!(storage.find_by_content_hash("acme", "h").unwrap().is_none());
        let (_, created) = storage.create_document(&sample_doc("acme", "h"), true).unwrap();
        assert!(created);
    }

    #[test]
    fn test_needs_indexing_query() {
        let (storage, _temp) = create_test_storage();
        let docs: Vec<Document> = (0..3).map(|i| sample_doc("acme", &format!("h{}", i))).collect();
        for doc in &docs {
            storage.create_document(doc, true).unwrap();
        }
        storage.soft_delete(&docs[2].document_id, "spam", "admin").unwrap();

        let pending = storage.documents_needing_indexing(10).unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|d| !d.is_deleted));

        let limited = storage.documents_needing_indexing(1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_mark_indexed_clears_eligibility() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h");
        storage.create_document(&doc, true).unwrap();
        let stored = storage.get_document(&doc.document_id).unwrap().unwrap();

        let marked = storage
            .mark_indexed(&doc.document_id, "acme/idx", Utc::now(), stored.updated_at)
            .unwrap();
        assert!(marked);

        let fetched = storage.get_document(&doc.document_id).unwrap().unwrap();
        assert_eq!(fetched.search_index_id.as_deref(), Some("acme/idx"));
        assert!(fetched.last_indexed_at.is_some());
        assert_eq!(fetched.updated_at, stored.updated_at);
        assert!(storage.documents_needing_indexing(10).unwrap().is_empty());
    }

    #[test]
    fn test_mark_indexed_rejects_stale_version() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h");
        storage.create_document(&doc, true).unwrap();
        let seen = storage.get_document(&doc.document_id).unwrap().unwrap();

        let edited = seen.clone().with_title("Edited");
        storage.update_document(&edited).unwrap();

        let marked = storage
            .mark_indexed(&doc.document_id, "acme/idx", Utc::now(), seen.updated_at)
            .unwrap();
        assert!(!marked);
        assert_eq!(storage.documents_needing_indexing(10).unwrap().len(), 1);
    }

    #[test]
    fn test_update_after_indexing_makes_stale() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h");
        storage.create_document(&doc, true).unwrap();
        let seen = storage.get_document(&doc.document_id).unwrap().unwrap();
        storage
            .mark_indexed(&doc.document_id, "acme/idx", Utc::now(), seen.updated_at)
            .unwrap();

        let indexed = storage.get_document(&doc.document_id).unwrap().unwrap();
        let updated = storage
            .update_document(&indexed.clone().with_description("new"))
            .unwrap();

        // Index fields are carried over, staleness comes from updated_at
        assert_eq!(updated.search_index_id.as_deref(), Some("acme/idx"));
        assert!(updated.updated_at > updated.last_indexed_at.unwrap());
        assert!(updated.needs_indexing());
    }

    #[test]
    fn test_update_missing_document() {
        let (storage, _temp) = create_test_storage();
        let result = storage.update_document(&sample_doc("acme", "h"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_pending_removal_and_clear() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h");
        storage.create_document(&doc, true).unwrap();
        let seen = storage.get_document(&doc.document_id).unwrap().unwrap();
        storage
            .mark_indexed(&doc.document_id, "acme/idx", Utc::now(), seen.updated_at)
            .unwrap();

        storage.soft_delete(&doc.document_id, "obsolete", "admin").unwrap();
        let pending = storage.documents_pending_removal(10).unwrap();
        assert_eq!(pending.len(), 1);
        assert!(storage.documents_needing_indexing(10).unwrap().is_empty());

        assert!(storage.clear_index_fields(&doc.document_id).unwrap());
        assert!(storage.documents_pending_removal(10).unwrap().is_empty());
        let fetched = storage.get_document(&doc.document_id).unwrap().unwrap();
        assert!(fetched.search_index_id.is_none());
        assert!(fetched.last_indexed_at.is_none());
        assert_eq!(fetched.deleted_reason.as_deref(), Some("obsolete"));
    }

    #[test]
    fn test_version_chain_single_current() {
        let (storage, _temp) = create_test_storage();
        let root = sample_doc("acme", "v1");
        storage.create_document(&root, true).unwrap();

        let v2 = storage
            .create_version(&root.document_id, &sample_doc("acme", "v2"))
            .unwrap();
        let v3 = storage
            .create_version(&v2.document_id, &sample_doc("acme", "v3"))
            .unwrap();

        assert_eq!(v2.version, 2);
        assert_eq!(v3.version, 3);
        assert_eq!(v3.parent_document_id.as_deref(), Some(root.document_id.as_str()));

        let chain = storage.version_chain(&root.document_id).unwrap();
        assert_eq!(chain.len(), 3);
        let current: Vec<_> = chain.iter().filter(|d| d.is_current_version).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].document_id, v3.document_id);
    }

    #[test]
    fn test_archive_flag() {
        let (storage, _temp) = create_test_storage();
        let doc = sample_doc("acme", "h");
        storage.create_document(&doc, true).unwrap();

        let archived = storage.set_archived(&doc.document_id, true).unwrap();
        assert!(archived.is_archived);
        // Archived documents still get indexed
        assert_eq!(storage.documents_needing_indexing(10).unwrap().len(), 1);
    }

    #[test]
    fn test_batch_outcomes_newest_first() {
        let (storage, _temp) = create_test_storage();
        let mut first = BatchOutcome::start(BatchKind::IndexBatch);
        first.started_at = first.started_at - Duration::seconds(10);
        let second = BatchOutcome::start(BatchKind::InboxCycle);

        storage.put_batch_outcome(&first.clone().finish()).unwrap();
        storage.put_batch_outcome(&second.clone().finish()).unwrap();

        let recent = storage.recent_batch_outcomes(10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].batch_id, second.batch_id);
        assert_eq!(recent[1].batch_id, first.batch_id);

        assert_eq!(storage.recent_batch_outcomes(1).unwrap().len(), 1);
    }

    #[test]
    fn test_stats() {
        let (storage, _temp) = create_test_storage();
        let a = sample_doc("acme", "a");
        let b = sample_doc("acme", "b");
        storage.create_document(&a, true).unwrap();
        storage.create_document(&b, true).unwrap();
        storage.soft_delete(&b.document_id, "x", "admin").unwrap();
        storage
            .put_batch_outcome(&BatchOutcome::start(BatchKind::InboxCycle).finish())
            .unwrap();
        storage.flush().unwrap();

        let stats = storage.get_stats().unwrap();
        assert_eq!(stats.document_count, 2);
        assert_eq!(stats.deleted_count, 1);
        assert_eq!(stats.needs_indexing_count, 1);
        assert_eq!(stats.batch_count, 1);
        assert!(stats.disk_usage_bytes > 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let doc = sample_doc("acme", "h");
        {
            let storage = Storage::open(temp_dir.path()).unwrap();
            storage.create_document(&doc, true).unwrap();
        }
        let storage = Storage::open(temp_dir.path()).unwrap();
        assert!(storage.get_document(&doc.document_id).unwrap().is_some());
        assert!(storage.find_by_content_hash("acme", "h").unwrap().is_some());
    }
}
