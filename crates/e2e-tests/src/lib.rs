//! End-to-end test infrastructure for docket.
//!
//! Provides a shared TestHarness wiring real RocksDB storage, local blob
//! areas and a Tantivy index in one temp directory, plus test doubles for
//! the blob store and the search backend.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use docket_blob::{
    AreaLayout, BlobArea, BlobItem, BlobMetadata, BlobObject, BlobResult, BlobStore,
    LocalBlobStore,
};
use docket_inbox::{InboxConfig, InboxProcessor};
use docket_indexing::{ReconcileConfig, Reconciler};
use docket_processing::DocumentProcessor;
use docket_search::{
    DocumentSearcher, SearchBackend, SearchError, SearchIndex, SearchIndexConfig, SearchIndexer,
};
use docket_storage::Storage;
use docket_types::Document;

/// Blob store wrapper that counts calls per operation.
pub struct CountingBlobStore<S> {
    inner: S,
    lists: AtomicUsize,
    downloads: AtomicUsize,
    uploads: AtomicUsize,
    moves: AtomicUsize,
}

impl<S: BlobStore> CountingBlobStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            lists: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
            moves: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn move_calls(&self) -> usize {
        self.moves.load(Ordering::SeqCst)
    }

    /// list + download + upload + move
    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.download_calls() + self.upload_calls() + self.move_calls()
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for CountingBlobStore<S> {
    async fn list(&self, area: BlobArea) -> BlobResult<Vec<BlobItem>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        self.inner.list(area).await
    }

    async fn download(&self, area: BlobArea, name: &str) -> BlobResult<BlobObject> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.inner.download(area, name).await
    }

    async fn upload(
        &self,
        area: BlobArea,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> BlobResult<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .upload(area, name, bytes, content_type, metadata)
            .await
    }

    async fn move_blob(
        &self,
        from: BlobArea,
        to: BlobArea,
        name: &str,
        extra_metadata: BlobMetadata,
    ) -> BlobResult<()> {
        self.moves.fetch_add(1, Ordering::SeqCst);
        self.inner.move_blob(from, to, name, extra_metadata).await
    }

    async fn exists(&self, area: BlobArea, name: &str) -> BlobResult<bool> {
        self.inner.exists(area, name).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

/// Search backend that drops selected documents from batch results.
///
/// Wraps a real indexer. Documents whose id is in the reject set are left
/// out of `index_batch` results, as a backend would for a per-item
/// failure. The health flag is reported as-is.
pub struct FlakyBackend {
    inner: Arc<SearchIndexer>,
    rejected: Mutex<HashSet<String>>,
    healthy: AtomicBool,
}

impl FlakyBackend {
    pub fn new(inner: Arc<SearchIndexer>) -> Self {
        Self {
            inner,
            rejected: Mutex::new(HashSet::new()),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn reject(&self, document_id: &str) {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(document_id.to_string());
    }

    pub fn accept_all(&self) {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    fn is_rejected(&self, document_id: &str) -> bool {
        self.rejected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(document_id)
    }
}

impl SearchBackend for FlakyBackend {
    fn index_one(&self, document: &Document) -> Result<String, SearchError> {
        if self.is_rejected(&document.document_id) {
            return Err(SearchError::Rejected(document.document_id.clone()));
        }
        self.inner.index_one(document)
    }

    fn index_batch(&self, documents: &[Document]) -> Result<HashMap<String, String>, SearchError> {
        let accepted: Vec<Document> = documents
            .iter()
            .filter(|d| !self.is_rejected(&d.document_id))
            .cloned()
            .collect();
        self.inner.index_batch(&accepted)
    }

    fn update(&self, document: &Document) -> Result<(), SearchError> {
        self.inner.update(document)
    }

    fn remove(&self, index_id: &str) -> Result<(), SearchError> {
        self.inner.remove(index_id)
    }

    fn remove_batch(&self, index_ids: &[String]) -> Result<Vec<String>, SearchError> {
        self.inner.remove_batch(index_ids)
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst) && self.inner.is_healthy()
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub storage: Arc<Storage>,
    pub blobs: Arc<CountingBlobStore<LocalBlobStore>>,
    pub index: SearchIndex,
    pub backend: Arc<FlakyBackend>,
    pub blob_root: PathBuf,
}

impl TestHarness {
    /// Create storage, blob areas and a search index under one temp dir.
    pub async fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let storage = Arc::new(
            Storage::open(&temp_dir.path().join("db")).expect("Failed to open test storage"),
        );

        let blob_root = temp_dir.path().join("blobs");
        let local = LocalBlobStore::new(&blob_root, AreaLayout::default())
            .await
            .expect("Failed to open blob store");
        let blobs = Arc::new(CountingBlobStore::new(local));

        let index = SearchIndex::open_or_create(SearchIndexConfig::new(
            temp_dir.path().join("search-index"),
        ))
        .expect("Failed to open search index");
        let indexer = Arc::new(SearchIndexer::new(&index).expect("Failed to create indexer"));
        let backend = Arc::new(FlakyBackend::new(indexer));

        Self {
            _temp_dir: temp_dir,
            storage,
            blobs,
            index,
            backend,
            blob_root,
        }
    }

    pub fn inbox_processor(&self, config: InboxConfig) -> InboxProcessor {
        InboxProcessor::new(
            self.blobs.clone(),
            self.storage.clone(),
            Arc::new(DocumentProcessor::default()),
            config,
        )
    }

    pub fn reconciler(&self, config: ReconcileConfig) -> Reconciler {
        Reconciler::new(self.storage.clone(), self.backend.clone(), config)
    }

    pub fn searcher(&self) -> DocumentSearcher {
        DocumentSearcher::new(&self.index).expect("Failed to open searcher")
    }

    /// Drop a file into the inbox area with no metadata.
    pub async fn drop_in_inbox(&self, name: &str, bytes: &[u8], content_type: &str) {
        self.drop_with_metadata(name, bytes, content_type, BlobMetadata::new())
            .await
    }

    pub async fn drop_with_metadata(
        &self,
        name: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: BlobMetadata,
    ) {
        self.blobs
            .inner()
            .upload(BlobArea::Inbox, name, bytes.to_vec(), content_type, metadata)
            .await
            .expect("Failed to seed inbox");
    }

    pub async fn names_in(&self, area: BlobArea) -> Vec<String> {
        self.blobs
            .inner()
            .list(area)
            .await
            .expect("Failed to list area")
            .into_iter()
            .map(|item| item.name)
            .collect()
    }

    pub async fn metadata_of(&self, area: BlobArea, name: &str) -> BlobMetadata {
        self.blobs
            .inner()
            .download(area, name)
            .await
            .expect("Blob not found")
            .item
            .metadata
    }
}

/// Persist `count` documents that have never been indexed.
pub fn seed_unindexed_documents(storage: &Storage, tenant: &str, count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let doc = Document::new(
                tenant,
                "memo",
                format!("memo-{}.txt", i),
                "text/plain",
                format!("hash-{}-{}", tenant, i),
                64,
            )
            .with_extracted_text(format!("quarterly report section {}", i));
            let (stored, created) = storage
                .create_document(&doc, true)
                .expect("Failed to seed document");
            assert!(created);
            stored
        })
        .collect()
}

/// Current time truncated to the millisecond precision documents are
/// stored with, for "not before cycle start" assertions.
pub fn cycle_start() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).expect("timestamp in range")
}
