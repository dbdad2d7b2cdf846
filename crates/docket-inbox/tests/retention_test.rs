//! Items stay in the inbox whenever a step after download cannot finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use docket_blob::{
    BlobArea, BlobError, BlobItem, BlobMetadata, BlobObject, BlobResult, BlobStore,
    MemoryBlobStore,
};
use docket_inbox::{InboxConfig, InboxError, InboxProcessor, ItemOutcome};
use docket_processing::DocumentProcessor;
use docket_storage::Storage;

/// Memory store whose moves and listings can be switched off.
#[derive(Default)]
struct BrokenStore {
    inner: MemoryBlobStore,
    fail_moves: AtomicBool,
    fail_list: AtomicBool,
}

#[async_trait]
impl BlobStore for BrokenStore {
    async fn list(&self, area: BlobArea) -> BlobResult<Vec<BlobItem>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(BlobError::ListFailed("listing unavailable".into()));
        }
        self.inner.list(area).await
    }

    async fn download(&self, area: BlobArea, name: &str) -> BlobResult<BlobObject> {
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
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(BlobError::MoveFailed(format!("{} is locked", name)));
        }
        self.inner.move_blob(from, to, name, extra_metadata).await
    }

    async fn exists(&self, area: BlobArea, name: &str) -> BlobResult<bool> {
        self.inner.exists(area, name).await
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

fn setup() -> (Arc<BrokenStore>, Arc<Storage>, InboxProcessor, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(Storage::open(dir.path()).unwrap());
    let blobs = Arc::new(BrokenStore::default());
    let processor = InboxProcessor::new(
        blobs.clone(),
        storage.clone(),
        Arc::new(DocumentProcessor::default()),
        InboxConfig::default(),
    );
    (blobs, storage, processor, dir)
}

#[tokio::test]
async fn move_failure_keeps_item_and_retry_reuses_document() {
    let (blobs, storage, processor, _dir) = setup();
    blobs
        .inner
        .insert(
            BlobArea::Inbox,
            "notes.txt",
            b"hello".to_vec(),
            "text/plain",
            BlobMetadata::new(),
            Utc::now(),
        )
        .unwrap();

    blobs.fail_moves.store(true, Ordering::SeqCst);
    let report = processor.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.retained, 1);
    assert_eq!(blobs.inner.names(BlobArea::Inbox), vec!["notes.txt"]);
    assert_eq!(storage.get_stats().unwrap().document_count, 1);

    blobs.fail_moves.store(false, Ordering::SeqCst);
    let report = processor.run_cycle(&CancellationToken::new()).await.unwrap();
    assert!(matches!(
        report.outcome_for("notes.txt"),
        Some(ItemOutcome::Duplicate { .. })
    ));
    assert!(blobs.inner.names(BlobArea::Inbox).is_empty());
    assert_eq!(blobs.inner.names(BlobArea::Processed), vec!["notes.txt"]);
    assert_eq!(storage.get_stats().unwrap().document_count, 1);
}

#[tokio::test]
async fn failed_move_to_failed_area_keeps_item() {
    let (blobs, storage, processor, _dir) = setup();
    blobs
        .inner
        .insert(
            BlobArea::Inbox,
            "scan.pdf",
            b"garbage".to_vec(),
            "application/pdf",
            BlobMetadata::new(),
            Utc::now(),
        )
        .unwrap();
    blobs.fail_moves.store(true, Ordering::SeqCst);

    let report = processor.run_cycle(&CancellationToken::new()).await.unwrap();

    assert!(matches!(
        report.outcome_for("scan.pdf"),
        Some(ItemOutcome::Retained { .. })
    ));
    assert_eq!(blobs.inner.names(BlobArea::Inbox), vec!["scan.pdf"]);
    assert!(blobs.inner.names(BlobArea::Failed).is_empty());
    assert_eq!(storage.get_stats().unwrap().document_count, 0);
}

#[tokio::test]
async fn listing_failure_surfaces_as_cycle_error() {
    let (blobs, _storage, processor, _dir) = setup();
    blobs.fail_list.store(true, Ordering::SeqCst);

    let err = processor
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, InboxError::Blob(BlobError::ListFailed(_))));
    assert!(err.kind().is_retryable());
}
