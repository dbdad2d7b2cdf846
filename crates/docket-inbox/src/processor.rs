//! The inbox ingestion cycle.
//!
//! Per item: download, process, persist, then move the source out of the
//! inbox. The move always comes last, so an item whose persistence
//! succeeded but whose move failed is seen again on the next cycle.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use docket_blob::{BlobArea, BlobItem, BlobMetadata, BlobStore};
use docket_processing::DocumentProcessor;
use docket_storage::DocumentRepository;
use docket_types::{
    document_storage_path, BatchKind, BatchOutcome, Document, ErrorKind, InboxItem,
    ProcessingResult, META_DOCUMENT_TYPE_ID, META_TENANT_ID,
};

use crate::config::InboxConfig;
use crate::error::InboxError;
use crate::report::{CycleReport, ItemOutcome};

/// Metadata keys written on moved blobs
pub const META_DOCUMENT_ID: &str = "document_id";
pub const META_DUPLICATE_OF: &str = "duplicate_of";
pub const META_PROCESSED_AT: &str = "processed_at";
pub const META_ERROR: &str = "error";
pub const META_ERROR_DETAIL: &str = "error_detail";
pub const META_FAILED_AT: &str = "failed_at";

pub struct InboxProcessor {
    blobs: Arc<dyn BlobStore>,
    repo: Arc<dyn DocumentRepository>,
    processor: Arc<DocumentProcessor>,
    config: InboxConfig,
    cycle_lock: Mutex<()>,
}

impl InboxProcessor {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        repo: Arc<dyn DocumentRepository>,
        processor: Arc<DocumentProcessor>,
        config: InboxConfig,
    ) -> Self {
        Self {
            blobs,
            repo,
            processor,
            config,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &InboxConfig {
        &self.config
    }

    /// Run one ingestion cycle.
    ///
    /// Returns `Err` only when the cycle as a whole could not run (the
    /// listing failed). A second call while a cycle is in flight returns a
    /// report with `skipped` set.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, InboxError> {
        if !self.config.enabled {
            debug!("Inbox processor disabled, skipping cycle");
            return Ok(CycleReport::disabled());
        }

        let Ok(_guard) = self.cycle_lock.try_lock() else {
            info!("Inbox cycle already running, skipping");
            return Ok(CycleReport::skipped());
        };

        let started = Instant::now();
        let mut items = self.blobs.list(BlobArea::Inbox).await?;
        items.truncate(self.config.batch_size);

        let mut report = CycleReport::new();
        report.listed = items.len();
        if items.is_empty() {
            debug!("Inbox empty");
            return Ok(report);
        }

        let mut batch = BatchOutcome::start(BatchKind::InboxCycle);
        for item in &items {
            if cancel.is_cancelled() {
                info!("Inbox cycle cancelled between items");
                report.cancelled = true;
                break;
            }
            let outcome = self.ingest(item).await;
            match &outcome {
                ItemOutcome::Ingested { .. } | ItemOutcome::Duplicate { .. } => {
                    batch.record_success()
                }
                ItemOutcome::Failed { .. } => batch.record_failure(),
                ItemOutcome::Retained { .. } => batch.record_skip(),
            }
            report.record(&item.name, outcome);
        }

        let batch = batch.finish();
        if let Err(e) = self.repo.record_batch(&batch) {
            warn!(batch_id = %batch.batch_id, error = %e, "Failed to record inbox batch outcome");
        }
        report.batch = Some(batch);

        info!(
            listed = report.listed,
            ingested = report.ingested,
            duplicates = report.duplicates,
            failed = report.failed,
            retained = report.retained,
            duration_ms = started.elapsed().as_millis() as u64,
            "Inbox cycle complete"
        );
        Ok(report)
    }

    /// Take one item through download, processing, persistence and move.
    async fn ingest(&self, listed: &BlobItem) -> ItemOutcome {
        let name = listed.name.as_str();

        let object = match self.blobs.download(BlobArea::Inbox, name).await {
            Ok(object) => object,
            Err(e) => {
                warn!(item = %name, error = %e, "Download failed, leaving item in inbox");
                return ItemOutcome::Retained {
                    error: e.to_string(),
                };
            }
        };

        let item = InboxItem::new(
            name,
            object.bytes,
            object.item.content_type,
            object.item.created_at,
            object.item.metadata,
            &self.config.defaults,
        );
        debug!(
            item = %name,
            tenant = %item.tenant_id,
            doc_type = %item.document_type_id,
            size_bytes = item.size_bytes,
            "Processing inbox item"
        );

        let processor = Arc::clone(&self.processor);
        let (item, result) = match tokio::task::spawn_blocking(move || {
            let result = processor.process_document(&item);
            (item, result)
        })
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                let error = InboxError::Task(e.to_string()).to_string();
                warn!(item = %name, error = %error, "Processing task aborted");
                return self
                    .move_to_failed(name, &error, Some("processing task aborted"))
                    .await;
            }
        };

        if !result.is_success() {
            let error = result
                .error_message()
                .unwrap_or("unknown processing error")
                .to_string();
            return self
                .move_to_failed(name, &error, result.error_detail())
                .await;
        }

        self.persist(&item, result).await
    }

    async fn persist(&self, item: &InboxItem, result: ProcessingResult) -> ItemOutcome {
        let name = item.name.as_str();
        let hash = result.content_hash().unwrap_or_default().to_string();

        if self.config.dedup_by_content_hash {
            match self.repo.find_by_content_hash(&item.tenant_id, &hash) {
                Ok(Some(existing)) => {
                    info!(
                        item = %name,
                        tenant = %item.tenant_id,
                        document_id = %existing.document_id,
                        "Duplicate content, reusing existing document"
                    );
                    return self
                        .move_to_processed(name, &existing.document_id, true)
                        .await;
                }
                Ok(None) => {}
                Err(e) => {
                    return self
                        .persist_failed(name, "duplicate lookup", e.kind(), e.to_string())
                        .await;
                }
            }
        }

        let file_name = item.file_name().to_string();
        let mut doc = Document::new(
            &item.tenant_id,
            &item.document_type_id,
            &file_name,
            result.mime_type(),
            &hash,
            item.size_bytes,
        )
        .with_extracted_text(result.extracted_text().unwrap_or_default())
        .with_created_by(&self.config.system_user);
        doc.metadata = item.metadata.clone();
        if let Err(e) = doc.validate() {
            return self
                .persist_failed(name, "validation", e.kind(), e.to_string())
                .await;
        }

        let storage_path = document_storage_path(
            &item.tenant_id,
            &item.document_type_id,
            doc.created_at,
            &doc.document_id,
            &file_name,
        );
        let mut blob_metadata = BlobMetadata::new();
        blob_metadata.insert(META_DOCUMENT_ID.to_string(), doc.document_id.clone());
        blob_metadata.insert(META_TENANT_ID.to_string(), item.tenant_id.clone());
        blob_metadata.insert(
            META_DOCUMENT_TYPE_ID.to_string(),
            item.document_type_id.clone(),
        );
        if let Err(e) = self
            .blobs
            .upload(
                BlobArea::Documents,
                &storage_path,
                item.bytes.clone(),
                result.mime_type(),
                blob_metadata,
            )
            .await
        {
            debug!(item = %name, path = %storage_path, "Document upload failed");
            return self
                .persist_failed(name, "document upload", e.kind(), e.to_string())
                .await;
        }
        let doc = doc.with_storage_path(storage_path);

        let (stored, created) = match self
            .repo
            .create_document(&doc, self.config.dedup_by_content_hash)
        {
            Ok(pair) => pair,
            Err(e) => {
                debug!(item = %name, tenant = %item.tenant_id, "Persisting document failed");
                return self
                    .persist_failed(name, "persistence", e.kind(), e.to_string())
                    .await;
            }
        };
        let result = result.with_document_id(&stored.document_id);
        debug!(
            item = %name,
            document_id = ?result.document_id(),
            duration_ms = result.duration_ms(),
            created,
            "Document persisted"
        );

        self.move_to_processed(name, &stored.document_id, !created)
            .await
    }

    /// Retryable errors leave the item for the next cycle. Anything else
    /// would fail the same way every time, so the item goes to `failed`.
    async fn persist_failed(
        &self,
        name: &str,
        stage: &str,
        kind: ErrorKind,
        error: String,
    ) -> ItemOutcome {
        if kind.is_retryable() {
            warn!(item = %name, stage, error = %error, "Item not stored, leaving it in inbox");
            return ItemOutcome::Retained { error };
        }
        warn!(item = %name, stage, kind = %kind, error = %error, "Item can never be stored");
        let detail = format!("{} rejected ({})", stage, kind);
        self.move_to_failed(name, &error, Some(&detail)).await
    }

    async fn move_to_processed(&self, name: &str, document_id: &str, duplicate: bool) -> ItemOutcome {
        let mut extra = BlobMetadata::new();
        extra.insert(META_DOCUMENT_ID.to_string(), document_id.to_string());
        extra.insert(META_PROCESSED_AT.to_string(), Utc::now().to_rfc3339());
        if duplicate {
            extra.insert(META_DUPLICATE_OF.to_string(), document_id.to_string());
        }

        match self
            .blobs
            .move_blob(BlobArea::Inbox, BlobArea::Processed, name, extra)
            .await
        {
            Ok(()) => {
                info!(item = %name, document_id = %document_id, "Moved item to processed");
                let document_id = document_id.to_string();
                if duplicate {
                    ItemOutcome::Duplicate { document_id }
                } else {
                    ItemOutcome::Ingested { document_id }
                }
            }
            Err(e) => {
                warn!(item = %name, error = %e, "Move to processed failed, leaving item in inbox");
                ItemOutcome::Retained {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn move_to_failed(&self, name: &str, error: &str, detail: Option<&str>) -> ItemOutcome {
        let mut extra = BlobMetadata::new();
        extra.insert(META_ERROR.to_string(), error.to_string());
        if let Some(detail) = detail {
            extra.insert(META_ERROR_DETAIL.to_string(), detail.to_string());
        }
        extra.insert(META_FAILED_AT.to_string(), Utc::now().to_rfc3339());

        match self
            .blobs
            .move_blob(BlobArea::Inbox, BlobArea::Failed, name, extra)
            .await
        {
            Ok(()) => {
                warn!(item = %name, error = %error, "Moved item to failed");
                ItemOutcome::Failed {
                    error: error.to_string(),
                }
            }
            Err(e) => {
                warn!(item = %name, error = %e, "Move to failed failed, leaving item in inbox");
                ItemOutcome::Retained {
                    error: e.to_string(),
                }
            }
        }
    }
}
