//! Search-index reconciliation.
//!
//! Each cycle re-derives eligibility from the document store, so the loop
//! is self-correcting: anything not confirmed this cycle is simply picked
//! up again on the next one.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use docket_search::SearchBackend;
use docket_storage::DocumentRepository;
use docket_types::{BatchKind, BatchOutcome, Document};

use crate::config::ReconcileConfig;
use crate::error::IndexingError;
use crate::report::ReconcileReport;

pub struct Reconciler {
    repo: Arc<dyn DocumentRepository>,
    backend: Arc<dyn SearchBackend>,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        backend: Arc<dyn SearchBackend>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            repo,
            backend,
            config,
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one reconciliation cycle.
    ///
    /// Order: health check, index pass in `batch_size` chunks, then removal
    /// of soft-deleted documents. Cancellation is honored between batches.
    pub fn run_cycle(&self, cancel: &CancellationToken) -> Result<ReconcileReport, IndexingError> {
        let mut report = ReconcileReport::new();

        if !self.backend.is_healthy() {
            warn!(backend = self.backend.name(), "Search backend unhealthy, skipping cycle");
            return Err(IndexingError::Unhealthy(self.backend.name().to_string()));
        }

        let candidates = self
            .repo
            .documents_needing_indexing(self.config.max_documents_per_cycle)?;
        report.candidates = candidates.len();

        for chunk in candidates.chunks(self.config.batch_size) {
            if cancel.is_cancelled() {
                info!("Reconciliation cancelled between batches");
                report.cancelled = true;
                break;
            }
            let outcome = self.index_chunk(chunk, &mut report);
            self.record(outcome, &mut report);
        }

        if !report.cancelled {
            if cancel.is_cancelled() {
                report.cancelled = true;
            } else {
                self.remove_deleted(&mut report)?;
            }
        }

        info!(
            candidates = report.candidates,
            indexed = report.indexed,
            failed = report.failed,
            stale = report.stale,
            removed = report.removed,
            cancelled = report.cancelled,
            "Reconciliation cycle complete"
        );
        Ok(report)
    }

    /// Index one chunk and mark the confirmed documents.
    fn index_chunk(&self, chunk: &[Document], report: &mut ReconcileReport) -> BatchOutcome {
        let mut outcome = BatchOutcome::start(BatchKind::IndexBatch);

        let confirmed = match self.backend.index_batch(chunk) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(
                    batch_id = %outcome.batch_id,
                    size = chunk.len(),
                    error = %e,
                    "Index batch failed, documents stay eligible"
                );
                for _ in chunk {
                    outcome.record_failure();
                }
                report.failed += chunk.len();
                return outcome.finish();
            }
        };

        for document in chunk {
            let Some(index_id) = confirmed.get(&document.document_id) else {
                debug!(document_id = %document.document_id, "Not confirmed by backend");
                outcome.record_failure();
                report.failed += 1;
                continue;
            };

            match self.repo.mark_indexed(
                &document.document_id,
                index_id,
                Utc::now(),
                document.updated_at,
            ) {
                Ok(true) => {
                    outcome.record_success();
                    report.indexed += 1;
                }
                Ok(false) => {
                    outcome.record_skip();
                    report.stale += 1;
                }
                Err(e) => {
                    warn!(
                        document_id = %document.document_id,
                        tenant = %document.tenant_id,
                        error = %e,
                        "Failed to record index entry"
                    );
                    outcome.record_failure();
                    report.failed += 1;
                }
            }
        }

        outcome.finish()
    }

    /// Remove soft-deleted documents from the index and clear their fields.
    fn remove_deleted(&self, report: &mut ReconcileReport) -> Result<(), IndexingError> {
        let pending = self
            .repo
            .documents_pending_removal(self.config.max_documents_per_cycle)?;
        if pending.is_empty() {
            return Ok(());
        }

        let mut outcome = BatchOutcome::start(BatchKind::IndexRemoval);
        let index_ids: Vec<String> = pending
            .iter()
            .filter_map(|d| d.search_index_id.clone())
            .collect();

        match self.backend.remove_batch(&index_ids) {
            Ok(removed) => {
                for document in &pending {
                    let confirmed = document
                        .search_index_id
                        .as_ref()
                        .is_some_and(|id| removed.contains(id));
                    if !confirmed {
                        outcome.record_failure();
                        continue;
                    }
                    match self.repo.clear_index_fields(&document.document_id) {
                        Ok(_) => {
                            outcome.record_success();
                            report.removed += 1;
                        }
                        Err(e) => {
                            warn!(
                                document_id = %document.document_id,
                                error = %e,
                                "Failed to clear index fields"
                            );
                            outcome.record_failure();
                        }
                    }
                }
            }
            Err(e) => {
                warn!(count = pending.len(), error = %e, "Index removal failed");
                for _ in &pending {
                    outcome.record_failure();
                }
            }
        }

        self.record(outcome.finish(), report);
        Ok(())
    }

    fn record(&self, outcome: BatchOutcome, report: &mut ReconcileReport) {
        if let Err(e) = self.repo.record_batch(&outcome) {
            warn!(batch_id = %outcome.batch_id, error = %e, "Failed to store batch outcome");
        }
        report.batches.push(outcome);
    }
}
