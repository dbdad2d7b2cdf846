//! End-to-end tests for search-index reconciliation.
//!
//! Documents live in RocksDB, the index is a real Tantivy index behind a
//! backend that can be told to reject documents or report unhealthy.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use docket_blob::BlobArea;
use docket_inbox::{InboxConfig, ItemOutcome};
use docket_indexing::{IndexingError, ReconcileConfig};
use docket_scheduler::jobs::{register_reconcile_job, RECONCILE_JOB};
use docket_scheduler::{JobResult, SchedulerConfig, SchedulerService};
use docket_search::SearchOptions;
use docket_storage::Storage;
use docket_types::{IndexingSettings, META_TENANT_ID};
use e2e_tests::{cycle_start, seed_unindexed_documents, TestHarness};

fn indexed_ids(storage: &Storage, ids: &[String]) -> Vec<Option<String>> {
    ids.iter()
        .map(|id| storage.get_document(id).unwrap().unwrap().search_index_id)
        .collect()
}

#[tokio::test]
async fn test_cycle_indexes_all_pending_documents() {
    let harness = TestHarness::new().await;
    let docs = seed_unindexed_documents(&harness.storage, "acme", 3);
    let reconciler = harness.reconciler(ReconcileConfig::default());

    let started = cycle_start();
    let report = reconciler.run_cycle(&CancellationToken::new()).unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(report.indexed, 3);
    assert_eq!(report.failed, 0);
    for doc in &docs {
        let stored = harness.storage.get_document(&doc.document_id).unwrap().unwrap();
        assert_eq!(
            stored.search_index_id,
            Some(format!("acme/{}", doc.document_id))
        );
        assert!(stored.last_indexed_at.unwrap() >= started);
        assert!(!stored.needs_indexing());
    }
    assert_eq!(harness.storage.get_stats().unwrap().needs_indexing_count, 0);

    let searcher = harness.searcher();
    searcher.reload().unwrap();
    assert_eq!(searcher.num_docs(), 3);
}

#[tokio::test]
async fn test_rejected_document_is_retried_next_cycle() {
    let harness = TestHarness::new().await;
    let docs = seed_unindexed_documents(&harness.storage, "acme", 2);
    let ids: Vec<String> = docs.iter().map(|d| d.document_id.clone()).collect();
    let reconciler = harness.reconciler(ReconcileConfig::default());

    harness.backend.reject(&ids[1]);
    let first = reconciler.run_cycle(&CancellationToken::new()).unwrap();

    assert_eq!(first.indexed, 1);
    assert_eq!(first.failed, 1);
    assert_eq!(first.retry_count(), 1);
    let after_first = indexed_ids(&harness.storage, &ids);
    assert!(after_first[0].is_some());
    assert!(after_first[1].is_none());

    harness.backend.accept_all();
    let second = reconciler.run_cycle(&CancellationToken::new()).unwrap();

    assert_eq!(second.candidates, 1);
    assert_eq!(second.indexed, 1);
    let after_second = indexed_ids(&harness.storage, &ids);
    assert!(after_second.iter().all(Option::is_some));
    // The first document's entry is untouched by the retry
    assert_eq!(after_second[0], after_first[0]);
}

#[tokio::test]
async fn test_unhealthy_backend_skips_cycle() {
    let harness = TestHarness::new().await;
    let docs = seed_unindexed_documents(&harness.storage, "acme", 2);
    let ids: Vec<String> = docs.iter().map(|d| d.document_id.clone()).collect();
    let reconciler = harness.reconciler(ReconcileConfig::default());

    harness.backend.set_healthy(false);
    let err = reconciler.run_cycle(&CancellationToken::new()).unwrap_err();

    assert!(matches!(err, IndexingError::Unhealthy(_)));
    assert_eq!(indexed_ids(&harness.storage, &ids), vec![None, None]);
    assert!(harness.storage.recent_batch_outcomes(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_soft_deleted_document_leaves_index() {
    let harness = TestHarness::new().await;
    let docs = seed_unindexed_documents(&harness.storage, "acme", 2);
    let reconciler = harness.reconciler(ReconcileConfig::default());
    reconciler.run_cycle(&CancellationToken::new()).unwrap();

    let deleted = harness
        .storage
        .soft_delete(&docs[0].document_id, "retention policy", "tester")
        .unwrap();
    assert!(!deleted.needs_indexing());
    assert!(deleted.is_pending_removal());

    let report = reconciler.run_cycle(&CancellationToken::new()).unwrap();
    assert_eq!(report.candidates, 0);
    assert_eq!(report.removed, 1);

    let stored = harness
        .storage
        .get_document(&docs[0].document_id)
        .unwrap()
        .unwrap();
    assert!(stored.is_deleted);
    assert!(stored.search_index_id.is_none());

    let searcher = harness.searcher();
    searcher.reload().unwrap();
    let hits = searcher
        .search("quarterly", &SearchOptions::new().with_limit(10))
        .unwrap();
    let hit_ids: Vec<String> = hits.into_iter().map(|h| h.document_id).collect();
    assert_eq!(hit_ids, vec![docs[1].document_id.clone()]);

    // Nothing left to do on a third pass
    let idle = reconciler.run_cycle(&CancellationToken::new()).unwrap();
    assert!(!idle.has_updates());
}

#[tokio::test]
async fn test_small_batches_record_one_outcome_each() {
    let harness = TestHarness::new().await;
    seed_unindexed_documents(&harness.storage, "acme", 5);
    let reconciler = harness.reconciler(ReconcileConfig::default().with_batch_size(2));

    let report = reconciler.run_cycle(&CancellationToken::new()).unwrap();

    assert_eq!(report.indexed, 5);
    assert_eq!(report.batches.len(), 3);
    let sizes: Vec<u64> = report.batches.iter().map(|b| b.processed).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(harness.storage.recent_batch_outcomes(10).unwrap().len(), 3);
}

#[tokio::test]
async fn test_ingested_document_becomes_searchable() {
    let harness = TestHarness::new().await;
    let mut metadata = docket_blob::BlobMetadata::new();
    metadata.insert(META_TENANT_ID.to_string(), "acme".to_string());
    harness
        .drop_with_metadata(
            "invoice.txt",
            b"invoice for consulting services rendered",
            "text/plain",
            metadata,
        )
        .await;
    harness
        .drop_in_inbox("other.txt", b"consulting notes for another tenant", "text/plain")
        .await;

    let inbox = harness.inbox_processor(InboxConfig::default());
    let ingest = inbox.run_cycle(&CancellationToken::new()).await.unwrap();
    assert_eq!(ingest.ingested, 2);
    let invoice_id = match ingest.outcome_for("invoice.txt") {
        Some(ItemOutcome::Ingested { document_id }) => document_id.clone(),
        other => panic!("expected ingested, got {:?}", other),
    };
    assert!(harness.names_in(BlobArea::Inbox).await.is_empty());

    let reconciler = harness.reconciler(ReconcileConfig::default());
    let report = reconciler.run_cycle(&CancellationToken::new()).unwrap();
    assert_eq!(report.indexed, 2);

    let searcher = harness.searcher();
    searcher.reload().unwrap();

    let all = searcher
        .search("consulting", &SearchOptions::new().with_limit(10))
        .unwrap();
    assert_eq!(all.len(), 2);

    let scoped = searcher
        .search(
            "consulting",
            &SearchOptions::new().with_limit(10).with_tenant("acme"),
        )
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].document_id, invoice_id);
    assert_eq!(scoped[0].title, "invoice");
}

#[tokio::test]
async fn test_scheduled_reconcile_job_backs_off_when_unhealthy() {
    let harness = TestHarness::new().await;
    seed_unindexed_documents(&harness.storage, "acme", 1);
    let reconciler = Arc::new(harness.reconciler(ReconcileConfig::default()));

    let mut scheduler = SchedulerService::new(SchedulerConfig::default());
    register_reconcile_job(&mut scheduler, reconciler, &IndexingSettings::default()).unwrap();

    harness.backend.set_healthy(false);
    let result = scheduler.trigger(RECONCILE_JOB).await.unwrap();
    assert!(matches!(result, JobResult::Failed(_)));
    let status = scheduler.registry().get_status(RECONCILE_JOB).unwrap();
    assert!(status.is_backing_off());

    harness.backend.set_healthy(true);
    let result = scheduler.trigger(RECONCILE_JOB).await.unwrap();
    assert_eq!(result, JobResult::Success);
    let status = scheduler.registry().get_status(RECONCILE_JOB).unwrap();
    assert!(!status.is_backing_off());
    assert_eq!(harness.storage.get_stats().unwrap().needs_indexing_count, 0);
}
