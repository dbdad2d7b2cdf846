//! Scheduled search-index reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use docket_indexing::Reconciler;
use docket_types::IndexingSettings;

use crate::error::SchedulerError;
use crate::registry::JobOutput;
use crate::scheduler::{JobSchedule, SchedulerService};

pub const RECONCILE_JOB: &str = "reconcile";

/// Every `interval_minutes` after `startup_delay_secs`, backing off to
/// four intervals while the backend is down.
pub fn reconcile_schedule(settings: &IndexingSettings) -> JobSchedule {
    let interval = Duration::from_secs(settings.interval_minutes.saturating_mul(60));
    JobSchedule::every(interval)
        .with_initial_delay(Duration::from_secs(settings.startup_delay_secs))
        .with_max_backoff(interval.saturating_mul(4))
}

/// Register the reconciliation job.
///
/// The cycle is synchronous (RocksDB and Tantivy), so it runs on the
/// blocking pool.
pub fn register_reconcile_job(
    scheduler: &mut SchedulerService,
    reconciler: Arc<Reconciler>,
    settings: &IndexingSettings,
) -> Result<(), SchedulerError> {
    scheduler.register_job(RECONCILE_JOB, reconcile_schedule(settings), move |token| {
        let reconciler = reconciler.clone();
        async move {
            let report = tokio::task::spawn_blocking(move || reconciler.run_cycle(&token))
                .await
                .map_err(|e| format!("reconcile task failed: {}", e))?
                .map_err(|e| e.to_string())?;
            debug!(candidates = report.candidates, "Reconcile job finished");
            Ok::<_, String>(
                JobOutput::new()
                    .with_items_processed(report.candidates)
                    .with_metadata("indexed", report.indexed)
                    .with_metadata("failed", report.failed)
                    .with_metadata("stale", report.stale)
                    .with_metadata("removed", report.removed),
            )
        }
    })
}
