//! Scheduled inbox ingestion.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use docket_inbox::InboxProcessor;
use docket_types::InboxSettings;

use crate::error::SchedulerError;
use crate::registry::JobOutput;
use crate::scheduler::{JobSchedule, SchedulerService};

pub const INBOX_JOB: &str = "inbox";

/// Poll every `polling_interval_secs`, backing off to `max_backoff_secs`.
pub fn inbox_schedule(settings: &InboxSettings) -> JobSchedule {
    JobSchedule::every(Duration::from_secs(settings.polling_interval_secs))
        .with_max_backoff(Duration::from_secs(settings.max_backoff_secs))
}

/// Register the inbox job.
///
/// A cycle that fails as a whole (listing failed) is reported as a job
/// failure, which makes the scheduler back off before the next attempt.
pub fn register_inbox_job(
    scheduler: &mut SchedulerService,
    processor: Arc<InboxProcessor>,
    settings: &InboxSettings,
) -> Result<(), SchedulerError> {
    scheduler.register_job(INBOX_JOB, inbox_schedule(settings), move |token| {
        let processor = processor.clone();
        async move {
            let report = processor.run_cycle(&token).await.map_err(|e| e.to_string())?;
            if report.disabled {
                return Ok(JobOutput::skipped("inbox processor disabled"));
            }
            if report.skipped {
                return Ok(JobOutput::skipped("inbox cycle already running"));
            }
            debug!(listed = report.listed, "Inbox job finished");
            Ok::<_, String>(
                JobOutput::new()
                    .with_items_processed(report.listed)
                    .with_metadata("ingested", report.ingested)
                    .with_metadata("duplicates", report.duplicates)
                    .with_metadata("failed", report.failed)
                    .with_metadata("retained", report.retained),
            )
        }
    })
}
