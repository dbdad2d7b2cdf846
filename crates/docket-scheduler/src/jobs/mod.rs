//! Job definitions registered by the daemon.
//!
//! - **inbox**: one ingestion cycle per polling interval
//! - **reconcile**: one search-index reconciliation cycle per indexing interval

pub mod inbox;
pub mod reconcile;

pub use inbox::{inbox_schedule, register_inbox_job, INBOX_JOB};
pub use reconcile::{reconcile_schedule, register_reconcile_job, RECONCILE_JOB};
