//! Background job scheduler for the docket daemon.
//!
//! Jobs run on fixed intervals with an optional initial delay. A failed run
//! pushes the next attempt out along a capped exponential back-off; a
//! successful run restores the regular interval.
//!
//! - Graceful shutdown via a shared `CancellationToken`
//! - Per-job status (last run, result, counts, metadata) via [`JobRegistry`]
//! - Scheduled and manually triggered runs of one job never overlap
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use docket_scheduler::{JobOutput, JobSchedule, SchedulerConfig, SchedulerService};
//!
//! let mut scheduler = SchedulerService::new(SchedulerConfig::default());
//! scheduler.register_job(
//!     "inbox",
//!     JobSchedule::every(Duration::from_secs(30)),
//!     |_token| async { Ok(JobOutput::new()) },
//! )?;
//! scheduler.start()?;
//! ```

mod config;
mod error;
mod overlap;
mod registry;
mod scheduler;

#[cfg(feature = "jobs")]
pub mod jobs;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use overlap::{OverlapGuard, RunGuard};
pub use registry::{JobOutput, JobRegistry, JobResult, JobStatus};
pub use scheduler::{JobFuture, JobSchedule, SchedulerService};
