//! Interval scheduler service.
//!
//! Each registered job gets its own task: wait the initial delay, then run
//! on a fixed interval. After a failed run the next delay comes from an
//! exponential back-off capped at the job's `max_backoff`; a successful run
//! resets it. Every wait races the shared shutdown token.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backoff::{backoff::Backoff, ExponentialBackoff};
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;
use crate::overlap::OverlapGuard;
use crate::registry::{JobOutput, JobRegistry, JobResult};

/// Boxed future returned by a job function.
pub type JobFuture = Pin<Box<dyn Future<Output = Result<JobOutput, String>> + Send>>;

type JobFn = Arc<dyn Fn(CancellationToken) -> JobFuture + Send + Sync>;

/// Timing for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSchedule {
    /// Wait before the first run
    pub initial_delay: Duration,
    /// Wait between runs after a success
    pub interval: Duration,
    /// Upper bound for the wait after consecutive failures
    pub max_backoff: Duration,
}

impl JobSchedule {
    /// Run every `interval`, starting immediately, backing off up to 8x.
    pub fn every(interval: Duration) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            interval,
            max_backoff: interval.saturating_mul(8),
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    fn validate(&self, job: &str) -> Result<(), SchedulerError> {
        let invalid = |reason: &str| SchedulerError::InvalidSchedule {
            job: job.to_string(),
            reason: reason.to_string(),
        };
        if self.interval.is_zero() {
            return Err(invalid("interval must be > 0"));
        }
        if self.max_backoff < self.interval {
            return Err(invalid("max_backoff must be >= interval"));
        }
        Ok(())
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.interval,
            initial_interval: self.interval,
            max_interval: self.max_backoff,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

struct ScheduledJob {
    schedule: JobSchedule,
    job: JobFn,
    guard: OverlapGuard,
}

/// Runs registered jobs until shutdown.
pub struct SchedulerService {
    config: SchedulerConfig,
    registry: Arc<JobRegistry>,
    jobs: HashMap<String, Arc<ScheduledJob>>,
    handles: Vec<(String, JoinHandle<()>)>,
    shutdown_token: CancellationToken,
    is_running: bool,
}

impl SchedulerService {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(JobRegistry::new()),
            jobs: HashMap::new(),
            handles: Vec::new(),
            shutdown_token: CancellationToken::new(),
            is_running: false,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    /// Token cancelled on shutdown. Jobs receive clones of it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Register a named interval job.
    ///
    /// Jobs registered while the scheduler is running start immediately.
    pub fn register_job<F, Fut>(
        &mut self,
        name: &str,
        schedule: JobSchedule,
        job_fn: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutput, String>> + Send + 'static,
    {
        schedule.validate(name)?;
        if self.jobs.contains_key(name) {
            return Err(SchedulerError::DuplicateJob(name.to_string()));
        }

        let job: JobFn = Arc::new(move |token: CancellationToken| -> JobFuture {
            Box::pin(job_fn(token))
        });
        let scheduled = Arc::new(ScheduledJob {
            schedule,
            job,
            guard: OverlapGuard::new(),
        });
        self.registry.register(name, schedule.interval.as_secs());
        self.jobs.insert(name.to_string(), scheduled.clone());
        info!(
            job = %name,
            interval_secs = schedule.interval.as_secs(),
            initial_delay_secs = schedule.initial_delay.as_secs(),
            "Job registered"
        );

        if self.is_running {
            self.spawn(name, scheduled);
        }
        Ok(())
    }

    /// Start every registered job loop.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.is_running {
            return Err(SchedulerError::AlreadyRunning);
        }
        self.is_running = true;

        let jobs: Vec<(String, Arc<ScheduledJob>)> = self
            .jobs
            .iter()
            .map(|(name, job)| (name.clone(), job.clone()))
            .collect();
        for (name, job) in jobs {
            self.spawn(&name, job);
        }
        info!(jobs = self.jobs.len(), "Scheduler started");
        Ok(())
    }

    fn spawn(&mut self, name: &str, job: Arc<ScheduledJob>) {
        let handle = tokio::spawn(run_loop(
            name.to_string(),
            job,
            self.registry.clone(),
            self.shutdown_token.clone(),
        ));
        self.handles.push((name.to_string(), handle));
    }

    /// Run a job once, now, outside its schedule.
    ///
    /// Shares the job's overlap guard, so a trigger that lands during a
    /// scheduled run returns `Skipped` without running.
    pub async fn trigger(&self, name: &str) -> Result<JobResult, SchedulerError> {
        let job = self
            .jobs
            .get(name)
            .ok_or_else(|| SchedulerError::JobNotFound(name.to_string()))?;
        let (result, _) = run_once(name, job, &self.registry, &self.shutdown_token).await;
        Ok(result)
    }

    /// Cancel all jobs and wait for running ones up to the shutdown timeout.
    ///
    /// Loops still running at the deadline are aborted.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if !self.is_running {
            return Err(SchedulerError::NotRunning);
        }
        info!("Scheduler shutting down");
        self.shutdown_token.cancel();
        self.is_running = false;

        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout();
        for (name, mut handle) in self.handles.drain(..) {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => debug!(job = %name, "Job loop stopped"),
                Ok(Err(e)) => warn!(job = %name, error = %e, "Job loop ended abnormally"),
                Err(_) => {
                    warn!(job = %name, "Job did not stop before shutdown timeout, aborting");
                    handle.abort();
                }
            }
        }
        info!("Scheduler stopped");
        Ok(())
    }
}

/// Run one job invocation under its overlap guard and record it.
///
/// Returns the result and whether the back-off should advance.
async fn run_once(
    name: &str,
    job: &ScheduledJob,
    registry: &JobRegistry,
    token: &CancellationToken,
) -> (JobResult, bool) {
    let Some(_run) = job.guard.try_acquire() else {
        info!(job = %name, "Previous run still active, skipping");
        let result = JobResult::Skipped("previous run still active".to_string());
        registry.record_complete(name, result.clone(), 0);
        return (result, false);
    };

    registry.record_start(name);
    let started = Instant::now();
    let outcome = (job.job)(token.clone()).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(output) => {
            let result = output.result();
            debug!(job = %name, duration_ms, "Job completed");
            registry.record_complete_with_metadata(name, result.clone(), duration_ms, output.metadata);
            (result, false)
        }
        Err(e) => {
            warn!(job = %name, duration_ms, error = %e, "Job failed");
            let result = JobResult::Failed(e);
            registry.record_complete(name, result.clone(), duration_ms);
            (result, true)
        }
    }
}

async fn run_loop(
    name: String,
    job: Arc<ScheduledJob>,
    registry: Arc<JobRegistry>,
    token: CancellationToken,
) {
    let schedule = job.schedule;
    let mut backoff = schedule.backoff();
    let mut delay = schedule.initial_delay;

    loop {
        if let Ok(wait) = chrono::Duration::from_std(delay) {
            registry.set_next_run(&name, Utc::now() + wait);
        }
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        let (_, failed) = run_once(&name, &job, &registry, &token).await;
        if token.is_cancelled() {
            break;
        }

        delay = if failed {
            let next = backoff.next_backoff().unwrap_or(schedule.max_backoff);
            info!(job = %name, retry_in_ms = next.as_millis() as u64, "Backing off after failure");
            next
        } else {
            backoff.reset();
            schedule.interval
        };
    }
    debug!(job = %name, "Job loop exiting");
}
