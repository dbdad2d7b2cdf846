//! Job registry for tracking execution status.
//!
//! The scheduler writes to the registry around every run; the daemon reads
//! it to report job health.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a job execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobResult {
    /// Job completed successfully
    Success,
    /// Job failed with an error message
    Failed(String),
    /// Job did not run (another run held the overlap guard, or the job
    /// reported nothing to do)
    Skipped(String),
}

/// What a job run reports back to the registry.
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    /// Arbitrary key-value metadata from the job run.
    pub metadata: HashMap<String, String>,
    /// Set when the job decided not to do any work
    pub skipped: Option<String>,
}

impl JobOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: Some(reason.into()),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    pub fn with_items_processed(self, count: usize) -> Self {
        self.with_metadata("items_processed", count)
    }

    /// Registry result for a run that returned this output.
    pub fn result(&self) -> JobResult {
        match &self.skipped {
            Some(reason) => JobResult::Skipped(reason.clone()),
            None => JobResult::Success,
        }
    }
}

/// Status of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    /// Regular interval between runs
    pub interval_secs: u64,
    /// When the job last finished (if ever)
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_result: Option<JobResult>,
    /// When the job is next due
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
    /// Failures since the last success; drives the back-off
    pub consecutive_failures: u32,
    pub is_running: bool,
    #[serde(default)]
    pub last_run_metadata: HashMap<String, String>,
}

impl JobStatus {
    pub fn new(job_name: String, interval_secs: u64) -> Self {
        Self {
            job_name,
            interval_secs,
            last_run: None,
            last_duration_ms: None,
            last_result: None,
            next_run: None,
            run_count: 0,
            error_count: 0,
            consecutive_failures: 0,
            is_running: false,
            last_run_metadata: HashMap::new(),
        }
    }

    /// Whether the job is currently backing off after failures.
    pub fn is_backing_off(&self) -> bool {
        self.consecutive_failures > 0
    }
}

/// Thread-safe registry of job status.
///
/// # Example
///
/// ```
/// use docket_scheduler::{JobRegistry, JobResult};
///
/// let registry = JobRegistry::new();
/// registry.register("inbox", 30);
///
/// registry.record_start("inbox");
/// assert!(registry.is_running("inbox"));
///
/// registry.record_complete("inbox", JobResult::Success, 120);
/// assert!(!registry.is_running("inbox"));
/// ```
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a job, replacing any previous status with the same name.
    pub fn register(&self, job_name: &str, interval_secs: u64) {
        self.write().insert(
            job_name.to_string(),
            JobStatus::new(job_name.to_string(), interval_secs),
        );
    }

    pub fn record_start(&self, job_name: &str) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = true;
        }
    }

    /// Record a finished run.
    pub fn record_complete(&self, job_name: &str, result: JobResult, duration_ms: u64) {
        self.record_complete_with_metadata(job_name, result, duration_ms, HashMap::new());
    }

    /// Record a finished run along with the metadata it reported.
    ///
    /// Failures bump both error counters; a success resets the
    /// consecutive-failure count. Skips leave it untouched.
    pub fn record_complete_with_metadata(
        &self,
        job_name: &str,
        result: JobResult,
        duration_ms: u64,
        metadata: HashMap<String, String>,
    ) {
        let mut jobs = self.write();
        if let Some(status) = jobs.get_mut(job_name) {
            status.is_running = false;
            status.last_run = Some(Utc::now());
            status.last_duration_ms = Some(duration_ms);
            status.run_count += 1;
            match &result {
                JobResult::Failed(_) => {
                    status.error_count += 1;
                    status.consecutive_failures += 1;
                }
                JobResult::Success => status.consecutive_failures = 0,
                JobResult::Skipped(_) => {}
            }
            status.last_result = Some(result);
            status.last_run_metadata = metadata;
        }
    }

    pub fn set_next_run(&self, job_name: &str, next: DateTime<Utc>) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.next_run = Some(next);
        }
    }

    /// Returns `None` if the job is not registered.
    pub fn get_status(&self, job_name: &str) -> Option<JobStatus> {
        self.read().get(job_name).cloned()
    }

    /// Status of every job, sorted by name.
    pub fn get_all_status(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        all
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.read()
            .get(job_name)
            .map(|s| s.is_running)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_registry_register_and_get() {
        let registry = JobRegistry::new();
        registry.register("inbox", 30);

        let status = registry.get_status("inbox").unwrap();
        assert_eq!(status.job_name, "inbox");
        assert_eq!(status.interval_secs, 30);
        assert_eq!(status.run_count, 0);
        assert!(!status.is_running);
        assert!(!status.is_backing_off());
    }

    #[test]
    fn test_registry_record_complete_success() {
        let registry = JobRegistry::new();
        registry.register("reconcile", 300);
        registry.record_start("reconcile");

        registry.record_complete("reconcile", JobResult::Success, 1500);

        let status = registry.get_status("reconcile").unwrap();
        assert!(!status.is_running);
        assert!(status.last_run.is_some());
        assert_eq!(status.last_duration_ms, Some(1500));
        assert_eq!(status.run_count, 1);
        assert_eq!(status.error_count, 0);
        assert_eq!(status.last_result, Some(JobResult::Success));
    }

    #[test]
    fn test_failures_then_success_reset_streak() {
        let registry = JobRegistry::new();
        registry.register("reconcile", 300);

        registry.record_complete("reconcile", JobResult::Failed("index offline".into()), 10);
        registry.record_complete("reconcile", JobResult::Failed("index offline".into()), 10);
        let status = registry.get_status("reconcile").unwrap();
        assert_eq!(status.error_count, 2);
        assert_eq!(status.consecutive_failures, 2);
        assert!(status.is_backing_off());

        registry.record_complete("reconcile", JobResult::Skipped("overlap".into()), 0);
        assert_eq!(
            registry.get_status("reconcile").unwrap().consecutive_failures,
            2
        );

        registry.record_complete("reconcile", JobResult::Success, 10);
        let status = registry.get_status("reconcile").unwrap();
        assert_eq!(status.error_count, 2);
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.run_count, 4);
    }

    #[test]
    fn test_registry_metadata() {
        let registry = JobRegistry::new();
        registry.register("inbox", 30);

        let output = JobOutput::new()
            .with_items_processed(4)
            .with_metadata("failed", 1);
        registry.record_complete_with_metadata("inbox", output.result(), 20, output.metadata);

        let status = registry.get_status("inbox").unwrap();
        assert_eq!(
            status.last_run_metadata.get("items_processed"),
            Some(&"4".to_string())
        );
        assert_eq!(status.last_run_metadata.get("failed"), Some(&"1".to_string()));
    }

    #[test]
    fn test_skipped_output_result() {
        let output = JobOutput::skipped("disabled");
        assert_eq!(output.result(), JobResult::Skipped("disabled".into()));
        assert_eq!(JobOutput::new().result(), JobResult::Success);
    }

    #[test]
    fn test_registry_all_status_sorted() {
        let registry = JobRegistry::new();
        registry.register("reconcile", 300);
        registry.register("inbox", 30);

        let names: Vec<String> = registry
            .get_all_status()
            .into_iter()
            .map(|s| s.job_name)
            .collect();
        assert_eq!(names, vec!["inbox", "reconcile"]);
    }

    #[test]
    fn test_registry_unknown_job() {
        let registry = JobRegistry::new();

        assert!(registry.get_status("unknown").is_none());
        assert!(!registry.is_running("unknown"));

        registry.record_start("unknown");
        registry.record_complete("unknown", JobResult::Success, 100);
        registry.set_next_run("unknown", Utc::now());
    }

    #[test]
    fn test_registry_thread_safety() {
        let registry = Arc::new(JobRegistry::new());
        registry.register("inbox", 30);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    registry.record_start("inbox");
                    registry.record_complete("inbox", JobResult::Success, 1);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.get_status("inbox").unwrap().run_count, 8);
    }
}
