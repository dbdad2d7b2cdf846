//! Audit record for bulk operations.
//!
//! One `BatchOutcome` is written per reconciliation batch and per inbox
//! cycle so bulk work can be inspected after the fact.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Which bulk operation produced the outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    /// One inbox ingestion cycle
    InboxCycle,
    /// One `index_batch` call during reconciliation
    IndexBatch,
    /// Removal of soft-deleted documents from the index
    IndexRemoval,
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::InboxCycle => write!(f, "inbox_cycle"),
            BatchKind::IndexBatch => write!(f, "index_batch"),
            BatchKind::IndexRemoval => write!(f, "index_removal"),
        }
    }
}

/// Counts and timing of one bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Unique identifier (ULID, sortable by start time)
    pub batch_id: String,

    pub kind: BatchKind,

    pub processed: u64,

    pub succeeded: u64,

    pub failed: u64,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,

    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchOutcome {
    /// Start a new outcome with zeroed counters.
    pub fn start(kind: BatchKind) -> Self {
        Self {
            batch_id: Ulid::new().to_string(),
            kind,
            processed: 0,
            succeeded: 0,
            failed: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn record_success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    /// Items seen but neither succeeded nor failed (skipped).
    pub fn record_skip(&mut self) {
        self.processed += 1;
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
