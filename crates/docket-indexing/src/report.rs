//! Per-cycle reconciliation report.

use docket_types::BatchOutcome;

/// What one reconciliation cycle did.
#[derive(Debug, Default, Clone)]
pub struct ReconcileReport {
    /// Documents that met the needs-indexing predicate
    pub candidates: usize,
    /// Confirmed by the backend and marked in the store
    pub indexed: usize,
    /// Not confirmed, or marking failed; retried next cycle
    pub failed: usize,
    /// Confirmed but modified mid-cycle; retried next cycle
    pub stale: usize,
    /// Soft-deleted documents removed from the index
    pub removed: usize,
    /// Stopped early on cancellation
    pub cancelled: bool,
    pub batches: Vec<BatchOutcome>,
}

impl ReconcileReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Documents left eligible for the next cycle.
    pub fn retry_count(&self) -> usize {
        self.candidates.saturating_sub(self.indexed)
    }

    pub fn has_updates(&self) -> bool {
        self.indexed > 0 || self.removed > 0
    }
}
