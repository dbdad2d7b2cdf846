//! Reconciler configuration.

use docket_types::IndexingSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Documents per `index_batch` call
    pub batch_size: usize,
    /// Upper bound on candidates fetched per cycle
    pub max_documents_per_cycle: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::from_settings(&IndexingSettings::default())
    }
}

impl ReconcileConfig {
    pub fn from_settings(settings: &IndexingSettings) -> Self {
        Self {
            batch_size: settings.batch_size.max(1),
            max_documents_per_cycle: settings.max_documents_per_cycle.max(1),
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }
}
