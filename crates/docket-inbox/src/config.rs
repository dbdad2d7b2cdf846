//! Inbox cycle configuration.

use docket_types::{InboxSettings, ItemDefaults};

/// Runtime view of [`InboxSettings`] used by the processor.
#[derive(Debug, Clone)]
pub struct InboxConfig {
    /// When false a cycle returns without touching the blob store
    pub enabled: bool,
    /// Maximum items taken from the inbox per cycle
    pub batch_size: usize,
    /// Tenant and document type for items that carry neither
    pub defaults: ItemDefaults,
    /// Recorded as `created_by` on ingested documents
    pub system_user: String,
    /// Reuse an existing live document with the same tenant and hash
    pub dedup_by_content_hash: bool,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self::from_settings(&InboxSettings::default())
    }
}

impl InboxConfig {
    pub fn from_settings(settings: &InboxSettings) -> Self {
        Self {
            enabled: settings.enabled,
            batch_size: settings.batch_size.max(1),
            defaults: ItemDefaults::new(
                &settings.default_tenant_id,
                &settings.default_document_type_id,
            ),
            system_user: settings.system_user.clone(),
            dedup_by_content_hash: settings.dedup_by_content_hash,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup_by_content_hash = dedup;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings() {
        let settings = InboxSettings {
            batch_size: 3,
            default_tenant_id: "acme".to_string(),
            system_user: "ingest-bot".to_string(),
            ..Default::default()
        };
        let config = InboxConfig::from_settings(&settings);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.defaults.tenant_id, "acme");
        assert_eq!(config.defaults.document_type_id, "general");
        assert_eq!(config.system_user, "ingest-bot");
        assert!(config.enabled);
    }

    #[test]
    fn test_batch_size_floor() {
        assert_eq!(InboxConfig::default().with_batch_size(0).batch_size, 1);
    }
}
