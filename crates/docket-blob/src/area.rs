//! Named storage areas and their container names.

use std::fmt;

use docket_types::InboxSettings;
use serde::{Deserialize, Serialize};

use crate::error::{BlobError, BlobResult};

/// The four areas an ingested file passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobArea {
    /// New files awaiting ingestion
    Inbox,
    /// Sources that were ingested
    Processed,
    /// Sources that failed, annotated with the error
    Failed,
    /// Long-term content addressed by tenant/type/date/document id
    Documents,
}

impl BlobArea {
    pub const ALL: [BlobArea; 4] = [
        BlobArea::Inbox,
        BlobArea::Processed,
        BlobArea::Failed,
        BlobArea::Documents,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlobArea::Inbox => "inbox",
            BlobArea::Processed => "processed",
            BlobArea::Failed => "failed",
            BlobArea::Documents => "documents",
        }
    }
}

impl fmt::Display for BlobArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps each area onto a configured container name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaLayout {
    inbox: String,
    processed: String,
    failed: String,
    documents: String,
}

impl Default for AreaLayout {
    fn default() -> Self {
        Self::from_settings(&InboxSettings::default())
    }
}

impl AreaLayout {
    pub fn new(
        inbox: impl Into<String>,
        processed: impl Into<String>,
        failed: impl Into<String>,
        documents: impl Into<String>,
    ) -> BlobResult<Self> {
        let layout = Self {
            inbox: inbox.into(),
            processed: processed.into(),
            failed: failed.into(),
            documents: documents.into(),
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Layout from the inbox settings. Settings are validated at startup.
    pub fn from_settings(settings: &InboxSettings) -> Self {
        Self {
            inbox: settings.container_name.clone(),
            processed: settings.processed_container_name.clone(),
            failed: settings.failed_container_name.clone(),
            documents: settings.documents_container_name.clone(),
        }
    }

    pub fn container(&self, area: BlobArea) -> &str {
        match area {
            BlobArea::Inbox => &self.inbox,
            BlobArea::Processed => &self.processed,
            BlobArea::Failed => &self.failed,
            BlobArea::Documents => &self.documents,
        }
    }

    fn validate(&self) -> BlobResult<()> {
        let mut seen: Vec<&str> = Vec::with_capacity(4);
        for area in BlobArea::ALL {
            let name = self.container(area);
            if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
                return Err(BlobError::Config(format!(
                    "Invalid container name for {} area: {:?}",
                    area, name
                )));
            }
            if seen.contains(&name) {
                return Err(BlobError::Config(format!(
                    "Container {:?} is used by more than one area",
                    name
                )));
            }
            seen.push(name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_matches_area_names() {
        let layout = AreaLayout::default();
        for area in BlobArea::ALL {
            assert_eq!(layout.container(area), area.as_str());
        }
    }

    #[test]
    fn test_layout_rejects_shared_container() {
        let result = AreaLayout::new("inbox", "inbox", "failed", "documents");
        assert!(matches!(result, Err(BlobError::Config(_))));
    }

    #[test]
    fn test_layout_rejects_nested_container() {
        assert!(AreaLayout::new("in/box", "processed", "failed", "documents").is_err());
        assert!(AreaLayout::new(".meta", "processed", "failed", "documents").is_err());
    }
}
