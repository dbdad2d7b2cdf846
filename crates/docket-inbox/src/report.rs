//! Per-cycle summary.

use docket_types::BatchOutcome;

/// What happened to a single inbox item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// New document persisted, source moved to processed
    Ingested { document_id: String },
    /// Content already stored for this tenant, source moved to processed
    Duplicate { document_id: String },
    /// Processing failed, source moved to failed
    Failed { error: String },
    /// Left in the inbox for the next cycle
    Retained { error: String },
}

/// Summary of one inbox cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Items taken from the inbox listing
    pub listed: usize,
    pub ingested: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub retained: usize,
    /// Processor disabled by configuration
    pub disabled: bool,
    /// Another cycle was already running
    pub skipped: bool,
    pub cancelled: bool,
    /// Per-item results in processing order
    pub items: Vec<(String, ItemOutcome)>,
    /// Audit record written for the cycle, if any items were seen
    pub batch: Option<BatchOutcome>,
}

impl CycleReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub(crate) fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, name: &str, outcome: ItemOutcome) {
        match &outcome {
            ItemOutcome::Ingested { .. } => self.ingested += 1,
            ItemOutcome::Duplicate { .. } => self.duplicates += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
            ItemOutcome::Retained { .. } => self.retained += 1,
        }
        self.items.push((name.to_string(), outcome));
    }

    /// Items that left the inbox this cycle.
    pub fn moved(&self) -> usize {
        self.ingested + self.duplicates + self.failed
    }

    pub fn outcome_for(&self, name: &str) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, outcome)| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_counts() {
        let mut report = CycleReport::new();
        report.record(
            "a.txt",
            ItemOutcome::Ingested {
                document_id: "01A".into(),
            },
        );
        report.record(
            "b.pdf",
            ItemOutcome::Failed {
                error: "bad header".into(),
            },
        );
        report.record(
            "c.txt",
            ItemOutcome::Retained {
                error: "move failed".into(),
            },
        );

        assert_eq!(report.moved(), 2);
        assert_eq!(report.retained, 1);
        assert!(matches!(
            report.outcome_for("b.pdf"),
            Some(ItemOutcome::Failed { .. })
        ));
        assert!(report.outcome_for("missing").is_none());
    }
}
