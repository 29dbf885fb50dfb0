//! Copy outcome and summary reporting

use crate::domain::{ErrorDetail, JobState};
use std::collections::BTreeMap;
use std::time::Duration;

/// How a copy run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The exporter reported END and every page was imported
    Completed,

    /// The job must end in `Error`
    Failed {
        /// Failure reason to record on the job
        reason: String,
        /// Captured underlying failure, if any
        error: Option<String>,
    },

    /// The job was ended externally (canceled or timed out)
    Canceled,
}

impl CopyOutcome {
    pub fn failed(reason: impl Into<String>, error: Option<String>) -> Self {
        CopyOutcome::Failed {
            reason: reason.into(),
            error,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, CopyOutcome::Completed)
    }

    /// Terminal state the worker should record, if it still owns the job
    pub fn final_state(&self) -> Option<JobState> {
        match self {
            CopyOutcome::Completed => Some(JobState::Complete),
            CopyOutcome::Failed { .. } => Some(JobState::Error),
            CopyOutcome::Canceled => None,
        }
    }
}

/// Summary of one copy run
#[derive(Debug, Clone, Default)]
pub struct CopySummary {
    /// Export pages processed
    pub pages_exported: u64,

    /// Items handed to the importer
    pub items_exported: u64,

    /// Imported item counts reported by the importer, by kind
    pub import_counts: BTreeMap<String, u64>,

    /// Item failures recorded by the executor
    pub errors: Vec<ErrorDetail>,

    /// Duration of the run
    pub duration: Duration,
}

impl CopySummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an importer's per-kind counts
    pub fn add_counts(&mut self, counts: &BTreeMap<String, u64>) {
        for (kind, count) in counts {
            *self.import_counts.entry(kind.clone()).or_insert(0) += count;
        }
    }

    /// Total imported items across kinds
    pub fn total_imported(&self) -> u64 {
        self.import_counts.values().sum()
    }

    /// Log the summary
    pub fn log_summary(&self, outcome: &CopyOutcome) {
        tracing::info!(
            pages = self.pages_exported,
            items_exported = self.items_exported,
            items_imported = self.total_imported(),
            error_count = self.errors.len(),
            duration_secs = self.duration.as_secs(),
            outcome = ?outcome,
            "Copy finished"
        );

        for error in &self.errors {
            tracing::warn!(
                item_id = %error.id,
                title = %error.title,
                message = %error.message,
                "Item error"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_counts_accumulates() {
        let mut summary = CopySummary::new();
        let mut page = BTreeMap::new();
        page.insert("photos".to_string(), 2);
        summary.add_counts(&page);
        summary.add_counts(&page);
        page.insert("albums".to_string(), 1);
        summary.add_counts(&page);

        assert_eq!(summary.import_counts["photos"], 6);
        assert_eq!(summary.import_counts["albums"], 1);
        assert_eq!(summary.total_imported(), 7);
    }

    #[test]
    fn test_outcome_final_state() {
        assert_eq!(CopyOutcome::Completed.final_state(), Some(JobState::Complete));
        assert_eq!(
            CopyOutcome::failed("boom", None).final_state(),
            Some(JobState::Error)
        );
        assert_eq!(CopyOutcome::Canceled.final_state(), None);
    }
}
