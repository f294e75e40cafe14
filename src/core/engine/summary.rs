//! Run summary and reporting

use super::engine::{DocumentReport, DocumentStatus};
use crate::core::dispatch::DispatchStats;
use std::time::Duration;
use uuid::Uuid;

/// Summary of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifier used to correlate the run's log records
    pub run_id: Uuid,

    /// Expected document count announced by the source
    pub expected: Option<u64>,

    /// Documents received from the source, valid or not
    pub documents_received: usize,

    /// Documents whose rules were applied
    pub documents_processed: usize,

    /// Documents whose template has no rule set
    pub documents_without_rules: usize,

    /// Inputs that could not be read as documents
    pub documents_invalid: usize,

    /// Documents whose processing task failed
    pub documents_failed: usize,

    pub records_emitted: usize,
    pub records_failed: usize,
    pub rules_fired: usize,
    pub rules_skipped: usize,
    pub field_errors: usize,
    pub expression_errors: usize,

    /// Channels that received rows or sentinels
    pub channels: Vec<String>,

    /// Whether the end-of-stream sentinels were sent
    pub completed: bool,

    /// Whether the run stopped on a shutdown signal
    pub interrupted: bool,

    pub duration: Duration,
    pub errors: Vec<RunError>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            expected: None,
            documents_received: 0,
            documents_processed: 0,
            documents_without_rules: 0,
            documents_invalid: 0,
            documents_failed: 0,
            records_emitted: 0,
            records_failed: 0,
            rules_fired: 0,
            rules_skipped: 0,
            field_errors: 0,
            expression_errors: 0,
            channels: Vec::new(),
            completed: false,
            interrupted: false,
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_error(&mut self, error: RunError) {
        self.errors.push(error);
    }

    /// Folds one document report into the totals
    pub fn record_document(&mut self, report: &DocumentReport) {
        match report.status {
            DocumentStatus::Processed => self.documents_processed += 1,
            DocumentStatus::NoRules => self.documents_without_rules += 1,
            DocumentStatus::Invalid => self.documents_invalid += 1,
        }
        self.records_emitted += report.records_emitted;
        self.records_failed += report.records_failed;
        self.rules_fired += report.stats.rules_fired;
        self.rules_skipped += report.stats.rules_skipped;
        self.field_errors += report.stats.field_errors;
        self.expression_errors += report.stats.condition_errors + report.stats.field_errors;
    }

    /// Copies dispatcher-level counters the per-document reports cannot see
    pub fn record_dispatch(&mut self, stats: &DispatchStats, channels: Vec<String>) {
        if stats.dropped > 0 {
            self.add_error(RunError::new(
                RunErrorKind::Sink,
                format!("{} record(s) arrived after end of stream and were dropped", stats.dropped),
            ));
        }
        self.channels = channels;
    }

    /// No failed records, documents or errors
    pub fn is_successful(&self) -> bool {
        self.documents_failed == 0 && self.records_failed == 0 && self.errors.is_empty()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            run_id = %self.run_id,
            expected = ?self.expected,
            received = self.documents_received,
            processed = self.documents_processed,
            without_rules = self.documents_without_rules,
            invalid = self.documents_invalid,
            failed = self.documents_failed,
            records_emitted = self.records_emitted,
            records_failed = self.records_failed,
            rules_fired = self.rules_fired,
            rules_skipped = self.rules_skipped,
            expression_errors = self.expression_errors,
            completed = self.completed,
            interrupted = self.interrupted,
            duration_ms = self.duration.as_millis() as u64,
            "Run finished"
        );

        if !self.errors.is_empty() {
            tracing::warn!(
                run_id = %self.run_id,
                error_count = self.errors.len(),
                "Run finished with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    error_type = ?error.kind,
                    message = %error.message,
                    context = ?error.context,
                    "Run error"
                );
            }
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Error recorded during a run
#[derive(Debug, Clone)]
pub struct RunError {
    pub kind: RunErrorKind,
    pub message: String,
    pub context: Option<String>,
}

impl RunError {
    pub fn new(kind: RunErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Category of a run error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunErrorKind {
    /// Rule definitions could not be loaded
    Rules,
    /// The document source failed
    Source,
    /// Delivery to the sink failed
    Sink,
    /// Start/end protocol misuse
    Protocol,
    /// A processing task panicked or was cancelled
    Task,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::completion::CompletionStatus;
    use crate::core::transform::TraversalStats;

    fn report(status: DocumentStatus, emitted: usize, failed: usize) -> DocumentReport {
        DocumentReport {
            template_id: None,
            instance_id: None,
            status,
            records_emitted: emitted,
            records_failed: failed,
            stats: TraversalStats {
                elements_visited: 3,
                rules_fired: emitted + failed,
                rules_skipped: 1,
                condition_errors: 1,
                field_errors: 2,
            },
            completion: CompletionStatus::Pending(1),
        }
    }

    #[test]
    fn test_record_document_totals() {
        let mut summary = RunSummary::new();
        summary.record_document(&report(DocumentStatus::Processed, 2, 0));
        summary.record_document(&report(DocumentStatus::NoRules, 0, 0));
        summary.record_document(&report(DocumentStatus::Processed, 1, 1));

        assert_eq!(summary.documents_processed, 2);
        assert_eq!(summary.documents_without_rules, 1);
        assert_eq!(summary.records_emitted, 3);
        assert_eq!(summary.records_failed, 1);
        assert_eq!(summary.field_errors, 6);
        assert_eq!(summary.expression_errors, 9);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_dropped_rows_become_errors() {
        let mut summary = RunSummary::new();
        let stats = DispatchStats {
            dropped: 2,
            ..DispatchStats::default()
        };
        summary.record_dispatch(&stats, vec!["x".to_string()]);

        assert_eq!(summary.channels, vec!["x"]);
        assert_eq!(summary.errors[0].kind, RunErrorKind::Sink);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_empty_summary_is_successful() {
        let summary = RunSummary::default().with_duration(Duration::from_millis(5));
        assert!(summary.is_successful());
        assert_eq!(summary.duration, Duration::from_millis(5));
    }
}
