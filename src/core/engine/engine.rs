//! Per-run engine context
//!
//! [`Engine`] owns the rule repository, the dispatcher and the completion
//! tracker of one run. Nothing is global, so independent runs can coexist.

use crate::adapters::rules::RuleSource;
use crate::adapters::sink::OutputSink;
use crate::config::OutputConfig;
use crate::core::completion::{CompletionStatus, CompletionTracker};
use crate::core::dispatch::OutputDispatcher;
use crate::core::rules::RuleRepository;
use crate::core::transform::{traverse, TraversalStats};
use crate::domain::document::DocumentNode;
use crate::domain::errors::RuleError;
use crate::domain::ids::TemplateId;
use crate::domain::{Ehr2RowError, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// How a document was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    /// Rules were applied
    Processed,
    /// No rule set is defined for the document's template
    NoRules,
    /// The document could not be processed at all
    Invalid,
}

/// Result of processing one document
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub template_id: Option<TemplateId>,
    pub instance_id: Option<String>,
    pub status: DocumentStatus,
    pub records_emitted: usize,
    pub records_failed: usize,
    pub stats: TraversalStats,
    pub completion: CompletionStatus,
}

/// Rule repository, dispatcher and tracker of one run
pub struct Engine {
    rules: RuleRepository,
    dispatcher: Arc<OutputDispatcher>,
    tracker: CompletionTracker,
}

impl Engine {
    /// Builds an engine whose dispatcher uses the channel settings of `output`
    pub fn new(
        rule_source: Arc<dyn RuleSource + Send + Sync>,
        sink: Arc<dyn OutputSink + Send + Sync>,
        output: &OutputConfig,
    ) -> Self {
        let dispatcher = OutputDispatcher::new(sink, output.default_queue.clone())
            .with_default_channels(output.default_queues.iter().cloned());
        Self::with_parts(RuleRepository::new(rule_source), Arc::new(dispatcher))
    }

    pub fn with_parts(rules: RuleRepository, dispatcher: Arc<OutputDispatcher>) -> Self {
        let tracker = CompletionTracker::new(dispatcher.clone());
        Self {
            rules,
            dispatcher,
            tracker,
        }
    }

    /// Seeds the number of documents this run will deliver
    ///
    /// # Errors
    ///
    /// See [`CompletionTracker::set_expected`].
    pub async fn start(&self, expected: u64) -> Result<CompletionStatus> {
        self.tracker.set_expected(expected).await
    }

    /// Transforms one document and dispatches its records
    ///
    /// Missing rules and per-record failures are reported in the
    /// [`DocumentReport`]; the document is counted as processed in every case
    /// except a rule source failure.
    ///
    /// # Errors
    ///
    /// Returns a source failure when the rule set could not be loaded, or the
    /// dispatcher's error if the shutdown triggered by this document fails.
    pub async fn process_document(&self, document: &Value) -> Result<DocumentReport> {
        let started = Instant::now();
        let node = DocumentNode::new(document);
        let instance_id = node.instance_id();

        let Some(template_id) = node.template_id() else {
            tracing::warn!(instance_id = ?instance_id, "Document has no id, skipped");
            let completion = self.tracker.on_document_processed().await?;
            return Ok(DocumentReport {
                template_id: None,
                instance_id,
                status: DocumentStatus::Invalid,
                records_emitted: 0,
                records_failed: 0,
                stats: TraversalStats::default(),
                completion,
            });
        };

        crate::log_document_start!(&template_id, &instance_id);

        let rule_set = match self.rules.resolve(&template_id).await {
            Ok(rule_set) => Some(rule_set),
            Err(Ehr2RowError::Rule(RuleError::NotFound(_))) => {
                tracing::warn!(
                    template_id = %template_id,
                    instance_id = ?instance_id,
                    "No rules for template, document produces no records"
                );
                None
            }
            Err(e) => return Err(e),
        };

        let mut report = DocumentReport {
            template_id: Some(template_id.clone()),
            instance_id,
            status: DocumentStatus::NoRules,
            records_emitted: 0,
            records_failed: 0,
            stats: TraversalStats::default(),
            completion: CompletionStatus::Unseeded,
        };

        if let Some(rule_set) = rule_set {
            let output = traverse(document, &rule_set);
            report.status = DocumentStatus::Processed;
            report.stats = output.stats;

            for message in &output.messages {
                match self.dispatcher.send_row(message).await {
                    Ok(()) => report.records_emitted += 1,
                    Err(_) => report.records_failed += 1,
                }
            }
            crate::log_document_complete!(&template_id, report.records_emitted, started.elapsed());
        }

        report.completion = self.tracker.on_document_processed().await?;
        Ok(report)
    }

    /// Accounts for an input that could not be read as a document
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error if the shutdown triggered here fails.
    pub async fn skip_document(&self, origin: &str, reason: &str) -> Result<CompletionStatus> {
        tracing::warn!(origin = %origin, reason = %reason, "Invalid input skipped");
        self.tracker.on_document_processed().await
    }

    pub fn rules(&self) -> &RuleRepository {
        &self.rules
    }

    pub fn dispatcher(&self) -> &Arc<OutputDispatcher> {
        &self.dispatcher
    }

    pub fn tracker(&self) -> &CompletionTracker {
        &self.tracker
    }
}
