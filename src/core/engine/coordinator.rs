//! Run coordinator - pulls messages from a document source and drives the engine
//!
//! Each document is processed in its own task; a semaphore bounds the number
//! in flight. The coordinator stops pulling on `End`, source exhaustion, a
//! shutdown signal or a fatal error, and always drains in-flight tasks before
//! returning.

use super::engine::{DocumentReport, Engine};
use super::summary::{RunError, RunErrorKind, RunSummary};
use crate::adapters::rules::create_rule_source;
use crate::adapters::sink::create_sink;
use crate::adapters::source::{create_document_source, DocumentSource};
use crate::config::Ehr2RowConfig;
use crate::core::completion::CompletionStatus;
use crate::domain::message::InboundMessage;
use crate::domain::{Ehr2RowError, Result};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};

type TaskResult = Result<DocumentReport>;

/// Drives one run from a document source to completion
pub struct RunCoordinator {
    engine: Arc<Engine>,
    source: Box<dyn DocumentSource>,
    limiter: Arc<Semaphore>,
    shutdown: watch::Receiver<bool>,
}

impl RunCoordinator {
    pub fn new(
        engine: Arc<Engine>,
        source: Box<dyn DocumentSource>,
        max_concurrent_documents: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            engine,
            source,
            limiter: Arc::new(Semaphore::new(max_concurrent_documents.max(1))),
            shutdown,
        }
    }

    /// Builds the rule source, sink, document source and engine from configuration
    ///
    /// # Errors
    ///
    /// Returns the first adapter that fails to initialise.
    pub async fn from_config(config: &Ehr2RowConfig, shutdown: watch::Receiver<bool>) -> Result<Self> {
        let rule_source = create_rule_source(&config.rules)?;
        let sink = create_sink(config).await?;
        let source = create_document_source(&config.input).await?;

        tracing::info!(
            rules = %rule_source.describe(),
            sink = sink.kind(),
            input = %source.describe(),
            "Run configured"
        );

        let engine = Arc::new(Engine::new(rule_source, sink, &config.output));
        Ok(Self::new(
            engine,
            source,
            config.processing.max_concurrent_documents,
            shutdown,
        ))
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Runs until the source ends or a shutdown is requested
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: a document source failure or a rule
    /// source failure. In-flight documents are drained first and no
    /// end-of-stream sentinels are sent for an aborted run.
    pub async fn run(mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::new();
        let mut tasks: JoinSet<TaskResult> = JoinSet::new();
        let mut fatal: Option<Ehr2RowError> = None;

        tracing::info!(run_id = %summary.run_id, input = %self.source.describe(), "Starting run");

        loop {
            while let Some(Some(joined)) = tasks.join_next().now_or_never() {
                record_task(joined, &mut summary, &mut fatal);
            }
            if fatal.is_some() {
                break;
            }
            if *self.shutdown.borrow() {
                summary.interrupted = true;
                break;
            }

            let next = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut self.shutdown) => {
                    summary.interrupted = true;
                    break;
                }
                next = self.source.next_message() => next,
            };

            match next {
                Ok(None) => {
                    tracing::info!("Document source exhausted");
                    break;
                }
                Ok(Some(InboundMessage::End)) => {
                    tracing::info!("End of input received");
                    break;
                }
                Ok(Some(InboundMessage::Start { expected })) => {
                    summary.expected = Some(expected);
                    if let Err(e) = self.engine.start(expected).await {
                        tracing::error!(error = %e, "Start message rejected");
                        summary.add_error(RunError::new(RunErrorKind::Protocol, e.to_string()));
                    }
                }
                Ok(Some(InboundMessage::Invalid { origin, reason })) => {
                    summary.documents_received += 1;
                    summary.documents_invalid += 1;
                    match self.engine.skip_document(&origin, &reason).await {
                        Ok(_) => {}
                        Err(e) => summary.add_error(
                            RunError::new(RunErrorKind::Sink, e.to_string()).with_context(origin),
                        ),
                    }
                }
                Ok(Some(InboundMessage::Document(document))) => {
                    summary.documents_received += 1;
                    let acquired = tokio::select! {
                        biased;
                        _ = wait_for_shutdown(&mut self.shutdown) => {
                            tracing::warn!("Shutdown requested while waiting for a processing slot, document not started");
                            summary.interrupted = true;
                            break;
                        }
                        acquired = self.limiter.clone().acquire_owned() => acquired,
                    };
                    let permit = match acquired {
                        Ok(permit) => permit,
                        Err(e) => {
                            fatal = Some(Ehr2RowError::Other(format!("Concurrency limiter closed: {e}")));
                            break;
                        }
                    };
                    let engine = self.engine.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        engine.process_document(&document).await
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Document source failed");
                    summary.add_error(RunError::new(RunErrorKind::Source, e.to_string()));
                    fatal = Some(e);
                    break;
                }
            }
        }

        if summary.interrupted {
            tracing::warn!(in_flight = tasks.len(), "Shutdown requested, draining in-flight documents");
        }
        while let Some(joined) = tasks.join_next().await {
            record_task(joined, &mut summary, &mut fatal);
        }

        let dispatcher = self.engine.dispatcher();
        summary.record_dispatch(&dispatcher.stats(), dispatcher.channels());
        summary.completed = self.engine.tracker().is_finished();

        if !summary.completed && fatal.is_none() && !summary.interrupted {
            match self.engine.tracker().pending() {
                Some(pending) => tracing::warn!(
                    pending,
                    "Input ended before all expected documents arrived, output streams left open"
                ),
                None => tracing::warn!(
                    "Input ended without an expected count, output streams left open"
                ),
            }
        }

        let summary = summary.with_duration(started.elapsed());
        summary.log_summary();

        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

fn record_task(
    joined: std::result::Result<TaskResult, JoinError>,
    summary: &mut RunSummary,
    fatal: &mut Option<Ehr2RowError>,
) {
    match joined {
        Ok(Ok(report)) => {
            if report.completion == CompletionStatus::Finished {
                tracing::info!("Last expected document processed");
            }
            summary.record_document(&report);
        }
        Ok(Err(e)) => {
            summary.documents_failed += 1;
            let kind = if e.is_source_failure() {
                RunErrorKind::Rules
            } else {
                RunErrorKind::Sink
            };
            tracing::error!(error = %e, "Document processing failed");
            summary.add_error(RunError::new(kind, e.to_string()));
            if e.is_source_failure() && fatal.is_none() {
                *fatal = Some(e);
            }
        }
        Err(e) => {
            summary.documents_failed += 1;
            tracing::error!(error = %e, "Document task did not complete");
            summary.add_error(RunError::new(RunErrorKind::Task, e.to_string()));
        }
    }
}

/// Resolves once shutdown is requested; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|requested| *requested).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rules::{RuleSource, StaticRuleSource};
    use crate::adapters::sink::MemorySink;
    use crate::adapters::source::StaticSource;
    use crate::config::OutputConfig;
    use serde_json::json;

    const RULES: &str = r#"{"id": 1, "rule_set": [
        {"target_table": "person", "queue": "x", "field_map": ["t.N = d.N"]}
    ]}"#;

    fn coordinator(sink: &Arc<MemorySink>, source: StaticSource) -> (RunCoordinator, watch::Sender<bool>) {
        let rules = Arc::new(StaticRuleSource::from_json(RULES).unwrap());
        let engine = Arc::new(Engine::new(rules, sink.clone(), &OutputConfig::default()));
        let (tx, rx) = watch::channel(false);
        (RunCoordinator::new(engine, Box::new(source), 4, rx), tx)
    }

    #[tokio::test]
    async fn test_run_to_completion() {
        let sink = Arc::new(MemorySink::new());
        let documents = (0..5).map(|n| json!({"id": 1, "N": n}));
        let (coordinator, _tx) = coordinator(&sink, StaticSource::from_documents(documents));

        let summary = coordinator.run().await.unwrap();

        assert!(summary.completed);
        assert_eq!(summary.documents_received, 5);
        assert_eq!(summary.records_emitted, 5);
        assert_eq!(sink.rows().len(), 5);
        assert_eq!(sink.sentinel_count("x"), 1);
        assert!(sink.deliveries().last().unwrap().message.is_end_of_stream());
    }

    #[tokio::test]
    async fn test_invalid_inputs_count_towards_completion() {
        let sink = Arc::new(MemorySink::new());
        let source = StaticSource::new(vec![
            InboundMessage::Start { expected: 2 },
            InboundMessage::invalid("bad.json", "invalid JSON"),
            InboundMessage::Document(json!({"id": 1, "N": 1})),
            InboundMessage::End,
        ]);
        let (coordinator, _tx) = coordinator(&sink, source);

        let summary = coordinator.run().await.unwrap();
        assert!(summary.completed);
        assert_eq!(summary.documents_invalid, 1);
        assert_eq!(sink.sentinel_channels(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_no_start_message_leaves_streams_open() {
        let sink = Arc::new(MemorySink::new());
        let source = StaticSource::new(vec![InboundMessage::Document(json!({"id": 1, "N": 1}))]);
        let (coordinator, _tx) = coordinator(&sink, source);

        let summary = coordinator.run().await.unwrap();
        assert!(!summary.completed);
        assert_eq!(sink.rows().len(), 1);
        assert!(sink.sentinel_channels().is_empty());
        assert!(!sink.is_closed());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_pulls_nothing() {
        let sink = Arc::new(MemorySink::new());
        let (coordinator, tx) = coordinator(&sink, StaticSource::from_documents(vec![json!({"id": 1})]));
        tx.send(true).unwrap();

        let summary = coordinator.run().await.unwrap();
        assert!(summary.interrupted);
        assert_eq!(summary.documents_received, 0);
    }

    /// Rule source whose loads wait until the gate opens
    struct GatedRules {
        gate: Arc<Semaphore>,
        inner: StaticRuleSource,
    }

    #[async_trait::async_trait]
    impl RuleSource for GatedRules {
        async fn load(
            &self,
            template_id: &crate::domain::TemplateId,
        ) -> Result<Option<crate::domain::RuleSet>> {
            let _open = self.gate.acquire().await;
            self.inner.load(template_id).await
        }

        async fn load_all(&self) -> Result<Vec<crate::domain::RuleSet>> {
            self.inner.load_all().await
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_slot() {
        use std::time::Duration;

        let gate = Arc::new(Semaphore::new(0));
        let rules = GatedRules {
            gate: gate.clone(),
            inner: StaticRuleSource::from_json(RULES).unwrap(),
        };
        assert_eq!(rules.describe(), "gated");

        let sink = Arc::new(MemorySink::new());
        let engine = Arc::new(Engine::new(Arc::new(rules), sink.clone(), &OutputConfig::default()));
        let source = StaticSource::from_documents(vec![json!({"id": 1, "N": 1}), json!({"id": 1, "N": 2})]);
        let (tx, rx) = watch::channel(false);
        let run = tokio::spawn(RunCoordinator::new(engine, Box::new(source), 1, rx).run());

        // first document holds the only slot, the second waits for it
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        gate.add_permits(8);

        let summary = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.documents_processed, 1);
        assert_eq!(sink.rows().len(), 1);
        assert!(sink.sentinel_channels().is_empty());
    }
}
