//! Completion tracker
//!
//! Counts the documents still expected in a run. The counter is seeded once by
//! [`CompletionTracker::set_expected`] and decremented once per processed
//! document; the decrement that reaches zero shuts the dispatcher down. The
//! counter is a single atomic updated with compare-and-swap, so exactly one
//! caller observes the transition to zero.

use crate::core::dispatch::OutputDispatcher;
use crate::domain::{Ehr2RowError, Result};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

const UNSEEDED: i64 = -1;

/// Outcome of a counter update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// No expected count has been set; nothing was decremented
    Unseeded,
    /// The counter had already reached zero; nothing was decremented
    AlreadyFinished,
    /// Documents still outstanding after this update
    Pending(u64),
    /// This update reached zero and shut the dispatcher down
    Finished,
}

/// Run-scoped pending-document counter
pub struct CompletionTracker {
    pending: AtomicI64,
    dispatcher: Arc<OutputDispatcher>,
    finished: watch::Sender<bool>,
}

impl CompletionTracker {
    pub fn new(dispatcher: Arc<OutputDispatcher>) -> Self {
        let (finished, _) = watch::channel(false);
        Self {
            pending: AtomicI64::new(UNSEEDED),
            dispatcher,
            finished,
        }
    }

    /// Seeds the number of documents to wait for
    ///
    /// `0` finishes the run immediately.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the count was already set or does not fit
    /// the counter, and the dispatcher's error if an immediate shutdown fails.
    pub async fn set_expected(&self, expected: u64) -> Result<CompletionStatus> {
        let seeded = i64::try_from(expected).map_err(|_| {
            Ehr2RowError::Validation(format!("expected document count {expected} is too large"))
        })?;

        if let Err(current) =
            self.pending
                .compare_exchange(UNSEEDED, seeded, Ordering::AcqRel, Ordering::Acquire)
        {
            return Err(Ehr2RowError::Validation(format!(
                "expected document count already set ({current} pending)"
            )));
        }

        tracing::info!(expected, "Expected document count set");

        if seeded == 0 {
            self.finish().await?;
            return Ok(CompletionStatus::Finished);
        }
        Ok(CompletionStatus::Pending(expected))
    }

    /// Accounts for one processed document
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error if the shutdown triggered by this call fails.
    pub async fn on_document_processed(&self) -> Result<CompletionStatus> {
        let update = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current > 0).then(|| current - 1)
            });

        match update {
            Ok(1) => {
                self.finish().await?;
                Ok(CompletionStatus::Finished)
            }
            Ok(previous) => Ok(CompletionStatus::Pending((previous - 1) as u64)),
            Err(UNSEEDED) => {
                tracing::warn!("Document processed before the expected count was set");
                Ok(CompletionStatus::Unseeded)
            }
            Err(_) => {
                tracing::warn!("Document processed after all expected documents, ignored");
                Ok(CompletionStatus::AlreadyFinished)
            }
        }
    }

    /// Documents still outstanding, or `None` before the count is set
    pub fn pending(&self) -> Option<u64> {
        match self.pending.load(Ordering::Acquire) {
            UNSEEDED => None,
            n => Some(n as u64),
        }
    }

    pub fn is_seeded(&self) -> bool {
        self.pending().is_some()
    }

    /// Whether the dispatcher has been shut down by this tracker
    pub fn is_finished(&self) -> bool {
        *self.finished.borrow()
    }

    /// Waits until the run has finished
    ///
    /// Never returns if the expected count is never set.
    pub async fn wait_finished(&self) {
        let mut finished = self.finished.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = finished.wait_for(|done| *done).await;
    }

    async fn finish(&self) -> Result<()> {
        tracing::info!("All expected documents processed, ending output streams");
        let result = self.dispatcher.end_processing().await;
        self.finished.send_replace(true);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sink::MemorySink;
    use crate::domain::message::OutputMessage;
    use serde_json::json;

    fn tracker() -> (Arc<MemorySink>, Arc<OutputDispatcher>, CompletionTracker) {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = Arc::new(OutputDispatcher::new(sink.clone(), "default"));
        let tracker = CompletionTracker::new(dispatcher.clone());
        (sink, dispatcher, tracker)
    }

    #[tokio::test]
    async fn test_finishes_on_last_decrement() {
        let (sink, dispatcher, tracker) = tracker();
        dispatcher
            .send_row(&OutputMessage::row("t", Some("x".to_string()), json!({})))
            .await
            .unwrap();

        assert_eq!(tracker.set_expected(2).await.unwrap(), CompletionStatus::Pending(2));
        assert_eq!(
            tracker.on_document_processed().await.unwrap(),
            CompletionStatus::Pending(1)
        );
        assert!(!tracker.is_finished());
        assert_eq!(
            tracker.on_document_processed().await.unwrap(),
            CompletionStatus::Finished
        );

        assert!(tracker.is_finished());
        assert_eq!(tracker.pending(), Some(0));
        assert_eq!(sink.sentinel_count("x"), 1);
    }

    #[tokio::test]
    async fn test_unseeded_never_finishes() {
        let (sink, _dispatcher, tracker) = tracker();
        assert_eq!(
            tracker.on_document_processed().await.unwrap(),
            CompletionStatus::Unseeded
        );
        assert_eq!(tracker.pending(), None);
        assert!(!tracker.is_finished());
        assert!(!sink.is_closed());
    }

    #[tokio::test]
    async fn test_counter_never_goes_negative() {
        let (sink, _dispatcher, tracker) = tracker();
        tracker.set_expected(1).await.unwrap();
        tracker.on_document_processed().await.unwrap();

        assert_eq!(
            tracker.on_document_processed().await.unwrap(),
            CompletionStatus::AlreadyFinished
        );
        assert_eq!(tracker.pending(), Some(0));
        assert_eq!(sink.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_second_seed_is_rejected() {
        let (_sink, _dispatcher, tracker) = tracker();
        tracker.set_expected(3).await.unwrap();
        assert!(matches!(
            tracker.set_expected(4).await,
            Err(Ehr2RowError::Validation(_))
        ));
        assert_eq!(tracker.pending(), Some(3));
    }

    #[tokio::test]
    async fn test_zero_expected_finishes_immediately() {
        let (sink, _dispatcher, tracker) = tracker();
        assert_eq!(tracker.set_expected(0).await.unwrap(), CompletionStatus::Finished);
        assert!(tracker.is_finished());
        assert!(sink.is_closed());
        tracker.wait_finished().await;
    }
}
