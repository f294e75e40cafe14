//! Output dispatcher
//!
//! Routes derived records to their channel on an [`OutputSink`], remembers every
//! channel it has used, and on shutdown emits the end-of-stream sentinel on each
//! of them. Once shut down, further rows are dropped so no data ever follows a
//! sentinel.

use crate::adapters::sink::OutputSink;
use crate::domain::errors::SinkError;
use crate::domain::message::OutputMessage;
use crate::domain::Result;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Rows accepted by the sink
    pub sent: usize,
    /// Rows the sink failed to deliver
    pub failed: usize,
    /// Rows rejected because the dispatcher was already closed
    pub dropped: usize,
    /// Sentinels delivered
    pub sentinels: usize,
}

/// Multi-channel front of an output sink
pub struct OutputDispatcher {
    sink: Arc<dyn OutputSink + Send + Sync>,
    default_channel: String,
    channels: Mutex<BTreeSet<String>>,
    /// `true` once `end_processing` has run; sends hold the read side
    closed: RwLock<bool>,
    sent: AtomicUsize,
    failed: AtomicUsize,
    dropped: AtomicUsize,
    sentinels: AtomicUsize,
}

impl OutputDispatcher {
    /// Creates a dispatcher; rows without a queue go to `default_channel`
    pub fn new(sink: Arc<dyn OutputSink + Send + Sync>, default_channel: impl Into<String>) -> Self {
        Self {
            sink,
            default_channel: default_channel.into(),
            channels: Mutex::new(BTreeSet::new()),
            closed: RwLock::new(false),
            sent: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            sentinels: AtomicUsize::new(0),
        }
    }

    /// Pre-registers channels that receive the sentinel even if no row is sent on them
    pub fn with_default_channels<I, S>(self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut known = self.lock_channels();
            known.extend(
                channels
                    .into_iter()
                    .map(Into::into)
                    .filter(|c: &String| !c.trim().is_empty()),
            );
        }
        self
    }

    /// Delivers one row on its channel
    ///
    /// The channel is recorded before delivery, so it receives a sentinel even
    /// when this delivery fails.
    ///
    /// # Errors
    ///
    /// - [`SinkError::Closed`] when called after [`end_processing`](Self::end_processing)
    /// - the sink's error when delivery failed; the record is lost
    pub async fn send_row(&self, message: &OutputMessage) -> Result<()> {
        let closed = self.closed.read().await;
        let channel = message.channel_or(&self.default_channel);

        if *closed {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                channel = %channel,
                target_table = %message.target_table,
                "Row received after end of stream, dropped"
            );
            return Err(SinkError::Closed(channel.to_string()).into());
        }

        self.lock_channels().insert(channel.to_string());

        match self.sink.publish(channel, message).await {
            Ok(()) => {
                self.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    channel = %channel,
                    target_table = %message.target_table,
                    sink = self.sink.kind(),
                    error = %e,
                    "Failed to deliver record, record lost"
                );
                Err(e)
            }
        }
    }

    /// Emits the sentinel on every channel used so far
    ///
    /// Returns the number of sentinels delivered. Failed deliveries are logged.
    pub async fn send_end_notification(&self) -> usize {
        let _guard = self.closed.read().await;
        self.publish_sentinels().await
    }

    /// Emits the sentinels and releases the sink
    ///
    /// Waits for in-flight rows to finish first. Only the first call has an
    /// effect; later calls are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns the sink's error if it could not be closed.
    pub async fn end_processing(&self) -> Result<()> {
        let mut closed = self.closed.write().await;
        if *closed {
            tracing::warn!("end_processing called more than once, ignored");
            return Ok(());
        }

        let delivered = self.publish_sentinels().await;
        *closed = true;

        tracing::info!(
            channels = delivered,
            sink = self.sink.kind(),
            "End of stream notified, closing sink"
        );
        self.sink.close().await
    }

    /// Channels used so far, sorted
    pub fn channels(&self) -> Vec<String> {
        self.lock_channels().iter().cloned().collect()
    }

    pub fn default_channel(&self) -> &str {
        &self.default_channel
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.read().await
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            sentinels: self.sentinels.load(Ordering::Relaxed),
        }
    }

    async fn publish_sentinels(&self) -> usize {
        let mut delivered = 0;
        for channel in self.channels() {
            let sentinel = OutputMessage::end_of_stream(channel.as_str());
            match self.sink.publish(&channel, &sentinel).await {
                Ok(()) => {
                    delivered += 1;
                    tracing::debug!(channel = %channel, "End-of-stream sentinel sent");
                }
                Err(e) => {
                    tracing::error!(
                        channel = %channel,
                        error = %e,
                        "Failed to send end-of-stream sentinel"
                    );
                }
            }
        }
        self.sentinels.fetch_add(delivered, Ordering::Relaxed);
        delivered
    }

    fn lock_channels(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
