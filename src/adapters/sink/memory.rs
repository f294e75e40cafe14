//! In-memory sink for tests and dry runs

use super::traits::OutputSink;
use crate::domain::errors::SinkError;
use crate::domain::message::OutputMessage;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// One recorded delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub channel: String,
    pub message: OutputMessage,
}

/// Sink that keeps every delivery in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    deliveries: Mutex<Vec<Delivery>>,
    failing_channels: HashSet<String>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that reports every publish on the given channels as unavailable
    pub fn failing_on<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            failing_channels: channels.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// All deliveries in publish order
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    /// Messages delivered on one channel, in publish order
    pub fn messages_on(&self, channel: &str) -> Vec<OutputMessage> {
        self.lock()
            .iter()
            .filter(|d| d.channel == channel)
            .map(|d| d.message.clone())
            .collect()
    }

    /// Data rows delivered, excluding sentinels
    pub fn rows(&self) -> Vec<Delivery> {
        self.lock()
            .iter()
            .filter(|d| !d.message.is_end_of_stream())
            .cloned()
            .collect()
    }

    /// Number of end-of-stream sentinels delivered on a channel
    pub fn sentinel_count(&self, channel: &str) -> usize {
        self.lock()
            .iter()
            .filter(|d| d.channel == channel && d.message.is_end_of_stream())
            .count()
    }

    /// Channels that received a sentinel, sorted
    pub fn sentinel_channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self
            .lock()
            .iter()
            .filter(|d| d.message.is_end_of_stream())
            .map(|d| d.channel.clone())
            .collect();
        channels.sort();
        channels
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Delivery>> {
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn publish(&self, channel: &str, message: &OutputMessage) -> Result<()> {
        if self.is_closed() {
            return Err(SinkError::Closed(channel.to_string()).into());
        }
        if self.failing_channels.contains(channel) {
            return Err(SinkError::Unavailable {
                channel: channel.to_string(),
                message: "channel configured to fail".to_string(),
            }
            .into());
        }

        self.lock().push(Delivery {
            channel: channel.to_string(),
            message: message.clone(),
        });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_records_deliveries() {
        let sink = MemorySink::new();
        sink.publish("x", &OutputMessage::row("t", None, json!({"A": 1})))
            .await
            .unwrap();
        sink.publish("x", &OutputMessage::end_of_stream("x"))
            .await
            .unwrap();

        assert_eq!(sink.deliveries().len(), 2);
        assert_eq!(sink.rows().len(), 1);
        assert_eq!(sink.sentinel_count("x"), 1);
        assert_eq!(sink.sentinel_channels(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_failing_channel() {
        let sink = MemorySink::failing_on(["bad"]);
        let result = sink
            .publish("bad", &OutputMessage::row("t", None, json!({})))
            .await;
        assert!(result.is_err());
        assert!(sink.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_publish_after_close_fails() {
        let sink = MemorySink::new();
        sink.close().await.unwrap();
        assert!(sink.is_closed());
        assert_eq!(sink.close_calls(), 1);
        let result = sink
            .publish("x", &OutputMessage::row("t", None, json!({})))
            .await;
        assert!(result.is_err());
    }
}
