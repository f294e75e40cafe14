//! Redis pub/sub document source

use super::traits::DocumentSource;
use crate::config::secret::redacted_host;
use crate::config::SecretString;
use crate::domain::errors::SourceError;
use crate::domain::message::InboundMessage;
use crate::domain::Result;
use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::PubSub;
use secrecy::ExposeSecret;

/// Subscribes to a channel and yields one message per publication
///
/// After `End` is received the source unsubscribes and reports exhaustion.
pub struct RedisChannelSource {
    pubsub: Option<PubSub>,
    channel: String,
    host: String,
    received: u64,
}

impl RedisChannelSource {
    /// Connects and subscribes to `channel`
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::ConnectionFailed`] if the subscription cannot be set up.
    pub async fn subscribe(url: &SecretString, channel: &str) -> Result<Self> {
        let host = redacted_host(url);
        let connection_failed = |e: redis::RedisError| SourceError::ConnectionFailed(format!("{host}: {e}"));

        let client = redis::Client::open(url.expose_secret().as_str()).map_err(connection_failed)?;
        let mut pubsub = client.get_async_pubsub().await.map_err(connection_failed)?;
        pubsub.subscribe(channel).await.map_err(connection_failed)?;

        tracing::info!(host = %host, channel = %channel, "Subscribed to document channel");
        Ok(Self {
            pubsub: Some(pubsub),
            channel: channel.to_string(),
            host,
            received: 0,
        })
    }

    async fn unsubscribe(&mut self) {
        if let Some(mut pubsub) = self.pubsub.take() {
            if let Err(e) = pubsub.unsubscribe(&self.channel).await {
                tracing::warn!(channel = %self.channel, error = %e, "Failed to unsubscribe");
            }
        }
    }
}

#[async_trait]
impl DocumentSource for RedisChannelSource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        let Some(pubsub) = self.pubsub.as_mut() else {
            return Ok(None);
        };

        // The message stream borrows the subscription, so it must end before `self` is touched
        let next = {
            let mut messages = std::pin::pin!(pubsub.on_message());
            messages.next().await
        };
        let Some(msg) = next else {
            self.pubsub = None;
            return Err(SourceError::Closed(format!(
                "subscription to '{}' on {} ended",
                self.channel, self.host
            ))
            .into());
        };

        self.received += 1;
        let origin = format!("{}#{}", self.channel, self.received);
        let message = match msg.get_payload::<String>() {
            Ok(text) => InboundMessage::parse(&text, &origin),
            Err(e) => InboundMessage::invalid(origin, format!("unreadable payload: {e}")),
        };

        if message == InboundMessage::End {
            self.unsubscribe().await;
            tracing::info!(channel = %self.channel, received = self.received, "Document channel ended");
        }
        Ok(Some(message))
    }

    fn describe(&self) -> String {
        format!("redis {} channel {}", self.host, self.channel)
    }
}
