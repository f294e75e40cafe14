//! Redis list-push sink
//!
//! Each message is serialised to JSON and pushed with `LPUSH` onto the Redis list
//! named after its channel. Consumers pop from the other end and stop at the
//! end-of-stream sentinel.

use super::traits::OutputSink;
use crate::config::secret::redacted_host;
use crate::config::SecretString;
use crate::domain::errors::{Ehr2RowError, SinkError};
use crate::domain::message::OutputMessage;
use crate::domain::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use secrecy::ExposeSecret;
use std::sync::Mutex;

/// Queue sink over a multiplexed Redis connection
pub struct RedisQueueSink {
    connection: Mutex<Option<MultiplexedConnection>>,
    host: String,
}

impl RedisQueueSink {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::ConnectionFailed`] if the URL is invalid or the server
    /// cannot be reached.
    pub async fn connect(url: &SecretString) -> Result<Self> {
        let host = redacted_host(url);
        let client = redis::Client::open(url.expose_secret().as_str())
            .map_err(|e| SinkError::ConnectionFailed(format!("{host}: {e}")))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SinkError::ConnectionFailed(format!("{host}: {e}")))?;

        tracing::info!(host = %host, "Connected to Redis output queues");
        Ok(Self {
            connection: Mutex::new(Some(connection)),
            host,
        })
    }

    fn current_connection(&self, channel: &str) -> Result<MultiplexedConnection> {
        let guard = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .clone()
            .ok_or_else(|| SinkError::Closed(channel.to_string()).into())
    }
}

#[async_trait]
impl OutputSink for RedisQueueSink {
    async fn publish(&self, channel: &str, message: &OutputMessage) -> Result<()> {
        let payload = serde_json::to_string(message)?;
        let mut connection = self.current_connection(channel)?;

        connection
            .lpush::<_, _, ()>(channel, payload)
            .await
            .map_err(|e| {
                Ehr2RowError::from(SinkError::Unavailable {
                    channel: channel.to_string(),
                    message: e.to_string(),
                })
            })
    }

    async fn close(&self) -> Result<()> {
        let previous = self
            .connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if previous.is_some() {
            tracing::info!(host = %self.host, "Closed Redis output connection");
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "queue"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[tokio::test]
    async fn test_invalid_url_fails_to_connect() {
        let url = secret_string("not-a-redis-url".to_string());
        let result = RedisQueueSink::connect(&url).await;
        assert!(matches!(
            result,
            Err(Ehr2RowError::Sink(SinkError::ConnectionFailed(_)))
        ));
    }
}
