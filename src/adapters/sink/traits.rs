//! Output sink abstraction

use crate::domain::message::OutputMessage;
use crate::domain::Result;
use async_trait::async_trait;

/// Destination of already-shaped output messages
///
/// Implementations deliver each message on the named channel. Channel
/// bookkeeping and the end-of-stream protocol live in
/// [`crate::core::dispatch::OutputDispatcher`], not in the sink.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Delivers one message on `channel`
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::SinkError`] when the message could not be delivered.
    async fn publish(&self, channel: &str, message: &OutputMessage) -> Result<()>;

    /// Releases the sink's resources; later publishes fail
    async fn close(&self) -> Result<()>;

    /// Short name of the sink kind for logs
    fn kind(&self) -> &'static str;
}
