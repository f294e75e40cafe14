//! Document source abstraction

use crate::domain::message::InboundMessage;
use crate::domain::Result;
use async_trait::async_trait;

/// Supplier of raw documents and control signals
///
/// Sources classify what they read into [`InboundMessage`]s; the run
/// coordinator pulls them one at a time until `Ok(None)` or [`InboundMessage::End`].
#[async_trait]
pub trait DocumentSource: Send {
    /// Next message, or `None` once the source is exhausted
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::SourceError`] when the underlying transport fails.
    /// Such failures are fatal for the run.
    async fn next_message(&mut self) -> Result<Option<InboundMessage>>;

    /// Short description for logs
    fn describe(&self) -> String;
}
