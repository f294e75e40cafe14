//! Sink that writes every record to the log

use super::traits::OutputSink;
use crate::domain::message::OutputMessage;
use crate::domain::Result;
use async_trait::async_trait;

/// Logs each message at info level
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutputSink for ConsoleSink {
    async fn publish(&self, channel: &str, message: &OutputMessage) -> Result<()> {
        if message.is_end_of_stream() {
            tracing::info!(channel = %channel, "End of stream");
        } else {
            tracing::info!(
                channel = %channel,
                target_table = %message.target_table,
                record = %message.record,
                "Record"
            );
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "console"
    }
}
