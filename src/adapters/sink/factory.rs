//! Output sink factory

use super::console::ConsoleSink;
use super::memory::MemorySink;
use super::redis::RedisQueueSink;
use super::traits::OutputSink;
use crate::config::schema::{Ehr2RowConfig, SinkKind};
use crate::domain::Result;
use std::sync::Arc;

/// Create the sink selected by the configuration
///
/// Dry runs always get a [`MemorySink`] regardless of `output.sink`.
///
/// # Errors
///
/// Returns a sink error if the queue backend cannot be reached
pub async fn create_sink(config: &Ehr2RowConfig) -> Result<Arc<dyn OutputSink + Send + Sync>> {
    match config.effective_sink() {
        SinkKind::Console => {
            tracing::info!("Creating console sink");
            Ok(Arc::new(ConsoleSink::new()) as Arc<dyn OutputSink + Send + Sync>)
        }
        SinkKind::Memory => {
            tracing::info!(dry_run = config.application.dry_run, "Creating in-memory sink");
            Ok(Arc::new(MemorySink::new()) as Arc<dyn OutputSink + Send + Sync>)
        }
        SinkKind::Queue => {
            tracing::info!("Creating Redis queue sink");
            let sink = RedisQueueSink::connect(&config.output.redis.url).await?;
            Ok(Arc::new(sink) as Arc<dyn OutputSink + Send + Sync>)
        }
    }
}
