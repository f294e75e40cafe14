//! Document source factory

use super::folder::FolderSource;
use super::redis::RedisChannelSource;
use super::traits::DocumentSource;
use crate::config::schema::{InputConfig, InputSource};
use crate::domain::Result;

/// Create the document source selected by the configuration
///
/// # Errors
///
/// Returns a source error if the Redis subscription cannot be set up
pub async fn create_document_source(config: &InputConfig) -> Result<Box<dyn DocumentSource>> {
    match config.source {
        InputSource::Folder => {
            tracing::info!(folder = %config.folder, "Creating folder document source");
            Ok(Box::new(FolderSource::new(&config.folder)))
        }
        InputSource::Redis => {
            tracing::info!(channel = %config.redis.channel, "Creating Redis document source");
            let source =
                RedisChannelSource::subscribe(&config.redis.url, &config.redis.channel).await?;
            Ok(Box::new(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_folder_source_from_default_config() {
        let source = create_document_source(&InputConfig::default()).await.unwrap();
        assert_eq!(source.describe(), "folder ./JSON");
    }
}
