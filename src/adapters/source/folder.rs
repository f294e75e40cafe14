//! Folder document source
//!
//! Yields `Start` with the number of `*.json` files, one message per file in
//! name order, then `End`. Unreadable files become [`InboundMessage::Invalid`]
//! so they are still accounted for.

use super::traits::DocumentSource;
use crate::adapters::rules::file::list_json_files;
use crate::domain::errors::SourceError;
use crate::domain::message::InboundMessage;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::PathBuf;

enum Phase {
    NotStarted,
    Files(VecDeque<PathBuf>),
    Finished,
}

/// Reads one document per JSON file of a folder
pub struct FolderSource {
    folder: PathBuf,
    phase: Phase,
}

impl FolderSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            phase: Phase::NotStarted,
        }
    }
}

#[async_trait]
impl DocumentSource for FolderSource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>> {
        match &mut self.phase {
            Phase::NotStarted => {
                let files = list_json_files(&self.folder).await.map_err(|e| {
                    SourceError::ReadFailed(format!(
                        "Failed to list {}: {}",
                        self.folder.display(),
                        e
                    ))
                })?;
                tracing::info!(
                    folder = %self.folder.display(),
                    files = files.len(),
                    "Reading documents from folder"
                );
                let expected = files.len() as u64;
                self.phase = Phase::Files(files.into());
                Ok(Some(InboundMessage::Start { expected }))
            }
            Phase::Files(files) => match files.pop_front() {
                Some(path) => {
                    let origin = path.display().to_string();
                    let message = match tokio::fs::read_to_string(&path).await {
                        Ok(text) => match InboundMessage::parse(&text, &origin) {
                            // Control messages inside a document folder are not honoured
                            InboundMessage::Start { .. } | InboundMessage::End => {
                                InboundMessage::invalid(origin, "control message found in document folder")
                            }
                            other => other,
                        },
                        Err(e) => InboundMessage::invalid(origin, format!("read failed: {e}")),
                    };
                    Ok(Some(message))
                }
                None => {
                    self.phase = Phase::Finished;
                    Ok(Some(InboundMessage::End))
                }
            },
            Phase::Finished => Ok(None),
        }
    }

    fn describe(&self) -> String {
        format!("folder {}", self.folder.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_folder_sequence() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"id": 1, "content": []}"#).unwrap();
        fs::write(dir.path().join("b.json"), "{ broken").unwrap();
        fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let mut source = FolderSource::new(dir.path());
        assert_eq!(
            source.next_message().await.unwrap(),
            Some(InboundMessage::Start { expected: 2 })
        );
        assert!(matches!(
            source.next_message().await.unwrap(),
            Some(InboundMessage::Document(_))
        ));
        assert!(matches!(
            source.next_message().await.unwrap(),
            Some(InboundMessage::Invalid { .. })
        ));
        assert_eq!(source.next_message().await.unwrap(), Some(InboundMessage::End));
        assert_eq!(source.next_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_control_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("c.json"), r#"{"id": -1}"#).unwrap();

        let mut source = FolderSource::new(dir.path());
        source.next_message().await.unwrap();
        assert!(matches!(
            source.next_message().await.unwrap(),
            Some(InboundMessage::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_folder_fails() {
        let mut source = FolderSource::new("/nonexistent/ehr2row/documents");
        let err = source.next_message().await.unwrap_err();
        assert!(err.is_source_failure());
    }
}
