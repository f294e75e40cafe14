//! Folder-backed rule source
//!
//! Every `*.json` file of the folder holds one RuleSet object or an array of
//! them. The folder is read once, on the first lookup, and indexed by root id.

use super::traits::RuleSource;
use crate::domain::errors::RuleError;
use crate::domain::ids::TemplateId;
use crate::domain::rules::{parse_rule_sets, RuleSet};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Rule source reading a folder of JSON files
pub struct FileRuleSource {
    folder: PathBuf,
    index: OnceCell<RuleIndex>,
}

struct RuleIndex {
    /// Rule sets in file order
    sets: Vec<RuleSet>,
    /// Template id to position in `sets`; the first definition wins
    by_id: HashMap<TemplateId, usize>,
}

impl FileRuleSource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            index: OnceCell::new(),
        }
    }

    async fn index(&self) -> Result<&RuleIndex> {
        self.index
            .get_or_try_init(|| read_rule_folder(&self.folder))
            .await
    }
}

#[async_trait]
impl RuleSource for FileRuleSource {
    async fn load(&self, template_id: &TemplateId) -> Result<Option<RuleSet>> {
        let index = self.index().await?;
        Ok(index
            .by_id
            .get(template_id)
            .map(|&position| index.sets[position].clone()))
    }

    async fn load_all(&self) -> Result<Vec<RuleSet>> {
        Ok(self.index().await?.sets.clone())
    }

    fn describe(&self) -> String {
        format!("folder {}", self.folder.display())
    }
}

/// Lists the `*.json` files of a folder in name order
pub(crate) async fn list_json_files(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

async fn read_rule_folder(folder: &Path) -> Result<RuleIndex> {
    tracing::debug!(folder = %folder.display(), "Reading rule definitions");

    let files = list_json_files(folder).await.map_err(|e| {
        RuleError::SourceFailure(format!(
            "Failed to list rule folder {}: {}",
            folder.display(),
            e
        ))
    })?;

    let mut sets = Vec::new();
    for path in &files {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            RuleError::SourceFailure(format!("Failed to read {}: {}", path.display(), e))
        })?;
        sets.extend(parse_rule_sets(&text, &path.display().to_string())?);
    }

    let mut by_id = HashMap::new();
    for (position, set) in sets.iter().enumerate() {
        let template_id = TemplateId::from(set.id.clone());
        if by_id.contains_key(&template_id) {
            tracing::warn!(
                template_id = %template_id,
                "Duplicate rule set definition ignored"
            );
            continue;
        }
        by_id.insert(template_id, position);
    }

    tracing::info!(
        folder = %folder.display(),
        files = files.len(),
        rule_sets = by_id.len(),
        "Rule definitions loaded"
    );

    Ok(RuleIndex { sets, by_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[tokio::test]
    async fn test_load_from_object_and_array_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.json", r#"{"id": 100, "level": "template"}"#);
        write(&dir, "b.json", r#"[{"id": "200"}, {"id": 300}]"#);
        write(&dir, "notes.txt", "not a rule file");

        let source = FileRuleSource::new(dir.path());
        let set = source.load(&TemplateId::new("100").unwrap()).await.unwrap();
        assert_eq!(set.unwrap().level.as_deref(), Some("template"));

        assert!(source
            .load(&TemplateId::new("300").unwrap())
            .await
            .unwrap()
            .is_some());
        assert!(source
            .load(&TemplateId::new("999").unwrap())
            .await
            .unwrap()
            .is_none());

        assert_eq!(source.load_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_first_definition_wins() {
        let dir = TempDir::new().unwrap();
        write(&dir, "1.json", r#"{"id": 1, "level": "first"}"#);
        write(&dir, "2.json", r#"{"id": 1, "level": "second"}"#);

        let source = FileRuleSource::new(dir.path());
        let set = source
            .load(&TemplateId::new("1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(set.level.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_source_failure() {
        let dir = TempDir::new().unwrap();
        write(&dir, "broken.json", "{ not json");

        let source = FileRuleSource::new(dir.path());
        let err = source.load(&TemplateId::new("1").unwrap()).await.unwrap_err();
        assert!(err.is_source_failure());
    }

    #[tokio::test]
    async fn test_missing_folder_is_a_source_failure() {
        let source = FileRuleSource::new("/nonexistent/ehr2row/rules");
        let err = source.load(&TemplateId::new("1").unwrap()).await.unwrap_err();
        assert!(err.is_source_failure());
        assert!(source.describe().contains("/nonexistent/ehr2row/rules"));
    }
}
