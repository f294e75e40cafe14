//! In-memory rule source for tests and embedding

use super::traits::RuleSource;
use crate::domain::ids::TemplateId;
use crate::domain::rules::{parse_rule_sets, RuleSet};
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rule source over a fixed list of rule sets
#[derive(Default)]
pub struct StaticRuleSource {
    sets: HashMap<TemplateId, RuleSet>,
    loads: AtomicUsize,
}

impl StaticRuleSource {
    pub fn new(sets: impl IntoIterator<Item = RuleSet>) -> Self {
        let mut by_id = HashMap::new();
        for set in sets {
            by_id
                .entry(TemplateId::from(set.id.clone()))
                .or_insert(set);
        }
        Self {
            sets: by_id,
            loads: AtomicUsize::new(0),
        }
    }

    /// Builds the source from JSON text holding one rule set or an array of them
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(Self::new(parse_rule_sets(text, "inline")?))
    }

    /// Number of `load` calls served so far
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleSource for StaticRuleSource {
    async fn load(&self, template_id: &TemplateId) -> Result<Option<RuleSet>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.sets.get(template_id).cloned())
    }

    async fn load_all(&self) -> Result<Vec<RuleSet>> {
        let mut sets: Vec<RuleSet> = self.sets.values().cloned().collect();
        sets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(sets)
    }

    fn describe(&self) -> String {
        format!("static ({} rule sets)", self.sets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticRuleSource::from_json(r#"[{"id": 1}, {"id": "2"}]"#).unwrap();
        assert!(source.load(&TemplateId::new("1").unwrap()).await.unwrap().is_some());
        assert!(source.load(&TemplateId::new("3").unwrap()).await.unwrap().is_none());
        assert_eq!(source.loads(), 2);
        assert_eq!(source.load_all().await.unwrap().len(), 2);
        assert_eq!(source.describe(), "static (2 rule sets)");
    }
}
