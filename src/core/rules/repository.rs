//! Rule repository: resolves and caches rule sets per template
//!
//! Each template id gets its own once-cell, so concurrent lookups of the same id
//! wait for a single load while lookups of other ids proceed independently.
//! Both found and absent results are cached for the lifetime of the repository;
//! failed loads are not, and the next lookup retries.

use crate::adapters::rules::RuleSource;
use crate::domain::errors::RuleError;
use crate::domain::ids::TemplateId;
use crate::domain::rules::RuleSet;
use crate::domain::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type CacheSlot = Arc<OnceCell<Option<Arc<RuleSet>>>>;

/// Append-only cache of rule sets in front of a [`RuleSource`]
pub struct RuleRepository {
    source: Arc<dyn RuleSource + Send + Sync>,
    cache: Mutex<HashMap<TemplateId, CacheSlot>>,
}

impl RuleRepository {
    pub fn new(source: Arc<dyn RuleSource + Send + Sync>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the rule set of a template
    ///
    /// # Errors
    ///
    /// - [`RuleError::NotFound`] when the source defines no rule set for the template
    /// - a source failure when the source could not be read; this is not cached
    pub async fn resolve(&self, template_id: &TemplateId) -> Result<Arc<RuleSet>> {
        let slot = self.slot(template_id);
        let entry = slot.get_or_try_init(|| self.load(template_id)).await?;

        entry
            .clone()
            .ok_or_else(|| RuleError::NotFound(template_id.to_string()).into())
    }

    /// Number of templates with a settled cache entry, found or absent
    pub fn cached_templates(&self) -> usize {
        self.lock().values().filter(|slot| slot.initialized()).count()
    }

    /// Description of the underlying source
    pub fn describe_source(&self) -> String {
        self.source.describe()
    }

    fn slot(&self, template_id: &TemplateId) -> CacheSlot {
        self.lock()
            .entry(template_id.clone())
            .or_default()
            .clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TemplateId, CacheSlot>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn load(&self, template_id: &TemplateId) -> Result<Option<Arc<RuleSet>>> {
        let Some(rule_set) = self.source.load(template_id).await? else {
            tracing::warn!(
                template_id = %template_id,
                source = %self.source.describe(),
                "No rule set defined for template"
            );
            return Ok(None);
        };

        for issue in rule_set.compile_errors() {
            tracing::warn!(
                template_id = %template_id,
                rule_set = %issue.rule_set,
                target_table = %issue.target_table,
                expression = %issue.source,
                error = %issue.error,
                "Expression failed to compile and will fail at evaluation"
            );
        }

        tracing::debug!(
            template_id = %template_id,
            rules = rule_set.rule_count(),
            "Rule set loaded"
        );
        Ok(Some(Arc::new(rule_set)))
    }
}
