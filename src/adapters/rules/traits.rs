//! Rule source abstraction
//!
//! A rule source supplies [`RuleSet`] definitions keyed by template id. Caching
//! is not the source's concern: [`crate::core::rules::RuleRepository`] calls
//! [`RuleSource::load`] at most once per template for a run.

use crate::domain::ids::TemplateId;
use crate::domain::rules::RuleSet;
use crate::domain::Result;
use async_trait::async_trait;

/// Supplier of rule definitions
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Loads the rule set for a template
    ///
    /// Returns `Ok(None)` when no rule set is defined for the template.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::RuleError::SourceFailure`] or
    /// [`crate::domain::RuleError::Malformed`] when the store cannot be read.
    async fn load(&self, template_id: &TemplateId) -> Result<Option<RuleSet>>;

    /// Loads every rule set the source holds
    async fn load_all(&self) -> Result<Vec<RuleSet>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
