//! Rule source factory

use super::file::FileRuleSource;
use super::postgresql::PostgresRuleSource;
use super::traits::RuleSource;
use crate::config::schema::{RuleSourceKind, RulesConfig};
use crate::domain::{Ehr2RowError, Result};
use std::sync::Arc;

/// Create the rule source selected by the configuration
///
/// # Errors
///
/// Returns a configuration error if the selected source is not configured
pub fn create_rule_source(config: &RulesConfig) -> Result<Arc<dyn RuleSource + Send + Sync>> {
    match config.source {
        RuleSourceKind::File => {
            tracing::info!(folder = %config.folder, "Creating folder rule source");
            Ok(Arc::new(FileRuleSource::new(&config.folder)) as Arc<dyn RuleSource + Send + Sync>)
        }
        RuleSourceKind::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                Ehr2RowError::Configuration(
                    "rules.postgresql configuration is required when rules.source = 'postgresql'"
                        .to_string(),
                )
            })?;

            tracing::info!(table = %pg_config.table, "Creating PostgreSQL rule source");
            let source = PostgresRuleSource::new(pg_config)?;
            Ok(Arc::new(source) as Arc<dyn RuleSource + Send + Sync>)
        }
    }
}
