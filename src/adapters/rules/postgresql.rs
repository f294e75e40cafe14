//! PostgreSQL-backed rule source
//!
//! Rule sets are stored one per template in a table with a numeric
//! `plantilla_id` column and a `code` column holding the RuleSet JSON text.

use super::traits::RuleSource;
use crate::config::schema::{validate_table_name, RulesPostgreSQLConfig};
use crate::config::secret::redacted_host;
use crate::domain::errors::{Ehr2RowError, RuleError};
use crate::domain::ids::TemplateId;
use crate::domain::rules::{parse_rule_sets, RuleSet};
use crate::domain::Result;
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::NoTls;

/// Rule source backed by a pooled PostgreSQL connection
pub struct PostgresRuleSource {
    pool: Pool,
    table: String,
    host: String,
}

impl PostgresRuleSource {
    /// Creates the source and its connection pool
    ///
    /// No connection is opened until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string or table name is invalid.
    pub fn new(config: &RulesPostgreSQLConfig) -> Result<Self> {
        validate_table_name(&config.table).map_err(Ehr2RowError::Configuration)?;

        let pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .as_str()
            .parse()
            .map_err(|e| {
                Ehr2RowError::Configuration(format!("Invalid PostgreSQL connection string: {}", e))
            })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                Ehr2RowError::Configuration(format!("Failed to create connection pool: {}", e))
            })?;

        Ok(Self {
            pool,
            table: config.table.clone(),
            host: redacted_host(&config.connection_string),
        })
    }

    async fn connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            RuleError::SourceFailure(format!("Failed to get connection from pool: {}", e)).into()
        })
    }
}

#[async_trait]
impl RuleSource for PostgresRuleSource {
    async fn load(&self, template_id: &TemplateId) -> Result<Option<RuleSet>> {
        let Some(numeric_id) = template_id.as_numeric() else {
            tracing::warn!(
                template_id = %template_id,
                "Template id is not numeric, no rule set can be stored for it"
            );
            return Ok(None);
        };

        let client = self.connection().await?;
        let query = format!("SELECT code FROM {} WHERE plantilla_id = $1", self.table);
        let row = client
            .query_opt(query.as_str(), &[&numeric_id])
            .await
            .map_err(|e| RuleError::SourceFailure(format!("Rule query failed: {}", e)))?;

        let Some(row) = row else {
            tracing::warn!(template_id = %template_id, table = %self.table, "No rule row for template");
            return Ok(None);
        };

        let code: String = row
            .try_get(0)
            .map_err(|e| RuleError::SourceFailure(format!("Invalid code column: {}", e)))?;
        let origin = format!("{}[plantilla_id={}]", self.table, numeric_id);
        let mut sets = parse_rule_sets(&code, &origin)?;

        match sets.len() {
            1 => Ok(sets.pop()),
            _ => Err(RuleError::Malformed {
                origin,
                message: format!("expected one rule set, found {}", sets.len()),
            }
            .into()),
        }
    }

    async fn load_all(&self) -> Result<Vec<RuleSet>> {
        let client = self.connection().await?;
        let query = format!("SELECT plantilla_id, code FROM {} ORDER BY plantilla_id", self.table);
        let rows = client
            .query(query.as_str(), &[])
            .await
            .map_err(|e| RuleError::SourceFailure(format!("Rule query failed: {}", e)))?;

        let mut sets = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row
                .try_get(0)
                .map_err(|e| RuleError::SourceFailure(format!("Invalid plantilla_id column: {}", e)))?;
            let code: String = row
                .try_get(1)
                .map_err(|e| RuleError::SourceFailure(format!("Invalid code column: {}", e)))?;
            let origin = format!("{}[plantilla_id={}]", self.table, id);
            sets.extend(parse_rule_sets(&code, &origin)?);
        }
        Ok(sets)
    }

    fn describe(&self) -> String {
        format!("postgresql {} table {}", self.host, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    fn config(connection_string: &str, table: &str) -> RulesPostgreSQLConfig {
        RulesPostgreSQLConfig {
            connection_string: secret_string(connection_string.to_string()),
            table: table.to_string(),
            max_connections: 2,
            connection_timeout_seconds: 1,
        }
    }

    #[test]
    fn test_new_does_not_connect() {
        let source =
            PostgresRuleSource::new(&config("postgresql://user:pw@localhost:5432/omop", "rules"))
                .unwrap();
        assert_eq!(source.describe(), "postgresql localhost:5432 table rules");
    }

    #[test]
    fn test_invalid_table_rejected() {
        let result = PostgresRuleSource::new(&config(
            "postgresql://localhost/omop",
            "rules; DROP TABLE person",
        ));
        assert!(matches!(result, Err(Ehr2RowError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_non_numeric_template_has_no_rules() {
        let source =
            PostgresRuleSource::new(&config("postgresql://localhost:1/omop", "rules")).unwrap();
        let result = source.load(&TemplateId::new("VITALS").unwrap()).await.unwrap();
        assert!(result.is_none());
    }
}
