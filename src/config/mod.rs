//! Configuration management for ehr2row.
//!
//! ehr2row uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `EHR2ROW_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry run
//! - [`InputConfig`] - Document source (folder or Redis channel)
//! - [`RulesConfig`] - Rule source (folder or PostgreSQL)
//! - [`OutputConfig`] - Sink and channel names
//! - [`ProcessingConfig`] - Concurrency limit
//! - [`LoggingConfig`] - Local file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [input]
//! source = "redis"
//!
//! [input.redis]
//! url = "${REDIS_URL}"
//! channel = "ehr_json"
//!
//! [rules]
//! source = "postgresql"
//!
//! [rules.postgresql]
//! connection_string = "${EHR2ROW_RULES_DSN}"
//! table = "rules"
//!
//! [output]
//! sink = "queue"
//! default_queue = "default"
//! default_queues = ["person", "visit_occurrence"]
//!
//! [output.redis]
//! url = "${REDIS_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, Ehr2RowConfig, InputConfig, InputSource, LoggingConfig, OutputConfig,
    ProcessingConfig, RedisInputConfig, RedisOutputConfig, RuleSourceKind, RulesConfig,
    RulesPostgreSQLConfig, SinkKind,
};
pub use secret::{secret_string, SecretString, SecretValue};
