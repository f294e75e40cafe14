//! Rule definition sources
//!
//! - [`FileRuleSource`] - a folder of JSON rule files, read once
//! - [`PostgresRuleSource`] - point lookups in a PostgreSQL table
//! - [`StaticRuleSource`] - a fixed in-memory list

pub mod factory;
pub mod file;
pub mod memory;
pub mod postgresql;
pub mod traits;

pub use factory::create_rule_source;
pub use file::FileRuleSource;
pub use memory::StaticRuleSource;
pub use postgresql::PostgresRuleSource;
pub use traits::RuleSource;
