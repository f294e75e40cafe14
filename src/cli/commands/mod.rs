//! CLI command implementations

pub mod check_rules;
pub mod init;
pub mod run;
pub mod validate;
