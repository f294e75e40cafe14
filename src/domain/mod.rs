//! Domain models and types for ehr2row.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identifiers** ([`NodeId`], [`TemplateId`]) normalising string and numeric ids
//! - **Documents** ([`DocumentNode`]) and the pure lookup helpers [`find_by_id`] and
//!   [`find_by_id_and_state`]
//! - **Rule definitions** ([`RuleSet`], [`Rule`])
//! - **Wire messages** ([`OutputMessage`], [`InboundMessage`])
//! - **Error types** ([`Ehr2RowError`] and its sub-errors) and the [`Result`] alias
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, Ehr2RowError>`]:
//!
//! ```rust
//! use ehr2row::domain::{Ehr2RowError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = ehr2row::config::Ehr2RowConfig::from_toml_str("")?;
//!     assert_eq!(config.output.default_queue, "default");
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod context;
pub mod document;
pub mod errors;
pub mod ids;
pub mod message;
pub mod result;
pub mod rules;

// Re-export commonly used types for convenience
pub use document::{find_by_id, find_by_id_and_state, DocumentNode};
pub use errors::{Ehr2RowError, ExpressionError, RuleError, SinkError, SourceError};
pub use ids::{NodeId, TemplateId};
pub use message::{InboundMessage, OutputMessage, TargetTable};
pub use result::Result;
pub use rules::{CompileIssue, Rule, RuleSet};
