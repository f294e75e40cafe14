//! Core transformation engine for ehr2row.
//!
//! # Modules
//!
//! - [`rules`] - rule set resolution with a per-template cache
//! - [`transform`] - lock-step traversal of documents and rule trees
//! - [`dispatch`] - multi-channel output and the end-of-stream protocol
//! - [`completion`] - pending-document counter that ends the run
//! - [`engine`] - the per-run engine context and the run coordinator
//!
//! # Run Workflow
//!
//! 1. **Start**: the source announces how many documents follow
//! 2. **Resolve**: each document's template id selects its rule set
//! 3. **Transform**: rules fire on matching nodes and build flat records
//! 4. **Dispatch**: records are published on their channels
//! 5. **Complete**: after the last expected document every used channel gets
//!    the end-of-stream sentinel
//!
//! # Example
//!
//! ```rust
//! use ehr2row::adapters::rules::StaticRuleSource;
//! use ehr2row::adapters::sink::MemorySink;
//! use ehr2row::config::OutputConfig;
//! use ehr2row::core::engine::Engine;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> ehr2row::domain::Result<()> {
//! let rules = Arc::new(StaticRuleSource::from_json(r#"{
//!     "id": 1,
//!     "rule_set": [{"target_table": "person", "queue": "x", "field_map": ["t.ID = d.id"]}]
//! }"#)?);
//! let sink = Arc::new(MemorySink::new());
//! let engine = Engine::new(rules, sink.clone(), &OutputConfig::default());
//!
//! engine.start(1).await?;
//! engine.process_document(&json!({"id": 1})).await?;
//!
//! assert_eq!(sink.rows().len(), 1);
//! assert_eq!(sink.sentinel_channels(), vec!["x"]);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod dispatch;
pub mod engine;
pub mod rules;
pub mod transform;
