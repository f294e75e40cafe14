// ehr2row - Rule-driven clinical document to row transformation
// Copyright (c) 2025 ehr2row Contributors
// Licensed under the MIT License

//! # ehr2row - clinical documents to flat rows
//!
//! ehr2row ingests hierarchical clinical-record documents and, for each one,
//! applies a declarative rule set that projects it into zero or more flat
//! records. Each record is published on a named output channel; once every
//! expected document has been processed, each channel that was used receives
//! an end-of-stream sentinel.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Rule resolution, traversal, dispatch and completion tracking
//! - [`expr`] - The sandboxed expression language used by rules
//! - [`adapters`] - Rule sources, document sources and output sinks
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ehr2row::config::load_config;
//! use ehr2row::core::engine::RunCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("ehr2row.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//!     let coordinator = RunCoordinator::from_config(&config, shutdown_rx).await?;
//!     let summary = coordinator.run().await?;
//!
//!     println!("Emitted {} records", summary.records_emitted);
//!     Ok(())
//! }
//! ```
//!
//! ## Rules
//!
//! A rule set mirrors the structure of the documents it applies to:
//!
//! ```json
//! {
//!   "id": 1001,
//!   "rule_set": [{
//!     "target_table": "visit_occurrence",
//!     "queue": "visits",
//!     "condition": "d.ESTADO == 'C'",
//!     "field_map": ["t.VISIT_ID = d.ID_INSTANCIA_PLANT"]
//!   }],
//!   "child_rules": [{
//!     "id": "TEMP",
//!     "rule_set": [{
//!       "target_table": "measurement",
//!       "field_map": ["t.VALUE = number(e.VALOR); t.UNIT = 'Cel'"]
//!     }]
//!   }]
//! }
//! ```
//!
//! ## Error Handling
//!
//! Library code returns [`domain::Result`] with [`domain::Ehr2RowError`];
//! `anyhow` is used only at the CLI boundary.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod expr;
pub mod logging;
