//! External system integrations for ehr2row.
//!
//! - [`rules`] - where rule definitions come from (folder, PostgreSQL, memory)
//! - [`source`] - where documents come from (folder, Redis pub/sub, memory)
//! - [`sink`] - where derived records go (Redis queues, console, memory)
//!
//! Each collaborator is a trait with a factory that picks the implementation
//! from configuration, so the engine never depends on a concrete backend.

pub mod rules;
pub mod sink;
pub mod source;
