//! Run orchestration
//!
//! - [`Engine`] - rule repository, dispatcher and tracker of one run
//! - [`RunCoordinator`] - pulls from a document source and drives the engine
//! - [`RunSummary`] - totals reported at the end of a run

#[allow(clippy::module_inception)]
pub mod engine;
pub mod coordinator;
pub mod summary;

pub use coordinator::RunCoordinator;
pub use engine::{DocumentReport, DocumentStatus, Engine};
pub use summary::{RunError, RunErrorKind, RunSummary};
