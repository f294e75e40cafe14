//! End-of-run detection

pub mod tracker;

pub use tracker::{CompletionStatus, CompletionTracker};
