//! Tree transformation
//!
//! Walks a document in lock-step with its rule set and derives flat records.

pub mod traversal;

pub use traversal::{process_element, process_rules, traverse, TraversalOutput, TraversalStats};
