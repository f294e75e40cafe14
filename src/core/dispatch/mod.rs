//! Record dispatch and the end-of-stream protocol

pub mod dispatcher;

pub use dispatcher::{DispatchStats, OutputDispatcher};
