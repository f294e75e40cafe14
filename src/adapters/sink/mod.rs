//! Output sinks
//!
//! - [`RedisQueueSink`] - `LPUSH` onto one Redis list per channel
//! - [`ConsoleSink`] - records written to the log
//! - [`MemorySink`] - deliveries kept in memory for tests and dry runs

pub mod console;
pub mod factory;
pub mod memory;
pub mod redis;
pub mod traits;

pub use console::ConsoleSink;
pub use factory::create_sink;
pub use memory::{Delivery, MemorySink};
pub use self::redis::RedisQueueSink;
pub use traits::OutputSink;
