//! Document sources
//!
//! - [`FolderSource`] - one document per JSON file
//! - [`RedisChannelSource`] - a Redis pub/sub channel
//! - [`StaticSource`] - a fixed in-memory list

pub mod factory;
pub mod folder;
pub mod memory;
pub mod redis;
pub mod traits;

pub use factory::create_document_source;
pub use folder::FolderSource;
pub use memory::StaticSource;
pub use self::redis::RedisChannelSource;
pub use traits::DocumentSource;
