//! In-Memory Implementations
//!
//! 内存键值存储与 Object URL 注册表

mod kv_store;
mod object_urls;

pub use kv_store::InMemoryKeyValueStore;
pub use object_urls::{Blob, ObjectUrl, ObjectUrlError, ObjectUrlRegistry};
