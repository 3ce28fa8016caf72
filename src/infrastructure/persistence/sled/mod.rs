//! Sled 持久化实现

mod kv_store;

pub use kv_store::{SledKeyValueStore, SledStoreConfig};
