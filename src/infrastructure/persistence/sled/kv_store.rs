//! Sled-based Key-Value Store Implementation

use sled::Db;
use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{KeyValueStorePort, StoreError};

/// Sled 存储配置
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// 数据库路径
    pub db_path: String,
    /// 键前缀（多个挂载实例共享同一数据库时隔离）
    pub namespace: String,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/speechly.sled".to_string(),
            namespace: "speechly".to_string(),
        }
    }
}

/// Sled 键值存储
pub struct SledKeyValueStore {
    db: Db,
    namespace: String,
}

impl SledKeyValueStore {
    /// 创建新的存储实例
    pub fn new(config: &SledStoreConfig) -> Result<Self, StoreError> {
        let db = sled::open(&config.db_path)
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::info!(
            db_path = %config.db_path,
            namespace = %config.namespace,
            entries = db.len(),
            "SledKeyValueStore initialized"
        );

        Ok(Self {
            db,
            namespace: config.namespace.clone(),
        })
    }

    /// 打开现有存储
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let config = SledStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        };
        Self::new(&config)
    }

    /// 复用已打开的数据库
    pub fn with_db(db: Db, namespace: impl Into<String>) -> Self {
        Self {
            db,
            namespace: namespace.into(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStorePort for SledKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.db.get(self.namespaced(key)) {
            Ok(Some(data)) => {
                let value = String::from_utf8(data.to_vec())
                    .map_err(|e| StoreError::SerializationError(e.to_string()))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db
            .insert(self.namespaced(key), value.as_bytes())
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        tracing::debug!(key = %key, size_bytes = value.len(), "Value persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.db
            .remove(self.namespaced(key))
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        Ok(())
    }
}
