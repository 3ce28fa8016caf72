//! Key-Value Store Port - 本地持久化键值存储
//!
//! 对应浏览器 localStorage 的同步读写语义；具体实现为 Sled（持久化）与内存 DashMap

use thiserror::Error;

/// 持久化键
pub mod keys {
    /// 当前选中的音色 ID
    pub const SELECTED_VOICE_ID: &str = "selected_voice_id";
    /// 当前选中音色的展示名（克隆成功后写入）
    pub const SELECTED_VOICE_NAME: &str = "selected_voice_name";
    /// 缓存的音色列表（JSON）
    pub const CACHED_VOICES: &str = "cached_voices";
    /// 音色列表缓存时间（毫秒时间戳）
    pub const CACHED_VOICES_TIMESTAMP: &str = "cached_voices_timestamp";
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Key-Value Store Port
///
/// 单写者模型，后写覆盖前写
pub trait KeyValueStorePort: Send + Sync {
    /// 读取字符串值
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入字符串值
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// 删除键
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
