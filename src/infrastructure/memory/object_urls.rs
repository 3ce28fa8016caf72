//! In-Memory Object URL Registry
//!
//! 录音、上传和合成得到的音频字节以 `blob:<uuid>` 形式登记；
//! `ObjectUrl` 是 RAII 句柄，drop 时自动 revoke。

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::audio::{mime_type_for_filename, AudioFile};

const BLOB_SCHEME: &str = "blob:";

/// Object URL 错误
#[derive(Debug, Error)]
pub enum ObjectUrlError {
    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),

    #[error("Blob URL has been revoked: {0}")]
    Revoked(String),
}

/// 登记的二进制数据
#[derive(Debug, Clone)]
pub struct Blob {
    pub data: Arc<[u8]>,
    pub mime_type: String,
}

/// Object URL 注册表
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    blobs: DashMap<String, Blob>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 登记数据并返回持有所有权的 URL 句柄
    pub fn create(self: &Arc<Self>, data: impl Into<Arc<[u8]>>, mime_type: &str) -> ObjectUrl {
        let url = format!("{}{}", BLOB_SCHEME, Uuid::new_v4());
        let blob = Blob {
            data: data.into(),
            mime_type: mime_type.to_string(),
        };
        tracing::debug!(url = %url, size = blob.data.len(), mime_type = %mime_type, "Object URL created");
        self.blobs.insert(url.clone(), blob);

        ObjectUrl {
            url,
            registry: Arc::clone(self),
        }
    }

    /// 查找 URL 对应的数据
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs.get(url).map(|b| b.clone())
    }

    /// 释放 URL；返回是否确实存在
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.blobs.remove(url).is_some();
        if removed {
            tracing::debug!(url = %url, "Object URL revoked");
        }
        removed
    }

    /// 当前未释放的 URL 数量
    pub fn live_count(&self) -> usize {
        self.blobs.len()
    }

    /// 把 blob URL 转换为文件
    ///
    /// 保留登记时的 MIME 类型；缺失时按文件名扩展名推断（默认 `audio/mpeg`）
    pub fn to_file(&self, url: &str, filename: &str) -> Result<AudioFile, ObjectUrlError> {
        if !url.starts_with(BLOB_SCHEME) {
            return Err(ObjectUrlError::InvalidUrl(url.to_string()));
        }

        let blob = self
            .resolve(url)
            .ok_or_else(|| ObjectUrlError::Revoked(url.to_string()))?;

        let mime_type = if blob.mime_type.trim().is_empty() {
            mime_type_for_filename(filename).to_string()
        } else {
            blob.mime_type.clone()
        };

        tracing::debug!(
            url = %url,
            filename = %filename,
            mime_type = %mime_type,
            size = blob.data.len(),
            "Converted blob URL to file"
        );

        Ok(AudioFile::new(filename, mime_type, blob.data.to_vec()))
    }
}

/// Object URL 句柄，drop 时 revoke
#[derive(Debug)]
pub struct ObjectUrl {
    url: String,
    registry: Arc<ObjectUrlRegistry>,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn blob(&self) -> Option<Blob> {
        self.registry.resolve(&self.url)
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_revoked_on_drop() {
        let registry = ObjectUrlRegistry::new().arc();
        let url = registry.create(vec![1u8, 2, 3], "audio/wav");
        let raw = url.as_str().to_string();

        assert!(raw.starts_with("blob:"));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&raw).unwrap().data.len(), 3);

        drop(url);
        assert_eq!(registry.live_count(), 0);
        assert!(registry.resolve(&raw).is_none());
    }

    #[test]
    fn test_to_file_keeps_mime_type() {
        let registry = ObjectUrlRegistry::new().arc();
        let url = registry.create(vec![9u8; 4], "audio/ogg");

        let file = registry.to_file(url.as_str(), "sample.wav").unwrap();
        assert_eq!(file.mime_type(), "audio/ogg");
        assert_eq!(file.name(), "sample.wav");
        assert_eq!(file.size(), 4);
    }

    #[test]
    fn test_to_file_infers_mime_from_name() {
        let registry = ObjectUrlRegistry::new().arc();
        let url = registry.create(vec![1u8], "");

        let file = registry.to_file(url.as_str(), "voice.flac").unwrap();
        assert_eq!(file.mime_type(), "audio/flac");
    }

    #[test]
    fn test_to_file_rejects_non_blob_url() {
        let registry = ObjectUrlRegistry::new().arc();
        let err = registry.to_file("https://example.com/a.wav", "a.wav").unwrap_err();
        assert!(matches!(err, ObjectUrlError::InvalidUrl(_)));
    }

    #[test]
    fn test_to_file_after_revoke() {
        let registry = ObjectUrlRegistry::new().arc();
        let url = registry.create(vec![1u8], "audio/wav");
        let raw = url.as_str().to_string();
        drop(url);

        let err = registry.to_file(&raw, "a.wav").unwrap_err();
        assert!(matches!(err, ObjectUrlError::Revoked(_)));
    }
}
