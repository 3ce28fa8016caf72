//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::services::PopupLayout;
use crate::domain::selection::{Size, DEFAULT_OFFSET};
use crate::infrastructure::adapters::api::{ApiClientConfig, DEFAULT_BASE_URL};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 远端 API 配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 音色缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 录音/上传配置
    #[serde(default)]
    pub recorder: RecorderConfig,

    /// 克隆授权身份默认值
    #[serde(default)]
    pub consent: ConsentConfig,

    /// 浮动按钮尺寸与间距
    #[serde(default)]
    pub popup: PopupConfig,

    /// 本地存储配置
    #[serde(default)]
    pub storage: StorageConfig,

    /// 播放输出配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 远端 API 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// API 基础 URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// 默认 API key（最低优先级，可被运行时设置覆盖）
    #[serde(default)]
    pub key: Option<String>,

    /// 请求超时（秒）
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_timeout() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: None,
            timeout_secs: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig::new(self.base_url.clone()).with_timeout(self.timeout_secs)
    }

    /// 是否配置了非空 key
    pub fn has_key(&self) -> bool {
        self.key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// 音色缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 音色列表缓存有效期（秒）
    #[serde(default = "default_voices_ttl")]
    pub voices_ttl_secs: u64,
}

fn default_voices_ttl() -> u64 {
    24 * 60 * 60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            voices_ttl_secs: default_voices_ttl(),
        }
    }
}

impl CacheConfig {
    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.voices_ttl_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

/// 录音/上传配置
#[derive(Debug, Clone, Deserialize)]
pub struct RecorderConfig {
    /// 上传文件大小上限（字节）
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
}

fn default_max_upload_size() -> usize {
    10 * 1024 * 1024
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_upload_size: default_max_upload_size(),
        }
    }
}

/// 克隆授权身份默认值
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsentConfig {
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub email: Option<String>,
}

/// 浮动按钮配置
#[derive(Debug, Clone, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "default_popup_width")]
    pub width: f64,

    #[serde(default = "default_popup_height")]
    pub height: f64,

    /// 与选区的距离
    #[serde(default = "default_popup_offset")]
    pub offset: f64,

    /// 与视口边缘的最小距离
    #[serde(default = "default_popup_padding")]
    pub padding: f64,
}

fn default_popup_width() -> f64 {
    120.0
}

fn default_popup_height() -> f64 {
    40.0
}

fn default_popup_offset() -> f64 {
    DEFAULT_OFFSET
}

fn default_popup_padding() -> f64 {
    8.0
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            width: default_popup_width(),
            height: default_popup_height(),
            offset: default_popup_offset(),
            padding: default_popup_padding(),
        }
    }
}

impl PopupConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn layout(&self) -> PopupLayout {
        PopupLayout {
            size: self.size(),
            offset: self.offset,
            padding: self.padding,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// sled 数据库路径
    #[serde(default = "default_storage_path")]
    pub path: String,
}

fn default_storage_path() -> String {
    "data/speechly.sled".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// 播放输出配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 无声卡时音频写入的目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/audio")
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.api.base_url, "https://api.sws.speechify.com");
        assert!(config.api.key.is_none());
        assert_eq!(config.cache.voices_ttl_secs, 86400);
        assert_eq!(config.recorder.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.popup.offset, 10.0);
        assert_eq!(config.storage.path, "data/speechly.sled");
    }

    #[test]
    fn test_ttl_millis() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl_millis(), 86_400_000);
    }

    #[test]
    fn test_popup_layout_matches_orchestrator_default() {
        assert_eq!(PopupConfig::default().layout(), PopupLayout::default());
    }

    #[test]
    fn test_has_key_ignores_blank() {
        let mut config = ApiConfig::default();
        assert!(!config.has_key());
        config.key = Some("  ".to_string());
        assert!(!config.has_key());
        config.key = Some("sk".to_string());
        assert!(config.has_key());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "api": {"key": "abc"},
            "cache": {"voices_ttl_secs": 60}
        }))
        .unwrap();
        assert_eq!(config.api.key.as_deref(), Some("abc"));
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.cache.voices_ttl_secs, 60);
        assert_eq!(config.log.level, "info");
    }
}
