//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `SPEECHLY_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `SPEECHLY_API__KEY=sk-...`
/// - `SPEECHLY_API__BASE_URL=http://localhost:9000`
/// - `SPEECHLY_CACHE__VOICES_TTL_SECS=3600`
/// - `SPEECHLY_CONSENT__EMAIL=me@example.com`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    let defaults = AppConfig::default();
    builder = builder
        .set_default("api.base_url", defaults.api.base_url)?
        .set_default("api.timeout_secs", defaults.api.timeout_secs)?
        .set_default("cache.voices_ttl_secs", defaults.cache.voices_ttl_secs)?
        .set_default(
            "recorder.max_upload_size",
            defaults.recorder.max_upload_size as u64,
        )?
        .set_default("popup.width", defaults.popup.width)?
        .set_default("popup.height", defaults.popup.height)?
        .set_default("popup.offset", defaults.popup.offset)?
        .set_default("popup.padding", defaults.popup.padding)?
        .set_default("storage.path", defaults.storage.path)?
        .set_default(
            "playback.output_dir",
            defaults.playback.output_dir.to_string_lossy().to_string(),
        )?
        .set_default("log.level", defaults.log.level)?
        .set_default("log.json", defaults.log.json)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: SPEECHLY_API__KEY=sk-xxx
    builder = builder.add_source(
        Environment::with_prefix("SPEECHLY")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.api.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "API base URL cannot be empty".to_string(),
        ));
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "API timeout cannot be 0".to_string(),
        ));
    }

    if config.recorder.max_upload_size == 0 {
        return Err(ConfigError::ValidationError(
            "Max upload size cannot be 0".to_string(),
        ));
    }

    if config.popup.width <= 0.0 || config.popup.height <= 0.0 {
        return Err(ConfigError::ValidationError(
            "Popup size must be positive".to_string(),
        ));
    }

    if config.popup.offset < 0.0 || config.popup.padding < 0.0 {
        return Err(ConfigError::ValidationError(
            "Popup offset and padding cannot be negative".to_string(),
        ));
    }

    if config.storage.path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Storage path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（key 不会被打印）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Speechly Configuration ===");
    tracing::info!("API Base URL: {}", config.api.base_url);
    tracing::info!("API Timeout: {}s", config.api.timeout_secs);
    tracing::info!("API Key Configured: {}", config.api.has_key());
    tracing::info!("Voices Cache TTL: {}s", config.cache.voices_ttl_secs);
    tracing::info!("Max Upload Size: {} bytes", config.recorder.max_upload_size);
    tracing::info!(
        "Consent Identity: {}",
        if config.consent.full_name.is_some() && config.consent.email.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    tracing::info!("Storage: {}", config.storage.path);
    tracing::info!("Playback Output: {:?}", config.playback.output_dir);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("==============================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_base_url() {
        let mut config = AppConfig::default();
        config.api.base_url = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_upload_size() {
        let mut config = AppConfig::default();
        config.recorder.max_upload_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_negative_offset() {
        let mut config = AppConfig::default();
        config.popup.offset = -1.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "http://localhost:9000"
timeout_secs = 5

[consent]
full_name = "Ada Lovelace"
email = "ada@example.com"
"#
        )
        .unwrap();

        let config = load_config_from_path(Some(file.path())).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.consent.full_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(config.cache.voices_ttl_secs, 86400);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[recorder]\nmax_upload_size = 0").unwrap();

        assert!(matches!(
            load_config_from_path(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
