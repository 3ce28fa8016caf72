//! Media Recorder Port - 麦克风采集抽象

use async_trait::async_trait;
use thiserror::Error;

/// 采集错误
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media recording is not supported in this environment")]
    Unsupported,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Recorder is not recording")]
    NotRecording,
}

/// 一次录音的结果
#[derive(Debug, Clone)]
pub struct RecordedAudio {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Media Recorder Port
#[async_trait]
pub trait MediaRecorderPort: Send + Sync {
    /// 获取输入设备并开始录音
    async fn start(&self) -> Result<(), MediaError>;

    /// 停止录音并返回编码后的音频
    async fn stop(&self) -> Result<RecordedAudio, MediaError>;
}
