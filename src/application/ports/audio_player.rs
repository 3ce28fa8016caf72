//! Audio Player Port - 音频播放抽象
//!
//! 播放器负责解码与输出；应用层只管理播放生命周期（play/pause/resume/stop）

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::domain::audio::AudioFormat;

/// 播放错误
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Playback not found: {0}")]
    NotFound(Uuid),

    #[error("Unsupported audio: {0}")]
    Unsupported(String),

    #[error("Output device error: {0}")]
    DeviceError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// 待播放的音频片段
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// 对应的 object URL（`blob:...`）
    pub url: String,
    pub format: AudioFormat,
    pub data: Arc<[u8]>,
}

/// 播放已开始
///
/// `ended` 在播放自然结束时收到 `()`；播放被停止时发送端被丢弃
#[derive(Debug)]
pub struct PlaybackStarted {
    pub id: Uuid,
    pub ended: oneshot::Receiver<()>,
}

/// Audio Player Port
#[async_trait]
pub trait AudioPlayerPort: Send + Sync {
    /// 开始播放
    async fn play(&self, clip: AudioClip) -> Result<PlaybackStarted, PlaybackError>;

    /// 暂停（保留播放位置）
    fn pause(&self, id: Uuid) -> Result<(), PlaybackError>;

    /// 从暂停位置继续
    fn resume(&self, id: Uuid) -> Result<(), PlaybackError>;

    /// 停止并释放播放资源
    fn stop(&self, id: Uuid) -> Result<(), PlaybackError>;
}
