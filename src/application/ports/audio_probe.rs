//! Audio Probe Port - 上传文件可解码性校验

use async_trait::async_trait;
use thiserror::Error;

/// 探测错误
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Invalid audio file: {0}")]
    InvalidAudio(String),
}

/// 探测得到的音频元数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioInfo {
    pub codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<usize>,
    pub duration_ms: Option<u64>,
}

/// Audio Probe Port
///
/// 只读取容器头与轨道参数，不解码音频数据
#[async_trait]
pub trait AudioProbePort: Send + Sync {
    async fn probe(&self, data: &[u8], mime_type: &str) -> Result<AudioInfo, ProbeError>;
}
