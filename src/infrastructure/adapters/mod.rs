//! Adapters - 外部服务适配器
//!
//! - api: 远端语音 API（HTTP）
//! - playback: 音频输出
//! - media: 音频探测与麦克风采集
//! - fake: 测试替身

pub mod api;
pub mod fake;
pub mod media;
pub mod playback;

pub use api::{ApiClient, ApiClientConfig, ApiKeyResolver, HttpSpeechApi};
pub use media::SymphoniaAudioProbe;
pub use playback::FileAudioSink;
