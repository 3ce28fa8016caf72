//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechApi、AudioPlayer、MediaRecorder、KeyValueStore 等）
//! - services: 音色服务、音色选择、录音控制、选区朗读
//! - widget: 组合以上服务的可挂载组件
//! - error: 应用层错误定义

pub mod error;
pub mod ports;
pub mod services;
pub mod widget;

pub use error::ApplicationError;

pub use ports::{
    // Speech API
    ApiError,
    CloneVoiceForm,
    SpeechApiPort,
    SpeechOptions,
    SpeechRequest,
    SpeechResponse,
    // Playback
    AudioClip,
    AudioPlayerPort,
    PlaybackError,
    // Media
    AudioProbePort,
    MediaError,
    MediaRecorderPort,
    ProbeError,
    // Store & clock
    keys,
    ClockPort,
    KeyValueStorePort,
    StoreError,
    SystemClock,
};

pub use services::{
    AudioHandle, AudioState, CloneVoiceRequest, ConsentIdentity, PlaybackSnapshot, PopupLayout,
    RecordingController, SelectionOrchestrator, SpokenText, VoiceSelector, VoiceService,
};

pub use widget::{Speechly, SpeechlyDeps, SpeechlyProps, SpeechlySettings};
