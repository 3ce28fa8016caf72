//! Application Services - 用例编排
//!
//! - voice_service: 音色接口封装（列表、克隆、合成、播放）
//! - voice_selector: 音色缓存与选择
//! - recording_controller: 录音/上传与克隆提交
//! - selection_orchestrator: 选区朗读
//! - audio_handle: 播放句柄

mod audio_handle;
mod recording_controller;
mod selection_orchestrator;
mod voice_selector;
mod voice_service;

pub use audio_handle::{AudioHandle, AudioState};
pub use recording_controller::{AudioReadyCallback, ErrorCallback, RecordingController};
pub use selection_orchestrator::{PlaybackSnapshot, PopupLayout, SelectionOrchestrator};
pub use voice_selector::VoiceSelector;
pub use voice_service::{CloneVoiceRequest, ConsentIdentity, SpokenText, VoiceService};
