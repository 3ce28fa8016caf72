//! Speechly - 选区朗读引擎
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Voice Context: 音色模型与展示规则
//! - Selection Context: 选区与浮动按钮定位
//! - Recording Context: 录音/上传状态机
//! - Audio Context: 音频格式
//!
//! 应用层 (application/):
//! - Ports: 端口定义（SpeechApi、AudioPlayer、MediaRecorder、AudioProbe、KeyValueStore、Clock）
//! - Services: VoiceService、VoiceSelector、RecordingController、SelectionOrchestrator
//! - Widget: 可挂载组件 `Speechly`
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: HTTP API 客户端、播放输出、录音、音频探测
//! - Memory: Object URL 注册表、内存键值存储
//! - Persistence: Sled 存储
//! - Events: 组件事件、刷新通道、选区事件

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{Speechly, SpeechlyProps};
pub use config::{load_config, AppConfig};
