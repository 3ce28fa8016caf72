//! Domain Layer - 领域层
//!
//! 包含四个限界上下文:
//! - Voice Context: 远端音色模型与展示规则
//! - Selection Context: 文本选区与浮动按钮定位
//! - Recording Context: 录音/上传状态机
//! - Audio Context: 音频格式与文件

pub mod audio;
pub mod recording;
pub mod selection;
pub mod voice;
