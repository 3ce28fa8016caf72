//! Voice Context - 音色限界上下文
//!
//! 职责:
//! - 远端音色数据模型
//! - 音色展示过滤规则

mod aggregate;
mod presentation;
mod value_objects;

pub use aggregate::{Voice, VoiceCloneResult, PERSONAL_VOICE_TYPE};
pub use presentation::{presentable_voices, MAX_SHARED_VOICES};
pub use value_objects::{AvatarImage, Gender, VoiceLanguage, VoiceModel};
