//! Recording Context - 录音/上传限界上下文

mod state;

pub use state::{AudioSource, InvalidTransition, RecorderEvent, RecorderState};
