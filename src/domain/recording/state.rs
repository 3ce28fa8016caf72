//! 录音/上传状态机
//!
//! ```text
//! Idle ──start──▶ Acquiring ──acquired──▶ Recording ──stop──▶ Idle
//!   │                 │
//!   │                 └──failed──▶ Idle
//!   └──upload──▶ Uploading ──finished/failed──▶ Idle
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 录音控制器状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderState {
    #[default]
    Idle,
    Acquiring,
    Recording,
    Uploading,
}

/// 触发状态迁移的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderEvent {
    StartRecording,
    MediaAcquired,
    AcquireFailed,
    StopRecording,
    StartUpload,
    UploadFinished,
}

/// 非法迁移
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot apply {event:?} in state {state:?}")]
pub struct InvalidTransition {
    pub state: RecorderState,
    pub event: RecorderEvent,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Uploading => "uploading",
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// 计算迁移后的状态
    pub fn transition(self, event: RecorderEvent) -> Result<Self, InvalidTransition> {
        use RecorderEvent::*;
        use RecorderState::*;

        match (self, event) {
            (Idle, StartRecording) => Ok(Acquiring),
            (Acquiring, MediaAcquired) => Ok(Recording),
            (Acquiring, AcquireFailed) => Ok(Idle),
            (Recording, StopRecording) => Ok(Idle),
            (Idle, StartUpload) => Ok(Uploading),
            (Uploading, UploadFinished) => Ok(Idle),
            (state, event) => Err(InvalidTransition { state, event }),
        }
    }
}

/// 当前音频的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSource {
    Recorded,
    Uploaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_cycle() {
        let state = RecorderState::Idle
            .transition(RecorderEvent::StartRecording)
            .unwrap();
        assert_eq!(state, RecorderState::Acquiring);

        let state = state.transition(RecorderEvent::MediaAcquired).unwrap();
        assert_eq!(state, RecorderState::Recording);

        let state = state.transition(RecorderEvent::StopRecording).unwrap();
        assert_eq!(state, RecorderState::Idle);
    }

    #[test]
    fn test_upload_cycle() {
        let state = RecorderState::Idle
            .transition(RecorderEvent::StartUpload)
            .unwrap();
        assert!(state.is_busy());
        assert_eq!(
            state.transition(RecorderEvent::UploadFinished).unwrap(),
            RecorderState::Idle
        );
    }

    #[test]
    fn test_upload_rejected_while_recording() {
        let err = RecorderState::Recording
            .transition(RecorderEvent::StartUpload)
            .unwrap_err();
        assert_eq!(err.state, RecorderState::Recording);
        assert_eq!(err.event, RecorderEvent::StartUpload);
    }

    #[test]
    fn test_acquire_failure_returns_to_idle() {
        assert_eq!(
            RecorderState::Acquiring
                .transition(RecorderEvent::AcquireFailed)
                .unwrap(),
            RecorderState::Idle
        );
    }
}
