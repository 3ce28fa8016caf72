//! 应用层错误定义
//!
//! 统一的服务层错误类型；所有错误都不会自动重试

use thiserror::Error;

use crate::application::ports::{
    ApiError, MediaError, PlaybackError, ProbeError, StoreError,
};
use crate::domain::recording::InvalidTransition;
use crate::infrastructure::memory::ObjectUrlError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 输入校验失败（空文件、空文本、空音色 ID 等），直接提示用户
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 远端服务调用失败；HTTP 失败时携带状态码
    #[error("Service error: {message}")]
    ServiceError { status: Option<u16>, message: String },

    /// 运行环境缺少录音能力
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 本地存储错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 播放错误
    #[error("Playback error: {0}")]
    PlaybackError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    /// 远端 HTTP 状态码
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServiceError { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationError(_))
    }
}

impl From<ApiError> for ApplicationError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::MissingApiKey => Self::ValidationError(err.to_string()),
            other => Self::ServiceError {
                status: other.status(),
                message: other.to_string(),
            },
        }
    }
}

impl From<StoreError> for ApplicationError {
    fn from(err: StoreError) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<PlaybackError> for ApplicationError {
    fn from(err: PlaybackError) -> Self {
        Self::PlaybackError(err.to_string())
    }
}

impl From<MediaError> for ApplicationError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Unsupported => Self::UnsupportedEnvironment(err.to_string()),
            MediaError::NotRecording => Self::InvalidState(err.to_string()),
            other => Self::InternalError(other.to_string()),
        }
    }
}

impl From<ProbeError> for ApplicationError {
    fn from(err: ProbeError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<ObjectUrlError> for ApplicationError {
    fn from(err: ObjectUrlError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<InvalidTransition> for ApplicationError {
    fn from(err: InvalidTransition) -> Self {
        Self::InvalidState(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_failure_keeps_status() {
        let err: ApplicationError = ApiError::HttpError {
            status: 401,
            body: "unauthorized".to_string(),
        }
        .into();
        assert_eq!(err.status(), Some(401));
        assert!(matches!(err, ApplicationError::ServiceError { .. }));
    }

    #[test]
    fn test_network_failure_has_no_status() {
        let err: ApplicationError = ApiError::NetworkError("refused".to_string()).into();
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_missing_key_is_validation() {
        let err: ApplicationError = ApiError::MissingApiKey.into();
        assert!(err.is_validation());
    }

    #[test]
    fn test_unsupported_media() {
        let err: ApplicationError = MediaError::Unsupported.into();
        assert!(matches!(err, ApplicationError::UnsupportedEnvironment(_)));
    }
}
