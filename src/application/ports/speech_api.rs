//! Speech API Port - 远端语音 API 抽象
//!
//! 定义音色列表、音色克隆、文本转语音三个远端调用，具体实现在 infrastructure/adapters/api 层
//!
//! 远端 API:
//! - GET  /v1/voices        -> Voice[]
//! - POST /v1/voices        multipart(name, gender, consent, sample, avatar?) -> Voice
//! - POST /v1/audio/speech  JSON {input, voice_id, ...} -> {audio_data(base64), ...}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::audio::{AudioFile, AudioFormat};
use crate::domain::voice::{AvatarImage, Gender, Voice, VoiceCloneResult};

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP 状态码（仅 HttpError 有）
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// 合成附加选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loudness_normalization: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_normalization: Option<bool>,
}

/// 调用方传入的 TTS 选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechOptions {
    pub audio_format: Option<AudioFormat>,
    pub language: Option<String>,
    pub model: Option<String>,
    pub options: Option<SynthesisOptions>,
}

/// TTS 请求体 (JSON)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechRequest {
    pub input: String,
    pub voice_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<SynthesisOptions>,
}

impl SpeechRequest {
    pub fn new(input: impl Into<String>, voice_id: impl Into<String>, options: SpeechOptions) -> Self {
        Self {
            input: input.into(),
            voice_id: voice_id.into(),
            audio_format: options.audio_format,
            language: options.language,
            model: options.model,
            options: options.options,
        }
    }
}

/// 单词/句子级时间标记
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechMark {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mark_type: Option<String>,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub end: u64,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub chunks: Vec<SpeechMark>,
}

/// TTS 响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechResponse {
    /// base64 编码的音频
    pub audio_data: String,
    pub audio_format: AudioFormat,
    #[serde(default)]
    pub billable_characters_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_marks: Option<SpeechMark>,
}

/// 克隆音色的 multipart 表单
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneVoiceForm {
    pub name: String,
    pub gender: Gender,
    /// JSON 字符串 `{"fullName": ..., "email": ...}`
    pub consent: String,
    /// 文件名已按 MIME 类型规范化
    pub sample: AudioFile,
    pub avatar: Option<AvatarImage>,
}

/// Speech API Port
#[async_trait]
pub trait SpeechApiPort: Send + Sync {
    /// 获取音色列表
    async fn list_voices(&self) -> Result<Vec<Voice>, ApiError>;

    /// 从音频样本克隆音色
    async fn clone_voice(&self, form: CloneVoiceForm) -> Result<VoiceCloneResult, ApiError>;

    /// 文本转语音
    async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_request_omits_unset_fields() {
        let request = SpeechRequest::new("Hello", "v1", SpeechOptions::default());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, serde_json::json!({"input": "Hello", "voice_id": "v1"}));
    }

    #[test]
    fn test_speech_request_with_options() {
        let options = SpeechOptions {
            audio_format: Some(AudioFormat::Mp3),
            language: Some("en-US".to_string()),
            model: None,
            options: Some(SynthesisOptions {
                loudness_normalization: Some(true),
                text_normalization: None,
            }),
        };
        let json = serde_json::to_value(SpeechRequest::new("Hi", "v2", options)).unwrap();
        assert_eq!(json["audio_format"], "mp3");
        assert_eq!(json["language"], "en-US");
        assert_eq!(json["options"], serde_json::json!({"loudness_normalization": true}));
    }

    #[test]
    fn test_speech_response_deserialize() {
        let json = r#"{
            "audio_data": "UklGRg==",
            "audio_format": "wav",
            "billable_characters_count": 11,
            "speech_marks": {"type": "sentence", "start": 0, "end": 11,
                             "start_time": 0, "end_time": 850.5, "value": "Hello world",
                             "chunks": [{"type": "word", "start": 0, "end": 5, "start_time": 0, "end_time": 300, "value": "Hello"}]}
        }"#;
        let response: SpeechResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.audio_format, AudioFormat::Wav);
        assert_eq!(response.billable_characters_count, 11);
        let marks = response.speech_marks.unwrap();
        assert_eq!(marks.chunks.len(), 1);
        assert_eq!(marks.chunks[0].value, "Hello");
    }

    #[test]
    fn test_api_error_status() {
        let err = ApiError::HttpError {
            status: 402,
            body: "quota".to_string(),
        };
        assert_eq!(err.status(), Some(402));
        assert_eq!(ApiError::Timeout.status(), None);
    }
}
