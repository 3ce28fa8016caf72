//! HTTP Speech API - SpeechApiPort 的 HTTP 实现

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

use super::client::ApiClient;
use crate::application::ports::{
    ApiError, CloneVoiceForm, SpeechApiPort, SpeechRequest, SpeechResponse,
};
use crate::domain::audio::AudioFile;
use crate::domain::voice::{AvatarImage, Voice, VoiceCloneResult};

const VOICES_PATH: &str = "/v1/voices";
const SPEECH_PATH: &str = "/v1/audio/speech";

/// 基于 ApiClient 的 Speech API
pub struct HttpSpeechApi {
    client: Arc<ApiClient>,
}

impl HttpSpeechApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }
}

fn file_part(name: String, mime_type: String, data: Vec<u8>) -> Result<Part, ApiError> {
    Part::bytes(data)
        .file_name(name)
        .mime_str(&mime_type)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid MIME type {}: {}", mime_type, e)))
}

fn sample_part(sample: AudioFile) -> Result<Part, ApiError> {
    let (name, mime_type) = (sample.name().to_string(), sample.mime_type().to_string());
    file_part(name, mime_type, sample.into_data())
}

fn avatar_part(avatar: AvatarImage) -> Result<Part, ApiError> {
    let (name, mime_type) = (avatar.name().to_string(), avatar.mime_type().to_string());
    file_part(name, mime_type, avatar.into_data())
}

/// 构建克隆音色的 multipart 表单
pub fn clone_voice_form(form: CloneVoiceForm) -> Result<Form, ApiError> {
    let mut multipart = Form::new()
        .text("name", form.name)
        .text("gender", form.gender.as_str().to_string())
        .text("consent", form.consent)
        .part("sample", sample_part(form.sample)?);

    if let Some(avatar) = form.avatar {
        multipart = multipart.part("avatar", avatar_part(avatar)?);
    }

    Ok(multipart)
}

#[async_trait]
impl SpeechApiPort for HttpSpeechApi {
    async fn list_voices(&self) -> Result<Vec<Voice>, ApiError> {
        let voices: Vec<Voice> = self.client.get(VOICES_PATH).await?;
        tracing::debug!(count = voices.len(), "Fetched voices");
        Ok(voices)
    }

    async fn clone_voice(&self, form: CloneVoiceForm) -> Result<VoiceCloneResult, ApiError> {
        tracing::info!(
            name = %form.name,
            gender = %form.gender,
            sample = %form.sample.name(),
            sample_size = form.sample.size(),
            has_avatar = form.avatar.is_some(),
            "Cloning voice"
        );

        let multipart = clone_voice_form(form)?;
        let voice: VoiceCloneResult = self.client.post_multipart(VOICES_PATH, multipart).await?;

        tracing::info!(voice_id = %voice.id, "Voice cloned");
        Ok(voice)
    }

    async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse, ApiError> {
        tracing::debug!(
            voice_id = %request.voice_id,
            text_len = request.input.len(),
            "Synthesizing speech"
        );

        let response: SpeechResponse = self.client.post_json(SPEECH_PATH, &request).await?;

        tracing::debug!(
            audio_format = %response.audio_format,
            billable_characters = response.billable_characters_count,
            "Speech synthesized"
        );
        Ok(response)
    }
}
