//! Voice Service - 音色列表、克隆、合成与播放
//!
//! 所有远端调用都走 SpeechApiPort；失败统一映射为 ApplicationError，不做本地降级。

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;

use super::audio_handle::AudioHandle;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioClip, AudioPlayerPort, CloneVoiceForm, SpeechApiPort, SpeechOptions, SpeechRequest,
    SpeechResponse,
};
use crate::domain::audio::{AudioFile, AudioFormat};
use crate::domain::voice::{AvatarImage, Gender, Voice, VoiceCloneResult};
use crate::infrastructure::events::RefetchChannel;
use crate::infrastructure::memory::ObjectUrlRegistry;

/// 克隆请求
#[derive(Debug, Clone)]
pub struct CloneVoiceRequest {
    pub audio_file: AudioFile,
    pub name: String,
    pub gender: Gender,
    pub avatar: Option<AvatarImage>,
    /// 授权人姓名；缺省时使用 ConsentIdentity 的默认值
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl CloneVoiceRequest {
    pub fn new(audio_file: AudioFile, name: impl Into<String>, gender: Gender) -> Self {
        Self {
            audio_file,
            name: name.into(),
            gender,
            avatar: None,
            full_name: None,
            email: None,
        }
    }

    pub fn with_consent(mut self, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self.email = Some(email.into());
        self
    }

    pub fn with_avatar(mut self, avatar: AvatarImage) -> Self {
        self.avatar = Some(avatar);
        self
    }
}

/// 克隆授权身份
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentIdentity {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl ConsentIdentity {
    pub fn new(full_name: Option<String>, email: Option<String>) -> Self {
        Self { full_name, email }
    }

    /// 按字段合并：`self` 优先，空白视为缺失
    pub fn or(&self, fallback: &ConsentIdentity) -> ConsentIdentity {
        fn pick(primary: &Option<String>, fallback: &Option<String>) -> Option<String> {
            primary
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| fallback.as_deref().filter(|v| !v.trim().is_empty()))
                .map(|v| v.trim().to_string())
        }

        ConsentIdentity {
            full_name: pick(&self.full_name, &fallback.full_name),
            email: pick(&self.email, &fallback.email),
        }
    }

    /// `{"fullName": ..., "email": ...}`
    fn to_consent_json(&self) -> Result<String, ApplicationError> {
        match (&self.full_name, &self.email) {
            (Some(full_name), Some(email)) => Ok(serde_json::json!({
                "fullName": full_name,
                "email": email,
            })
            .to_string()),
            _ => Err(ApplicationError::validation(
                "Consent requires a full name and an email",
            )),
        }
    }
}

/// speak_text 的结果
#[derive(Debug, Clone)]
pub struct SpokenText {
    pub handle: AudioHandle,
    pub response: SpeechResponse,
}

/// Voice Service
pub struct VoiceService {
    api: Arc<dyn SpeechApiPort>,
    player: Arc<dyn AudioPlayerPort>,
    urls: Arc<ObjectUrlRegistry>,
    refetch: RefetchChannel,
    consent_defaults: ConsentIdentity,
}

impl VoiceService {
    pub fn new(
        api: Arc<dyn SpeechApiPort>,
        player: Arc<dyn AudioPlayerPort>,
        urls: Arc<ObjectUrlRegistry>,
    ) -> Self {
        Self {
            api,
            player,
            urls,
            refetch: RefetchChannel::new(),
            consent_defaults: ConsentIdentity::default(),
        }
    }

    pub fn with_consent_defaults(mut self, consent: ConsentIdentity) -> Self {
        self.consent_defaults = consent;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn urls(&self) -> &Arc<ObjectUrlRegistry> {
        &self.urls
    }

    pub fn player(&self) -> &Arc<dyn AudioPlayerPort> {
        &self.player
    }

    /// 音色列表刷新通道（订阅方持有克隆）
    pub fn refetch(&self) -> &RefetchChannel {
        &self.refetch
    }

    /// 通知所有订阅方重新拉取音色列表
    pub fn trigger_refetch(&self) -> usize {
        self.refetch.trigger()
    }

    /// 获取音色列表
    pub async fn get_voices(&self) -> Result<Vec<Voice>, ApplicationError> {
        let voices = self.api.list_voices().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch voices");
            ApplicationError::from(e)
        })?;

        tracing::info!(count = voices.len(), "Voices fetched");
        Ok(voices)
    }

    /// 克隆音色
    ///
    /// 空文件、空名称、缺少授权身份都会在发请求前被拒绝
    pub async fn clone_voice(
        &self,
        request: CloneVoiceRequest,
    ) -> Result<VoiceCloneResult, ApplicationError> {
        if request.audio_file.is_empty() {
            return Err(ApplicationError::validation("Audio file is empty"));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(ApplicationError::validation("Voice name is required"));
        }

        if let Some(avatar) = &request.avatar {
            if avatar.is_empty() || !avatar.is_image() {
                return Err(ApplicationError::validation("Avatar must be a non-empty image"));
            }
        }

        let consent = ConsentIdentity::new(request.full_name.clone(), request.email.clone())
            .or(&self.consent_defaults)
            .to_consent_json()?;

        let sample_name = request.audio_file.normalized_name();
        let sample = AudioFile::new(
            sample_name,
            request.audio_file.mime_type().to_string(),
            request.audio_file.into_data(),
        );

        let form = CloneVoiceForm {
            name: name.to_string(),
            gender: request.gender,
            consent,
            sample,
            avatar: request.avatar,
        };

        let voice = self.api.clone_voice(form).await.map_err(|e| {
            tracing::error!(error = %e, "Voice clone failed");
            ApplicationError::from(e)
        })?;

        tracing::info!(voice_id = %voice.id, name = %voice.display_name, "Voice cloned");
        Ok(voice)
    }

    /// 文本转语音
    pub async fn text_to_speech(
        &self,
        text: &str,
        voice_id: &str,
        options: Option<SpeechOptions>,
    ) -> Result<SpeechResponse, ApplicationError> {
        if text.trim().is_empty() {
            return Err(ApplicationError::validation("Text is required"));
        }
        if voice_id.trim().is_empty() {
            return Err(ApplicationError::validation("Voice ID is required"));
        }

        let request = SpeechRequest::new(text, voice_id, options.unwrap_or_default());
        self.api.synthesize(request).await.map_err(|e| {
            tracing::error!(voice_id = %voice_id, error = %e, "Speech synthesis failed");
            ApplicationError::from(e)
        })
    }

    /// 解码 base64 音频并开始播放
    ///
    /// 音频登记为 Object URL，播放结束或被停止时自动释放
    pub async fn play_audio(
        &self,
        audio_data: &str,
        format: AudioFormat,
    ) -> Result<AudioHandle, ApplicationError> {
        let bytes = BASE64
            .decode(audio_data.trim())
            .map_err(|e| ApplicationError::validation(format!("Invalid audio data: {}", e)))?;
        self.play_data(Arc::from(bytes), format).await
    }

    /// 播放已解码的音频字节
    pub async fn play_data(
        &self,
        data: Arc<[u8]>,
        format: AudioFormat,
    ) -> Result<AudioHandle, ApplicationError> {
        if data.is_empty() {
            return Err(ApplicationError::validation("Audio data is empty"));
        }

        let object_url = self.urls.create(Arc::clone(&data), format.mime_type());
        let clip = AudioClip {
            url: object_url.as_str().to_string(),
            format,
            data,
        };

        // 播放失败时 object_url 被丢弃即释放
        let started = self.player.play(clip).await?;

        tracing::debug!(playback_id = %started.id, url = %object_url, format = %format, "Playback started");
        Ok(AudioHandle::start(
            started.id,
            object_url,
            Arc::clone(&self.player),
            started.ended,
        ))
    }

    /// 合成并播放
    pub async fn speak_text(
        &self,
        text: &str,
        voice_id: &str,
        options: Option<SpeechOptions>,
    ) -> Result<SpokenText, ApplicationError> {
        let response = self.text_to_speech(text, voice_id, options).await?;
        let handle = self
            .play_audio(&response.audio_data, response.audio_format)
            .await?;
        Ok(SpokenText { handle, response })
    }

    /// 把 blob URL 转为可上传的文件
    pub fn blob_url_to_file(&self, url: &str, filename: &str) -> Result<AudioFile, ApplicationError> {
        Ok(self.urls.to_file(url, filename)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::AudioState;
    use crate::infrastructure::adapters::fake::{fake_voice, FakeAudioPlayer, FakeSpeechApi};

    struct Fixture {
        api: Arc<FakeSpeechApi>,
        player: Arc<FakeAudioPlayer>,
        urls: Arc<ObjectUrlRegistry>,
        service: VoiceService,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(FakeSpeechApi::new(vec![fake_voice("v1", "shared")]));
        let player = Arc::new(FakeAudioPlayer::new());
        let urls = ObjectUrlRegistry::new().arc();
        let service = VoiceService::new(api.clone(), player.clone(), urls.clone());
        Fixture {
            api,
            player,
            urls,
            service,
        }
    }

    fn wav_file(name: &str, mime: &str) -> AudioFile {
        AudioFile::new(name, mime, vec![1, 2, 3, 4])
    }

    #[tokio::test]
    async fn test_get_voices() {
        let f = fixture();
        let voices = f.service.get_voices().await.unwrap();
        assert_eq!(voices.len(), 1);
        assert_eq!(f.api.list_calls(), 1);
    }

    #[tokio::test]
    async fn test_get_voices_propagates_status() {
        let f = fixture();
        f.api.fail_with(401, "unauthorized");

        let err = f.service.get_voices().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_clone_rejects_empty_file_without_request() {
        let f = fixture();
        let request = CloneVoiceRequest::new(AudioFile::new("a.wav", "audio/wav", vec![]), "Me", Gender::Male)
            .with_consent("Ada", "ada@example.com");

        let err = f.service.clone_voice(request).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.api.clone_calls(), 0);
    }

    #[tokio::test]
    async fn test_clone_rejects_blank_name() {
        let f = fixture();
        let request = CloneVoiceRequest::new(wav_file("a.wav", "audio/wav"), "  ", Gender::Male)
            .with_consent("Ada", "ada@example.com");

        assert!(f.service.clone_voice(request).await.unwrap_err().is_validation());
        assert_eq!(f.api.clone_calls(), 0);
    }

    #[tokio::test]
    async fn test_clone_requires_consent_identity() {
        let f = fixture();
        let request = CloneVoiceRequest::new(wav_file("a.wav", "audio/wav"), "Me", Gender::Male);

        assert!(f.service.clone_voice(request).await.unwrap_err().is_validation());
        assert_eq!(f.api.clone_calls(), 0);
    }

    #[tokio::test]
    async fn test_clone_builds_form() {
        let f = fixture();
        let service = f.service.with_consent_defaults(ConsentIdentity::new(
            Some("Default Name".to_string()),
            Some("default@example.com".to_string()),
        ));

        let request = CloneVoiceRequest {
            email: Some("me@example.com".to_string()),
            ..CloneVoiceRequest::new(wav_file("take.one.webm", "audio/wav"), " My Voice ", Gender::Female)
        };
        let voice = service.clone_voice(request).await.unwrap();
        assert!(voice.is_personal());
        assert_eq!(voice.display_name, "My Voice");

        let form = f.api.last_clone().unwrap();
        assert_eq!(form.name, "My Voice");
        assert_eq!(form.sample.name(), "take.wav");
        assert_eq!(form.sample.mime_type(), "audio/wav");

        let consent: serde_json::Value = serde_json::from_str(&form.consent).unwrap();
        assert_eq!(
            consent,
            serde_json::json!({"fullName": "Default Name", "email": "me@example.com"})
        );
    }

    #[tokio::test]
    async fn test_clone_avatar_must_be_image() {
        let f = fixture();
        let request = CloneVoiceRequest::new(wav_file("a.wav", "audio/wav"), "Me", Gender::Male)
            .with_consent("Ada", "ada@example.com")
            .with_avatar(AvatarImage::new("me.wav", "audio/wav", vec![1]));

        assert!(f.service.clone_voice(request).await.unwrap_err().is_validation());
        assert_eq!(f.api.clone_calls(), 0);

        let request = CloneVoiceRequest::new(wav_file("a.wav", "audio/wav"), "Me", Gender::Male)
            .with_consent("Ada", "ada@example.com")
            .with_avatar(AvatarImage::new("me.png", "image/png", vec![9, 9]));
        f.service.clone_voice(request).await.unwrap();

        let avatar = f.api.last_clone().unwrap().avatar.unwrap();
        assert_eq!(avatar.name(), "me.png");
        assert_eq!(avatar.mime_type(), "image/png");
    }

    #[tokio::test]
    async fn test_clone_failure_is_service_error() {
        let f = fixture();
        f.api.fail_with(500, "boom");
        let request = CloneVoiceRequest::new(wav_file("a.wav", "audio/wav"), "Me", Gender::Male)
            .with_consent("Ada", "ada@example.com");

        let err = f.service.clone_voice(request).await.unwrap_err();
        assert!(matches!(err, ApplicationError::ServiceError { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn test_tts_validates_before_network() {
        let f = fixture();
        assert!(f.service.text_to_speech("Hello", "", None).await.unwrap_err().is_validation());
        assert!(f.service.text_to_speech("   ", "v1", None).await.unwrap_err().is_validation());
        assert_eq!(f.api.synth_calls(), 0);
    }

    #[tokio::test]
    async fn test_tts_sends_options() {
        let f = fixture();
        let options = SpeechOptions {
            audio_format: Some(AudioFormat::Mp3),
            ..Default::default()
        };
        let response = f.service.text_to_speech("Hello", "v1", Some(options)).await.unwrap();
        assert_eq!(response.audio_format, AudioFormat::Mp3);

        let sent = f.api.last_speech().unwrap();
        assert_eq!(sent.input, "Hello");
        assert_eq!(sent.voice_id, "v1");
        assert_eq!(sent.audio_format, Some(AudioFormat::Mp3));
    }

    #[tokio::test]
    async fn test_play_audio_rejects_invalid_base64() {
        let f = fixture();
        let err = f.service.play_audio("!!not base64!!", AudioFormat::Wav).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(f.player.plays(), 0);
        assert_eq!(f.urls.live_count(), 0);
    }

    #[tokio::test]
    async fn test_play_failure_releases_url() {
        let f = fixture();
        f.player.fail_next();
        let err = f
            .service
            .play_audio(&BASE64.encode(b"audio"), AudioFormat::Wav)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::PlaybackError(_)));
        assert_eq!(f.urls.live_count(), 0);
    }

    #[tokio::test]
    async fn test_url_released_when_playback_ends() {
        let f = fixture();
        let handle = f
            .service
            .play_audio(&BASE64.encode(b"audio"), AudioFormat::Wav)
            .await
            .unwrap();

        assert!(handle.is_playing());
        assert!(handle.url().starts_with("blob:"));
        assert_eq!(f.urls.live_count(), 1);

        f.player.finish(handle.id());
        assert_eq!(handle.wait_finished().await, AudioState::Ended);
        assert_eq!(f.urls.live_count(), 0);
    }

    #[tokio::test]
    async fn test_pause_resume_stop() {
        let f = fixture();
        let handle = f
            .service
            .play_audio(&BASE64.encode(b"audio"), AudioFormat::Wav)
            .await
            .unwrap();

        handle.pause().unwrap();
        assert!(handle.is_paused());
        assert!(f.player.is_paused(handle.id()));

        handle.resume().unwrap();
        assert!(handle.is_playing());

        handle.stop().unwrap();
        assert_eq!(handle.state(), AudioState::Stopped);
        assert_eq!(f.urls.live_count(), 0);
        assert!(handle.pause().is_err());
        assert!(handle.stop().is_ok());
    }

    #[tokio::test]
    async fn test_speak_text() {
        let f = fixture();
        let spoken = f.service.speak_text("Hello world", "v1", None).await.unwrap();
        assert!(spoken.handle.is_playing());
        assert_eq!(spoken.response.billable_characters_count, 11);
        assert_eq!(f.api.synth_calls(), 1);
        assert_eq!(f.player.plays(), 1);
    }

    #[tokio::test]
    async fn test_refetch_reaches_subscribers() {
        let f = fixture();
        let mut rx = f.service.refetch().subscribe();
        assert_eq!(f.service.trigger_refetch(), 1);
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_blob_url_to_file() {
        let f = fixture();
        let url = f.urls.create(vec![1u8, 2], "audio/ogg");

        let file = f.service.blob_url_to_file(url.as_str(), "clip.ogg").unwrap();
        assert_eq!(file.mime_type(), "audio/ogg");
        assert_eq!(file.data(), &[1, 2]);

        assert!(f.service.blob_url_to_file("https://x/y.wav", "y.wav").unwrap_err().is_validation());
    }
}
