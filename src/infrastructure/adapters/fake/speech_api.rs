//! Fake Speech API - 用于测试的远端 API
//!
//! 不访问网络：音色列表、克隆结果、合成音频都由调用方预置，
//! 并记录调用次数与最近一次请求。

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    ApiError, CloneVoiceForm, SpeechApiPort, SpeechRequest, SpeechResponse,
};
use crate::domain::audio::AudioFormat;
use crate::domain::voice::{Gender, Voice, VoiceCloneResult, PERSONAL_VOICE_TYPE};

/// 构造一个测试用音色
pub fn fake_voice(id: &str, voice_type: &str) -> Voice {
    Voice {
        id: id.to_string(),
        display_name: format!("Voice {}", id),
        gender: Gender::Female,
        locale: "en-US".to_string(),
        voice_type: voice_type.to_string(),
        models: Vec::new(),
        avatar_image: None,
        preview_audio: None,
        tags: None,
    }
}

/// Fake Speech API
pub struct FakeSpeechApi {
    voices: Mutex<Vec<Voice>>,
    audio: Mutex<Vec<u8>>,
    failure: Mutex<Option<(u16, String)>>,
    synth_delays: Mutex<VecDeque<Duration>>,
    list_delays: Mutex<VecDeque<Duration>>,
    last_clone: Mutex<Option<CloneVoiceForm>>,
    last_speech: Mutex<Option<SpeechRequest>>,
    list_calls: AtomicUsize,
    clone_calls: AtomicUsize,
    synth_calls: AtomicUsize,
}

impl Default for FakeSpeechApi {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FakeSpeechApi {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self {
            voices: Mutex::new(voices),
            audio: Mutex::new(b"RIFF0000WAVEfake".to_vec()),
            failure: Mutex::new(None),
            synth_delays: Mutex::new(VecDeque::new()),
            list_delays: Mutex::new(VecDeque::new()),
            last_clone: Mutex::new(None),
            last_speech: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            clone_calls: AtomicUsize::new(0),
            synth_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_voices(&self, voices: Vec<Voice>) {
        *lock(&self.voices) = voices;
    }

    /// 合成返回的原始音频字节（返回时做 base64 编码）
    pub fn set_audio(&self, audio: Vec<u8>) {
        *lock(&self.audio) = audio;
    }

    /// 之后所有调用都返回 HTTP 错误
    pub fn fail_with(&self, status: u16, body: &str) {
        *lock(&self.failure) = Some((status, body.to_string()));
    }

    pub fn recover(&self) {
        *lock(&self.failure) = None;
    }

    /// 为接下来的合成调用依次设置延迟
    pub fn push_synth_delay(&self, delay: Duration) {
        lock(&self.synth_delays).push_back(delay);
    }

    /// 下一次 list_voices 先等待 `delay`
    pub fn push_list_delay(&self, delay: Duration) {
        lock(&self.list_delays).push_back(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn clone_calls(&self) -> usize {
        self.clone_calls.load(Ordering::SeqCst)
    }

    pub fn synth_calls(&self) -> usize {
        self.synth_calls.load(Ordering::SeqCst)
    }

    pub fn last_clone(&self) -> Option<CloneVoiceForm> {
        lock(&self.last_clone).clone()
    }

    pub fn last_speech(&self) -> Option<SpeechRequest> {
        lock(&self.last_speech).clone()
    }

    fn check_failure(&self) -> Result<(), ApiError> {
        match lock(&self.failure).as_ref() {
            Some((status, body)) => Err(ApiError::HttpError {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl SpeechApiPort for FakeSpeechApi {
    async fn list_voices(&self) -> Result<Vec<Voice>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = lock(&self.list_delays).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_failure()?;
        Ok(lock(&self.voices).clone())
    }

    async fn clone_voice(&self, form: CloneVoiceForm) -> Result<VoiceCloneResult, ApiError> {
        let n = self.clone_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.last_clone) = Some(form.clone());
        self.check_failure()?;

        let mut voice = fake_voice(&format!("cloned-{}", n), PERSONAL_VOICE_TYPE);
        voice.display_name = form.name;
        voice.gender = form.gender;
        lock(&self.voices).push(voice.clone());
        Ok(voice)
    }

    async fn synthesize(&self, request: SpeechRequest) -> Result<SpeechResponse, ApiError> {
        self.synth_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_speech) = Some(request.clone());

        let delay = lock(&self.synth_delays).pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_failure()?;

        let audio = lock(&self.audio).clone();
        Ok(SpeechResponse {
            audio_data: BASE64.encode(&audio),
            audio_format: request.audio_format.unwrap_or(AudioFormat::Wav),
            billable_characters_count: request.input.chars().count() as u64,
            speech_marks: None,
        })
    }
}
