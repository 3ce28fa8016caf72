//! Recording Controller - 录音/上传控制器
//!
//! 状态机见 `RecorderState`。同一时刻只有一段“当前音频”（录音或上传）；
//! 新的录音/上传成功后替换旧的并释放旧 URL，失败时保持原状。

use std::sync::{Arc, Mutex, MutexGuard};

use super::audio_handle::AudioHandle;
use super::voice_service::{CloneVoiceRequest, ConsentIdentity, VoiceService};
use crate::application::error::ApplicationError;
use crate::application::ports::{keys, AudioProbePort, KeyValueStorePort, MediaRecorderPort};
use crate::domain::audio::{AudioFile, AudioFormat};
use crate::domain::recording::{AudioSource, RecorderEvent, RecorderState};
use crate::domain::voice::{Gender, VoiceCloneResult};
use crate::infrastructure::events::{NotificationLevel, WidgetEvent, WidgetEventPublisher};
use crate::infrastructure::memory::ObjectUrl;

/// 新音频就绪回调：(url, 来源)
pub type AudioReadyCallback = Box<dyn Fn(&str, AudioSource) + Send + Sync>;
/// 错误回调
pub type ErrorCallback = Box<dyn Fn(&ApplicationError) + Send + Sync>;

/// 当前音频
struct CurrentAudio {
    url: ObjectUrl,
    source: AudioSource,
    mime_type: String,
}

#[derive(Default)]
struct ControllerState {
    state: RecorderState,
    current: Option<CurrentAudio>,
    preview: Option<AudioHandle>,
}

/// 录音/上传控制器
pub struct RecordingController {
    service: Arc<VoiceService>,
    recorder: Option<Arc<dyn MediaRecorderPort>>,
    probe: Arc<dyn AudioProbePort>,
    store: Arc<dyn KeyValueStorePort>,
    events: Arc<WidgetEventPublisher>,
    max_upload_size: usize,
    consent: ConsentIdentity,
    inner: Mutex<ControllerState>,
    on_audio_ready: Option<AudioReadyCallback>,
    on_error: Option<ErrorCallback>,
}

impl RecordingController {
    /// `recorder` 为 None 表示运行环境没有录音能力（仍可上传）
    pub fn new(
        service: Arc<VoiceService>,
        recorder: Option<Arc<dyn MediaRecorderPort>>,
        probe: Arc<dyn AudioProbePort>,
        store: Arc<dyn KeyValueStorePort>,
        events: Arc<WidgetEventPublisher>,
        max_upload_size: usize,
    ) -> Self {
        Self {
            service,
            recorder,
            probe,
            store,
            events,
            max_upload_size,
            consent: ConsentIdentity::default(),
            inner: Mutex::new(ControllerState::default()),
            on_audio_ready: None,
            on_error: None,
        }
    }

    pub fn with_consent(mut self, consent: ConsentIdentity) -> Self {
        self.consent = consent;
        self
    }

    pub fn on_audio_ready(mut self, callback: AudioReadyCallback) -> Self {
        self.on_audio_ready = Some(callback);
        self
    }

    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn inner(&self) -> MutexGuard<'_, ControllerState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn recording_supported(&self) -> bool {
        self.recorder.is_some()
    }

    pub fn state(&self) -> RecorderState {
        self.inner().state
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size
    }

    pub fn current_audio_url(&self) -> Option<String> {
        self.inner().current.as_ref().map(|c| c.url.as_str().to_string())
    }

    pub fn current_source(&self) -> Option<AudioSource> {
        self.inner().current.as_ref().map(|c| c.source)
    }

    pub fn has_audio(&self) -> bool {
        self.inner().current.is_some()
    }

    fn apply(&self, event: RecorderEvent) -> Result<RecorderState, ApplicationError> {
        let next = {
            let mut inner = self.inner();
            let next = inner.state.transition(event)?;
            inner.state = next;
            next
        };
        tracing::debug!(event = ?event, state = next.as_str(), "Recorder state changed");
        self.events
            .publish(WidgetEvent::RecorderStateChanged { state: next });
        Ok(next)
    }

    fn fail(&self, err: ApplicationError) -> ApplicationError {
        tracing::warn!(error = %err, "Recorder operation failed");
        self.events.notify(NotificationLevel::Error, err.to_string());
        if let Some(callback) = &self.on_error {
            callback(&err);
        }
        err
    }

    /// 替换当前音频；旧 URL 在锁外释放
    fn replace_current(&self, url: ObjectUrl, source: AudioSource, mime_type: String) -> String {
        let url_str = url.as_str().to_string();
        let (previous, preview) = {
            let mut inner = self.inner();
            let previous = inner.current.replace(CurrentAudio {
                url,
                source,
                mime_type,
            });
            (previous, inner.preview.take())
        };
        if let Some(preview) = preview {
            let _ = preview.stop();
        }
        drop(previous);

        tracing::info!(url = %url_str, source = ?source, "Current audio replaced");
        if let Some(callback) = &self.on_audio_ready {
            callback(&url_str, source);
        }
        url_str
    }

    /// 开始录音
    pub async fn start_recording(&self) -> Result<(), ApplicationError> {
        let Some(recorder) = self.recorder.clone() else {
            return Err(self.fail(ApplicationError::UnsupportedEnvironment(
                "Recording is not supported in this environment".to_string(),
            )));
        };

        self.apply(RecorderEvent::StartRecording)
            .map_err(|e| self.fail(e))?;

        match recorder.start().await {
            Ok(()) => {
                self.apply(RecorderEvent::MediaAcquired)?;
                tracing::info!("Recording started");
                Ok(())
            }
            Err(e) => {
                self.apply(RecorderEvent::AcquireFailed)?;
                Err(self.fail(e.into()))
            }
        }
    }

    /// 停止录音，录音成为当前音频
    pub async fn stop_recording(&self) -> Result<String, ApplicationError> {
        let recorder = match (&self.recorder, self.state()) {
            (Some(recorder), RecorderState::Recording) => Arc::clone(recorder),
            (_, state) => {
                return Err(self.fail(ApplicationError::invalid_state(format!(
                    "Cannot stop recording in state {}",
                    state.as_str()
                ))))
            }
        };

        let result = recorder.stop().await;
        self.apply(RecorderEvent::StopRecording)?;

        let recorded = result.map_err(|e| self.fail(e.into()))?;
        if recorded.data.is_empty() {
            return Err(self.fail(ApplicationError::validation("Recording is empty")));
        }

        let url = self
            .service
            .urls()
            .create(recorded.data, &recorded.mime_type);
        Ok(self.replace_current(url, AudioSource::Recorded, recorded.mime_type))
    }

    /// 上传音频文件
    ///
    /// 依次校验：MIME 为 audio/*、大小不超过上限、可解码
    pub async fn upload(&self, file: AudioFile) -> Result<String, ApplicationError> {
        self.apply(RecorderEvent::StartUpload)
            .map_err(|e| self.fail(e))?;

        let result = self.validate_upload(&file).await;
        self.apply(RecorderEvent::UploadFinished)?;
        result.map_err(|e| self.fail(e))?;

        let mime_type = file.mime_type().to_string();
        tracing::info!(name = %file.name(), size = file.size(), mime_type = %mime_type, "Audio uploaded");

        let url = self.service.urls().create(file.into_data(), &mime_type);
        Ok(self.replace_current(url, AudioSource::Uploaded, mime_type))
    }

    async fn validate_upload(&self, file: &AudioFile) -> Result<(), ApplicationError> {
        if !file.is_audio() {
            return Err(ApplicationError::validation(format!(
                "Unsupported file type: {}",
                file.mime_type()
            )));
        }
        if file.is_empty() {
            return Err(ApplicationError::validation("Audio file is empty"));
        }
        if file.size() > self.max_upload_size as u64 {
            return Err(ApplicationError::validation(format!(
                "File is too large ({} bytes, max {} bytes)",
                file.size(),
                self.max_upload_size
            )));
        }

        self.probe.probe(file.data(), file.mime_type()).await?;
        Ok(())
    }

    /// 用当前音频克隆音色
    ///
    /// 成功后保存为选中音色、触发音色列表刷新并清空当前音频
    pub async fn submit_clone(
        &self,
        name: &str,
        gender: Gender,
    ) -> Result<VoiceCloneResult, ApplicationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.fail(ApplicationError::validation("Voice name is required")));
        }

        let (state, current) = {
            let inner = self.inner();
            let current = inner
                .current
                .as_ref()
                .map(|c| (c.url.as_str().to_string(), c.source, c.mime_type.clone()));
            (inner.state, current)
        };

        if state.is_busy() {
            return Err(self.fail(ApplicationError::invalid_state(format!(
                "Cannot clone while {}",
                state.as_str()
            ))));
        }
        let Some((url, source, mime_type)) = current else {
            return Err(self.fail(ApplicationError::validation(
                "Record or upload a voice sample first",
            )));
        };

        let extension = match source {
            AudioSource::Recorded => "wav",
            AudioSource::Uploaded => AudioFormat::from_mime_type(&mime_type)
                .map(|f| f.extension())
                .unwrap_or("mp3"),
        };
        let filename = format!("{}.{}", name, extension);

        let file = self
            .service
            .blob_url_to_file(&url, &filename)
            .map_err(|e| self.fail(e))?;

        let mut request = CloneVoiceRequest::new(file, name, gender);
        request.full_name = self.consent.full_name.clone();
        request.email = self.consent.email.clone();

        let voice = self
            .service
            .clone_voice(request)
            .await
            .map_err(|e| self.fail(e))?;

        if let Err(e) = self
            .store
            .set(keys::SELECTED_VOICE_ID, &voice.id)
            .and_then(|_| self.store.set(keys::SELECTED_VOICE_NAME, &voice.display_name))
        {
            tracing::warn!(error = %e, "Failed to persist cloned voice selection");
        }

        self.service.trigger_refetch();
        self.events.publish(WidgetEvent::VoiceCloned {
            voice_id: voice.id.clone(),
            display_name: voice.display_name.clone(),
        });
        self.events.notify(
            NotificationLevel::Success,
            format!("Voice \"{}\" created", voice.display_name),
        );

        self.reset();
        Ok(voice)
    }

    /// 试听当前音频
    pub async fn preview(&self) -> Result<AudioHandle, ApplicationError> {
        let (blob, previous) = {
            let mut inner = self.inner();
            let blob = inner.current.as_ref().and_then(|c| c.url.blob());
            (blob, inner.preview.take())
        };
        if let Some(previous) = previous {
            let _ = previous.stop();
        }

        let blob = blob.ok_or_else(|| ApplicationError::invalid_state("No audio to preview"))?;
        let format = AudioFormat::from_mime_type(&blob.mime_type).unwrap_or_default();

        let handle = self.service.play_data(blob.data, format).await?;
        self.inner().preview = Some(handle.clone());
        Ok(handle)
    }

    pub fn stop_preview(&self) {
        let preview = self.inner().preview.take();
        if let Some(preview) = preview {
            let _ = preview.stop();
        }
    }

    /// 清空当前音频（表单重置）
    pub fn reset(&self) {
        let (current, preview) = {
            let mut inner = self.inner();
            (inner.current.take(), inner.preview.take())
        };
        if let Some(preview) = preview {
            let _ = preview.stop();
        }
        drop(current);
    }

    /// 释放所有资源；录音进行中时在后台停止录音器
    pub fn teardown(&self) {
        let was_recording = {
            let mut inner = self.inner();
            let was_recording = inner.state == RecorderState::Recording;
            inner.state = RecorderState::Idle;
            was_recording
        };
        self.reset();

        if was_recording {
            if let (Some(recorder), Ok(runtime)) =
                (self.recorder.clone(), tokio::runtime::Handle::try_current())
            {
                runtime.spawn(async move {
                    let _ = recorder.stop().await;
                });
            }
        }
        tracing::debug!("Recording controller torn down");
    }
}

impl Drop for RecordingController {
    fn drop(&mut self) {
        self.teardown();
    }
}
