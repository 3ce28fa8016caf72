//! Speechly Widget - 可挂载的选区朗读组件
//!
//! 组合 VoiceService、VoiceSelector、RecordingController、SelectionOrchestrator；
//! 宿主只需提供 API key，推送选区快照，并订阅 `WidgetEvent` 渲染界面。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioPlayerPort, AudioProbePort, ClockPort, KeyValueStorePort, MediaRecorderPort,
    SpeechApiPort,
};
use crate::application::services::{
    AudioHandle, ConsentIdentity, PopupLayout, RecordingController, SelectionOrchestrator,
    VoiceSelector, VoiceService,
};
use crate::infrastructure::adapters::api::ApiKeyResolver;
use crate::infrastructure::events::{SelectionEvents, WidgetEvent, WidgetEventPublisher};
use crate::infrastructure::memory::ObjectUrlRegistry;

/// 组件参数
#[derive(Debug, Clone, Default)]
pub struct SpeechlyProps {
    /// 必填
    pub api_key: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
}

impl SpeechlyProps {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_identity(mut self, full_name: impl Into<String>, email: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self.email = Some(email.into());
        self
    }
}

/// 组件依赖
pub struct SpeechlyDeps {
    pub api: Arc<dyn SpeechApiPort>,
    pub keys: Arc<ApiKeyResolver>,
    pub player: Arc<dyn AudioPlayerPort>,
    /// None 表示没有麦克风，只能上传
    pub recorder: Option<Arc<dyn MediaRecorderPort>>,
    pub probe: Arc<dyn AudioProbePort>,
    pub store: Arc<dyn KeyValueStorePort>,
    pub clock: Arc<dyn ClockPort>,
    pub settings: SpeechlySettings,
}

/// 可调参数
#[derive(Debug, Clone, Copy)]
pub struct SpeechlySettings {
    pub voices_ttl_millis: i64,
    pub max_upload_size: usize,
    pub popup: PopupLayout,
}

impl Default for SpeechlySettings {
    fn default() -> Self {
        Self {
            voices_ttl_millis: 24 * 60 * 60 * 1000,
            max_upload_size: 10 * 1024 * 1024,
            popup: PopupLayout::default(),
        }
    }
}

/// 选区朗读组件
pub struct Speechly {
    props: SpeechlyProps,
    keys: Arc<ApiKeyResolver>,
    events: Arc<WidgetEventPublisher>,
    selection_events: Arc<SelectionEvents>,
    service: Arc<VoiceService>,
    selector: Arc<VoiceSelector>,
    recorder: Arc<RecordingController>,
    orchestrator: Arc<SelectionOrchestrator>,
    panel_open: AtomicBool,
    mounted: AtomicBool,
}

impl Speechly {
    pub fn new(props: SpeechlyProps, deps: SpeechlyDeps) -> Result<Self, ApplicationError> {
        if props.api_key.trim().is_empty() {
            return Err(ApplicationError::validation("api_key is required"));
        }

        let consent = ConsentIdentity::new(props.full_name.clone(), props.email.clone());
        let events = WidgetEventPublisher::new().arc();
        let urls = ObjectUrlRegistry::new().arc();

        let service = VoiceService::new(deps.api, deps.player, urls)
            .with_consent_defaults(consent.clone())
            .arc();

        let selector = VoiceSelector::new(
            service.clone(),
            deps.store.clone(),
            deps.clock,
            events.clone(),
            deps.settings.voices_ttl_millis,
        )
        .arc();

        let recorder = RecordingController::new(
            service.clone(),
            deps.recorder,
            deps.probe,
            deps.store.clone(),
            events.clone(),
            deps.settings.max_upload_size,
        )
        .with_consent(consent)
        .arc();

        let orchestrator = SelectionOrchestrator::new(service.clone(), deps.store, events.clone())
            .with_layout(deps.settings.popup)
            .arc();

        Ok(Self {
            props,
            keys: deps.keys,
            events,
            selection_events: SelectionEvents::new().arc(),
            service,
            selector,
            recorder,
            orchestrator,
            panel_open: AtomicBool::new(false),
            mounted: AtomicBool::new(false),
        })
    }

    /// 挂载：设置运行时 key，开始监听选区与音色刷新
    pub fn mount(&self) {
        if self.mounted.swap(true, Ordering::SeqCst) {
            return;
        }

        self.keys.set_api_key(&self.props.api_key);
        self.orchestrator.mount(&self.selection_events);
        self.selector.mount();
        tracing::info!(
            recording_supported = self.recorder.recording_supported(),
            "Speechly mounted"
        );
    }

    /// 卸载：停止播放、取消监听并释放录音资源
    pub fn unmount(&self) {
        if !self.mounted.swap(false, Ordering::SeqCst) {
            return;
        }

        self.orchestrator.unmount();
        self.selector.unmount();
        self.recorder.teardown();
        self.keys.clear_api_key();
        self.panel_open.store(false, Ordering::SeqCst);
        tracing::info!("Speechly unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// 浮动按钮：切换控制面板
    pub fn toggle_panel(&self) -> bool {
        let open = !self.panel_open.fetch_xor(true, Ordering::SeqCst);
        self.events.publish(WidgetEvent::PanelToggled { open });
        open
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open.load(Ordering::SeqCst)
    }

    /// 朗读输入框中的文本（"Read All"）
    pub async fn read_text(&self, text: &str) -> Result<Option<AudioHandle>, ApplicationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ApplicationError::validation("Text to read is empty"));
        }
        self.orchestrator.read(text).await
    }

    /// 朗读当前选区（弹出按钮）
    pub async fn read_selection(&self) -> Result<Option<AudioHandle>, ApplicationError> {
        self.orchestrator.read_selection().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    /// 宿主把选区快照推送到这里
    pub fn selection_events(&self) -> &Arc<SelectionEvents> {
        &self.selection_events
    }

    pub fn events(&self) -> &Arc<WidgetEventPublisher> {
        &self.events
    }

    pub fn service(&self) -> &Arc<VoiceService> {
        &self.service
    }

    pub fn selector(&self) -> &Arc<VoiceSelector> {
        &self.selector
    }

    pub fn recorder(&self) -> &Arc<RecordingController> {
        &self.recorder
    }

    pub fn orchestrator(&self) -> &Arc<SelectionOrchestrator> {
        &self.orchestrator
    }
}

impl Drop for Speechly {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::keys;
    use crate::domain::selection::{Rect, SelectionSnapshot, Size};
    use crate::infrastructure::adapters::fake::{
        fake_voice, FakeAudioPlayer, FakeAudioProbe, FakeMediaRecorder, FakeSpeechApi, ManualClock,
    };
    use crate::infrastructure::memory::InMemoryKeyValueStore;
    use std::time::Duration;

    struct Fixture {
        api: Arc<FakeSpeechApi>,
        keys: Arc<ApiKeyResolver>,
        store: Arc<InMemoryKeyValueStore>,
        widget: Speechly,
    }

    fn fixture(props: SpeechlyProps) -> Result<Fixture, ApplicationError> {
        let api = Arc::new(FakeSpeechApi::new(vec![
            fake_voice("p1", "personal"),
            fake_voice("v123", "shared"),
        ]));
        let keys = ApiKeyResolver::new(Some("env-key".to_string())).arc();
        let store = Arc::new(InMemoryKeyValueStore::new());
        let widget = Speechly::new(
            props,
            SpeechlyDeps {
                api: api.clone(),
                keys: keys.clone(),
                player: Arc::new(FakeAudioPlayer::new()),
                recorder: Some(Arc::new(FakeMediaRecorder::default())),
                probe: Arc::new(FakeAudioProbe::new()),
                store: store.clone(),
                clock: Arc::new(ManualClock::new(0)),
                settings: SpeechlySettings::default(),
            },
        )?;
        Ok(Fixture {
            api,
            keys,
            store,
            widget,
        })
    }

    #[tokio::test]
    async fn test_api_key_required() {
        assert!(fixture(SpeechlyProps::new("  ")).err().unwrap().is_validation());
    }

    #[tokio::test]
    async fn test_mount_sets_runtime_key() {
        let f = fixture(SpeechlyProps::new("widget-key")).unwrap();
        assert_eq!(f.keys.resolve(None).as_deref(), Some("env-key"));

        f.widget.mount();
        assert!(f.widget.is_mounted());
        assert_eq!(f.keys.resolve(None).as_deref(), Some("widget-key"));

        f.widget.unmount();
        assert!(!f.widget.is_mounted());
        assert_eq!(f.keys.resolve(None).as_deref(), Some("env-key"));
    }

    #[tokio::test]
    async fn test_mount_loads_voices_and_tracks_selection() {
        let f = fixture(SpeechlyProps::new("widget-key")).unwrap();
        f.widget.mount();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(f.api.list_calls(), 1);
        assert_eq!(f.widget.selector().voices().len(), 2);

        f.widget.selection_events().emit(Some(SelectionSnapshot::new(
            "Hello world",
            Some(Rect::new(10.0, 300.0, 100.0, 20.0)),
            Size::new(800.0, 600.0),
        )));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.widget.orchestrator().selection().text(), "Hello world");

        f.widget.unmount();
        assert!(!f.widget.selector().is_mounted());
        assert!(!f.widget.orchestrator().is_mounted());
        assert_eq!(f.widget.selection_events().listener_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_panel_publishes() {
        let f = fixture(SpeechlyProps::new("widget-key")).unwrap();
        let mut rx = f.widget.subscribe();

        assert!(f.widget.toggle_panel());
        assert!(f.widget.is_panel_open());
        assert_eq!(rx.recv().await.unwrap(), WidgetEvent::PanelToggled { open: true });

        assert!(!f.widget.toggle_panel());
        assert_eq!(rx.recv().await.unwrap(), WidgetEvent::PanelToggled { open: false });
    }

    #[tokio::test]
    async fn test_read_text() {
        let f = fixture(SpeechlyProps::new("widget-key")).unwrap();
        assert!(f.widget.read_text("   ").await.unwrap_err().is_validation());

        f.widget.selector().select_voice("v123").unwrap();
        assert_eq!(
            f.store.get(keys::SELECTED_VOICE_ID).unwrap().as_deref(),
            Some("v123")
        );

        let handle = f.widget.read_text(" Read all of this ").await.unwrap().unwrap();
        assert!(handle.is_playing());
        assert_eq!(f.api.last_speech().unwrap().input, "Read all of this");
        assert!(f.widget.orchestrator().playback().is_playing);
    }

    #[tokio::test]
    async fn test_props_identity_used_for_clone() {
        let f = fixture(SpeechlyProps::new("widget-key").with_identity("Ada", "ada@example.com"))
            .unwrap();

        f.widget.recorder().start_recording().await.unwrap();
        f.widget.recorder().stop_recording().await.unwrap();
        f.widget
            .recorder()
            .submit_clone("Ada", crate::domain::voice::Gender::Female)
            .await
            .unwrap();

        let form = f.api.last_clone().unwrap();
        assert!(form.consent.contains("Ada"));
        assert!(form.consent.contains("ada@example.com"));
    }
}
