//! Selection Orchestrator - 选区朗读编排
//!
//! - 选区变化：计算弹出按钮位置并发布事件
//! - 朗读：读取持久化的音色 ID，合成并播放；后发起的朗读覆盖先前的（last-request-wins）
//! - 挂载期间监听选区事件，卸载时通过同一个取消信号退出监听并停止播放

use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use super::audio_handle::AudioHandle;
use super::voice_service::VoiceService;
use crate::application::error::ApplicationError;
use crate::application::ports::{keys, KeyValueStorePort};
use crate::domain::selection::{
    compute_anchor, FloatingAnchor, FloatingRequest, Point, Selection, SelectionSnapshot, Size,
    DEFAULT_OFFSET,
};
use crate::infrastructure::events::{
    NotificationLevel, PlaybackStatus, SelectionChange, SelectionEvents, WidgetEvent,
    WidgetEventPublisher,
};

/// 弹出按钮的尺寸与间距
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupLayout {
    pub size: Size,
    pub offset: f64,
    pub padding: f64,
}

impl Default for PopupLayout {
    fn default() -> Self {
        Self {
            size: Size::new(120.0, 40.0),
            offset: DEFAULT_OFFSET,
            padding: 8.0,
        }
    }
}

/// 播放状态快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub is_paused: bool,
    pub is_loading: bool,
}

#[derive(Default)]
struct OrchestratorState {
    selection: Selection,
    viewport: Option<Size>,
    handle: Option<AudioHandle>,
    voice_id: Option<String>,
    /// 每次朗读或卸载递增；结果返回时代数不一致即丢弃
    generation: u64,
}

/// 选区朗读编排器
pub struct SelectionOrchestrator {
    service: Arc<VoiceService>,
    store: Arc<dyn KeyValueStorePort>,
    events: Arc<WidgetEventPublisher>,
    layout: PopupLayout,
    state: Mutex<OrchestratorState>,
    mounted: Mutex<Option<CancellationToken>>,
}

impl SelectionOrchestrator {
    pub fn new(
        service: Arc<VoiceService>,
        store: Arc<dyn KeyValueStorePort>,
        events: Arc<WidgetEventPublisher>,
    ) -> Self {
        Self {
            service,
            store,
            events,
            layout: PopupLayout::default(),
            state: Mutex::new(OrchestratorState::default()),
            mounted: Mutex::new(None),
        }
    }

    pub fn with_layout(mut self, layout: PopupLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 当前选区
    pub fn selection(&self) -> Selection {
        self.state().selection.clone()
    }

    /// 弹出按钮锚点；没有选区时为 None
    pub fn anchor(&self) -> Option<FloatingAnchor> {
        let state = self.state();
        self.anchor_for(state.selection.position(), state.viewport)
    }

    fn anchor_for(&self, position: Option<Point>, viewport: Option<Size>) -> Option<FloatingAnchor> {
        let (position, viewport) = (position?, viewport?);
        Some(compute_anchor(
            &FloatingRequest::new(position, self.layout.size, viewport)
                .with_offset(self.layout.offset)
                .with_padding(self.layout.padding),
        ))
    }

    fn publish_selection(&self, selection: &Selection, viewport: Option<Size>) {
        self.events.publish(WidgetEvent::SelectionChanged {
            text: selection.text().to_string(),
            position: selection.position(),
            anchor: self.anchor_for(selection.position(), viewport),
        });
    }

    /// 处理一次选区变化
    pub fn handle_selection_change(&self, change: SelectionChange) {
        let (selection, viewport) = match &change {
            Some(snapshot) => (Selection::from_snapshot(snapshot), Some(snapshot.viewport)),
            None => (Selection::empty(), None),
        };

        {
            let mut state = self.state();
            let is_loading = state.selection.is_loading;
            state.selection = selection.clone();
            state.selection.is_loading = is_loading;
            state.viewport = viewport;
        }

        tracing::trace!(text_len = selection.text().len(), "Selection changed");
        self.publish_selection(&selection, viewport);
    }

    /// 便捷入口：直接传入快照
    pub fn handle_snapshot(&self, snapshot: SelectionSnapshot) {
        self.handle_selection_change(Some(snapshot));
    }

    /// 朗读文本
    ///
    /// 未选择音色时发出警告通知并返回 `Ok(None)`；
    /// 结果到达时若已有更新的朗读或已卸载，停止并丢弃该结果，同样返回 `Ok(None)`
    pub async fn read(self: &Arc<Self>, text: &str) -> Result<Option<AudioHandle>, ApplicationError> {
        let voice_id = self
            .store
            .get(keys::SELECTED_VOICE_ID)?
            .filter(|id| !id.trim().is_empty());

        let Some(voice_id) = voice_id else {
            tracing::warn!("Read requested without a selected voice");
            self.events
                .notify(NotificationLevel::Warning, "Please select a voice first");
            return Ok(None);
        };

        let (generation, previous) = {
            let mut state = self.state();
            state.generation += 1;
            state.selection.is_loading = true;
            state.voice_id = Some(voice_id.clone());
            (state.generation, state.handle.take())
        };
        if let Some(previous) = previous {
            let _ = previous.stop();
        }
        self.events
            .publish_playback(PlaybackStatus::Loading, Some(&voice_id));

        let result = self.service.speak_text(text, &voice_id, None).await;

        let mut state = self.state();
        if state.generation != generation {
            drop(state);
            if let Ok(spoken) = &result {
                let _ = spoken.handle.stop();
            }
            tracing::debug!(voice_id = %voice_id, "Discarded stale read result");
            return Ok(None);
        }

        state.selection.is_loading = false;
        match result {
            Ok(spoken) => {
                state.handle = Some(spoken.handle.clone());
                drop(state);

                tracing::info!(
                    voice_id = %voice_id,
                    characters = spoken.response.billable_characters_count,
                    "Reading started"
                );
                self.events
                    .publish_playback(PlaybackStatus::Playing, Some(&voice_id));
                self.watch_playback(spoken.handle.clone(), generation);
                Ok(Some(spoken.handle))
            }
            Err(e) => {
                drop(state);
                tracing::error!(voice_id = %voice_id, error = %e, "Read failed");
                self.events
                    .notify(NotificationLevel::Error, format!("Failed to read text: {}", e));
                self.events
                    .publish_playback(PlaybackStatus::Stopped, Some(&voice_id));
                Err(e)
            }
        }
    }

    /// 播放自然结束后释放句柄
    fn watch_playback(self: &Arc<Self>, handle: AudioHandle, generation: u64) {
        let orchestrator = Arc::downgrade(self);
        tokio::spawn(async move {
            handle.wait_finished().await;
            let Some(orchestrator) = orchestrator.upgrade() else {
                return;
            };

            let released = {
                let mut state = orchestrator.state();
                let current = state.generation == generation
                    && state.handle.as_ref().map(|h| h.id()) == Some(handle.id());
                if current {
                    state.handle = None;
                }
                current.then(|| state.voice_id.clone())
            };

            if let Some(voice_id) = released {
                orchestrator
                    .events
                    .publish_playback(PlaybackStatus::Stopped, voice_id.as_deref());
            }
        });
    }

    /// 朗读当前选区并消费它
    pub async fn read_selection(self: &Arc<Self>) -> Result<Option<AudioHandle>, ApplicationError> {
        let text = {
            let mut state = self.state();
            let text = state.selection.text().to_string();
            state.selection.clear();
            state.viewport = None;
            text
        };

        if text.is_empty() {
            return Err(ApplicationError::validation("No text selected"));
        }

        self.publish_selection(&Selection::empty(), None);
        self.read(&text).await
    }

    fn current_handle(&self) -> Result<AudioHandle, ApplicationError> {
        self.state()
            .handle
            .clone()
            .ok_or_else(|| ApplicationError::invalid_state("Nothing is playing"))
    }

    pub fn pause(&self) -> Result<(), ApplicationError> {
        let handle = self.current_handle()?;
        handle.pause()?;
        let voice_id = self.state().voice_id.clone();
        self.events
            .publish_playback(PlaybackStatus::Paused, voice_id.as_deref());
        Ok(())
    }

    pub fn resume(&self) -> Result<(), ApplicationError> {
        let handle = self.current_handle()?;
        handle.resume()?;
        let voice_id = self.state().voice_id.clone();
        self.events
            .publish_playback(PlaybackStatus::Playing, voice_id.as_deref());
        Ok(())
    }

    /// 停止并释放句柄
    pub fn stop(&self) -> Result<(), ApplicationError> {
        let (handle, voice_id) = {
            let mut state = self.state();
            let handle = state
                .handle
                .take()
                .ok_or_else(|| ApplicationError::invalid_state("Nothing is playing"))?;
            state.selection.is_loading = false;
            (handle, state.voice_id.clone())
        };

        handle.stop()?;
        self.events
            .publish_playback(PlaybackStatus::Stopped, voice_id.as_deref());
        Ok(())
    }

    pub fn playback(&self) -> PlaybackSnapshot {
        let state = self.state();
        PlaybackSnapshot {
            is_playing: state.handle.as_ref().is_some_and(|h| h.is_playing()),
            is_paused: state.handle.as_ref().is_some_and(|h| h.is_paused()),
            is_loading: state.selection.is_loading,
        }
    }

    /// 挂载：注册唯一的选区监听任务
    pub fn mount(self: &Arc<Self>, selection_events: &SelectionEvents) {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .mounted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .replace(token.clone())
        {
            previous.cancel();
        }

        let mut changes = selection_events.subscribe();
        let orchestrator = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    change = changes.recv() => match change {
                        Ok(change) => match orchestrator.upgrade() {
                            Some(o) => o.handle_selection_change(change),
                            None => break,
                        },
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped = skipped, "Selection events lagged");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Selection listener removed");
        });

        tracing::debug!("Selection orchestrator mounted");
    }

    /// 卸载：取消监听、丢弃进行中的朗读并停止播放
    pub fn unmount(&self) {
        if let Some(token) = self.mounted.lock().unwrap_or_else(|p| p.into_inner()).take() {
            token.cancel();
        }

        let handle = {
            let mut state = self.state();
            state.generation += 1;
            state.selection = Selection::empty();
            state.viewport = None;
            state.handle.take()
        };
        if let Some(handle) = handle {
            let _ = handle.stop();
        }
        tracing::debug!("Selection orchestrator unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}

impl Drop for SelectionOrchestrator {
    fn drop(&mut self) {
        self.unmount();
    }
}
