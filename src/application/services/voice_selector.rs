//! Voice Selector - 音色列表缓存与选择
//!
//! 缓存规则:
//! - 非强制刷新且缓存未过期（now - timestamp < ttl）时直接使用缓存
//! - 否则调用 API，并写回列表与时间戳
//! - 缓存损坏视为未命中
//!
//! 选择持久化: `select_voice` 立即写入 `selected_voice_id`；
//! 加载后若保存的 ID 存在于列表中则恢复，否则保持未选择。

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::voice_service::VoiceService;
use crate::application::error::ApplicationError;
use crate::application::ports::{keys, ClockPort, KeyValueStorePort};
use crate::domain::voice::{presentable_voices, Voice};
use crate::infrastructure::events::{NotificationLevel, WidgetEvent, WidgetEventPublisher};

#[derive(Debug, Default)]
struct SelectorState {
    voices: Vec<Voice>,
    selected: Option<String>,
    is_loading: bool,
}

/// 离开作用域时复位 `is_loading`，加载 future 被取消时同样生效
struct LoadingGuard<'a>(&'a VoiceSelector);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.state().is_loading = false;
    }
}

/// 音色选择器
pub struct VoiceSelector {
    service: Arc<VoiceService>,
    store: Arc<dyn KeyValueStorePort>,
    clock: Arc<dyn ClockPort>,
    events: Arc<WidgetEventPublisher>,
    ttl_millis: i64,
    state: Mutex<SelectorState>,
    mounted: Mutex<Option<CancellationToken>>,
}

impl VoiceSelector {
    pub fn new(
        service: Arc<VoiceService>,
        store: Arc<dyn KeyValueStorePort>,
        clock: Arc<dyn ClockPort>,
        events: Arc<WidgetEventPublisher>,
        ttl_millis: i64,
    ) -> Self {
        Self {
            service,
            store,
            clock,
            events,
            ttl_millis,
            state: Mutex::new(SelectorState::default()),
            mounted: Mutex::new(None),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SelectorState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 读取未过期的缓存
    fn read_cache(&self) -> Option<Vec<Voice>> {
        let timestamp = self
            .store
            .get(keys::CACHED_VOICES_TIMESTAMP)
            .ok()
            .flatten()?
            .parse::<i64>()
            .ok()?;

        let age = self.clock.now_millis() - timestamp;
        if age < 0 || age >= self.ttl_millis {
            tracing::debug!(age_ms = age, "Voices cache expired");
            return None;
        }

        let raw = self.store.get(keys::CACHED_VOICES).ok().flatten()?;
        match serde_json::from_str::<Vec<Voice>>(&raw) {
            Ok(voices) => Some(voices),
            Err(e) => {
                tracing::warn!(error = %e, "Corrupt voices cache ignored");
                None
            }
        }
    }

    fn write_cache(&self, voices: &[Voice]) {
        let result = serde_json::to_string(voices)
            .map_err(|e| ApplicationError::internal(e.to_string()))
            .and_then(|json| {
                self.store.set(keys::CACHED_VOICES, &json)?;
                self.store.set(
                    keys::CACHED_VOICES_TIMESTAMP,
                    &self.clock.now_millis().to_string(),
                )?;
                Ok(())
            });

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write voices cache");
        }
    }

    /// 加载音色列表
    ///
    /// 返回完整列表；展示用的过滤列表见 `voices()`
    pub async fn load_voices(&self, force_refresh: bool) -> Result<Vec<Voice>, ApplicationError> {
        self.state().is_loading = true;
        let loading = LoadingGuard(self);

        let cached = if force_refresh { None } else { self.read_cache() };
        let from_cache = cached.is_some();

        let voices = match cached {
            Some(voices) => voices,
            None => match self.service.get_voices().await {
                Ok(voices) => {
                    self.write_cache(&voices);
                    voices
                }
                Err(e) => {
                    self.events
                        .notify(NotificationLevel::Error, format!("Failed to load voices: {}", e));
                    return Err(e);
                }
            },
        };

        let saved = self.store.get(keys::SELECTED_VOICE_ID).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read saved voice");
            None
        });
        let restored = saved.filter(|id| voices.iter().any(|v| &v.id == id));

        {
            let mut state = self.state();
            let current_present = state
                .selected
                .as_ref()
                .is_some_and(|id| voices.iter().any(|v| &v.id == id));
            state.voices = voices.clone();
            if restored.is_some() {
                state.selected = restored;
            } else if !current_present {
                state.selected = None;
            }
        }
        drop(loading);

        tracing::info!(count = voices.len(), from_cache = from_cache, "Voices loaded");
        self.events.publish(WidgetEvent::VoicesLoaded {
            count: voices.len(),
            from_cache,
        });

        Ok(voices)
    }

    /// 展示用音色：全部个人音色 + 最多 5 个其他音色
    pub fn voices(&self) -> Vec<Voice> {
        presentable_voices(&self.state().voices)
    }

    pub fn all_voices(&self) -> Vec<Voice> {
        self.state().voices.clone()
    }

    pub fn selected(&self) -> Option<String> {
        self.state().selected.clone()
    }

    pub fn selected_voice(&self) -> Option<Voice> {
        let state = self.state();
        let id = state.selected.as_ref()?;
        state.voices.iter().find(|v| &v.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    /// 选择音色并立即持久化
    pub fn select_voice(&self, voice_id: &str) -> Result<(), ApplicationError> {
        let voice_id = voice_id.trim();
        if voice_id.is_empty() {
            return Err(ApplicationError::validation("Voice ID is required"));
        }

        self.store.set(keys::SELECTED_VOICE_ID, voice_id)?;
        self.state().selected = Some(voice_id.to_string());

        tracing::info!(voice_id = %voice_id, "Voice selected");
        self.events.publish(WidgetEvent::VoiceSelected {
            voice_id: voice_id.to_string(),
        });
        Ok(())
    }

    /// 挂载：先按缓存加载一次，之后每次刷新通知都强制拉取，直到 `unmount`
    pub fn mount(self: &Arc<Self>) {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .mounted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .replace(token.clone())
        {
            previous.cancel();
        }

        // 在任务启动前订阅，避免错过挂载后立即触发的刷新
        let mut refetch = self.service.refetch().subscribe();
        let selector = Arc::downgrade(self);

        tokio::spawn(async move {
            let Some(initial) = selector.upgrade() else {
                return;
            };
            tokio::select! {
                _ = token.cancelled() => return,
                _ = initial.load_voices(false) => {}
            }
            drop(initial);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = refetch.recv() => match event {
                        Ok(_) | Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {
                            let Some(selector) = selector.upgrade() else {
                                break;
                            };
                            tokio::select! {
                                _ = token.cancelled() => break,
                                _ = selector.load_voices(true) => {}
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            tracing::debug!("Voice selector unmounted");
        });
    }

    pub fn unmount(&self) {
        if let Some(token) = self.mounted.lock().unwrap_or_else(|p| p.into_inner()).take() {
            token.cancel();
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }
}

impl Drop for VoiceSelector {
    fn drop(&mut self) {
        self.unmount();
    }
}
