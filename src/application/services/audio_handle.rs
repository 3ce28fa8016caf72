//! Audio Handle - 一次播放的控制句柄
//!
//! 状态机: Playing <-> Paused -> Ended | Stopped
//!
//! Ended/Stopped 为终态；进入终态时释放 Object URL。

use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{AudioPlayerPort, PlaybackError};
use crate::infrastructure::memory::ObjectUrl;

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioState {
    Playing,
    Paused,
    /// 自然播放结束
    Ended,
    /// 被主动停止
    Stopped,
}

impl AudioState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Ended | Self::Stopped)
    }
}

struct HandleInner {
    id: Uuid,
    url: String,
    player: Arc<dyn AudioPlayerPort>,
    state: watch::Sender<AudioState>,
    object_url: Mutex<Option<ObjectUrl>>,
}

impl HandleInner {
    fn transition(&self, from: AudioState, to: AudioState) {
        self.state.send_if_modified(|state| {
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
    }

    /// 进入终态并释放 URL；已是终态时返回 false
    fn finish(&self, terminal: AudioState) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if state.is_finished() {
                false
            } else {
                *state = terminal;
                true
            }
        });

        if changed {
            let released = self
                .object_url
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .take();
            drop(released);
            tracing::debug!(playback_id = %self.id, url = %self.url, state = ?terminal, "Playback finished");
        }
        changed
    }
}

/// 播放句柄；克隆共享同一次播放
#[derive(Clone)]
pub struct AudioHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioHandle")
            .field("id", &self.inner.id)
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .finish()
    }
}

impl AudioHandle {
    /// 包装一次已开始的播放；`ended` 触发或被丢弃时进入终态
    pub(crate) fn start(
        id: Uuid,
        object_url: ObjectUrl,
        player: Arc<dyn AudioPlayerPort>,
        ended: oneshot::Receiver<()>,
    ) -> Self {
        let (state, _) = watch::channel(AudioState::Playing);
        let inner = Arc::new(HandleInner {
            id,
            url: object_url.as_str().to_string(),
            player,
            state,
            object_url: Mutex::new(Some(object_url)),
        });

        let watcher = Arc::clone(&inner);
        tokio::spawn(async move {
            // Err 表示播放器已丢弃该会话（被停止）
            let terminal = match ended.await {
                Ok(()) => AudioState::Ended,
                Err(_) => AudioState::Stopped,
            };
            watcher.finish(terminal);
        });

        Self { inner }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    pub fn state(&self) -> AudioState {
        *self.inner.state.borrow()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == AudioState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == AudioState::Paused
    }

    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// 订阅状态变化
    pub fn subscribe(&self) -> watch::Receiver<AudioState> {
        self.inner.state.subscribe()
    }

    /// 等待进入终态
    pub async fn wait_finished(&self) -> AudioState {
        let mut rx = self.subscribe();
        loop {
            let state = *rx.borrow_and_update();
            if state.is_finished() {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    pub fn pause(&self) -> Result<(), ApplicationError> {
        match self.state() {
            AudioState::Playing => {
                self.inner.player.pause(self.inner.id)?;
                self.inner.transition(AudioState::Playing, AudioState::Paused);
                Ok(())
            }
            AudioState::Paused => Ok(()),
            state => Err(ApplicationError::invalid_state(format!(
                "cannot pause {:?} playback",
                state
            ))),
        }
    }

    pub fn resume(&self) -> Result<(), ApplicationError> {
        match self.state() {
            AudioState::Paused => {
                self.inner.player.resume(self.inner.id)?;
                self.inner.transition(AudioState::Paused, AudioState::Playing);
                Ok(())
            }
            AudioState::Playing => Ok(()),
            state => Err(ApplicationError::invalid_state(format!(
                "cannot resume {:?} playback",
                state
            ))),
        }
    }

    /// 停止播放并释放 URL；重复调用无副作用
    pub fn stop(&self) -> Result<(), ApplicationError> {
        if self.is_finished() {
            return Ok(());
        }

        let result = match self.inner.player.stop(self.inner.id) {
            Ok(()) | Err(PlaybackError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        };
        self.inner.finish(AudioState::Stopped);
        result
    }
}
