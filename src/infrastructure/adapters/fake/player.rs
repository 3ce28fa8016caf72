//! Fake Audio Player - 记录播放会话，由测试手动结束

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::application::ports::{AudioClip, AudioPlayerPort, PlaybackError, PlaybackStarted};

struct FakeSession {
    clip: AudioClip,
    paused: bool,
    ended: Option<oneshot::Sender<()>>,
}

/// Fake 播放器
#[derive(Default)]
pub struct FakeAudioPlayer {
    sessions: DashMap<Uuid, FakeSession>,
    last: Mutex<Option<Uuid>>,
    fail_next: AtomicBool,
    plays: AtomicUsize,
    stops: AtomicUsize,
}

impl FakeAudioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 下一次 play 返回设备错误
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// 模拟自然播放结束
    pub fn finish(&self, id: Uuid) -> bool {
        match self.sessions.remove(&id) {
            Some((_, mut session)) => {
                if let Some(ended) = session.ended.take() {
                    let _ = ended.send(());
                }
                true
            }
            None => false,
        }
    }

    pub fn last_id(&self) -> Option<Uuid> {
        *self.last.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_id()
            .and_then(|id| self.sessions.get(&id).map(|s| s.clip.url.clone()))
    }

    pub fn is_active(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn is_paused(&self, id: Uuid) -> bool {
        self.sessions.get(&id).map(|s| s.paused).unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioPlayerPort for FakeAudioPlayer {
    async fn play(&self, clip: AudioClip) -> Result<PlaybackStarted, PlaybackError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PlaybackError::DeviceError("fake device failure".to_string()));
        }

        self.plays.fetch_add(1, Ordering::SeqCst);
        let id = Uuid::new_v4();
        let (tx, ended) = oneshot::channel();
        self.sessions.insert(
            id,
            FakeSession {
                clip,
                paused: false,
                ended: Some(tx),
            },
        );
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = Some(id);

        Ok(PlaybackStarted { id, ended })
    }

    fn pause(&self, id: Uuid) -> Result<(), PlaybackError> {
        let mut session = self.sessions.get_mut(&id).ok_or(PlaybackError::NotFound(id))?;
        session.paused = true;
        Ok(())
    }

    fn resume(&self, id: Uuid) -> Result<(), PlaybackError> {
        let mut session = self.sessions.get_mut(&id).ok_or(PlaybackError::NotFound(id))?;
        session.paused = false;
        Ok(())
    }

    fn stop(&self, id: Uuid) -> Result<(), PlaybackError> {
        if self.sessions.remove(&id).is_some() {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
