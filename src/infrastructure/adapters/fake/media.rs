//! Fake 录音器、音频探测器与时钟

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{
    AudioInfo, AudioProbePort, ClockPort, MediaError, MediaRecorderPort, ProbeError, RecordedAudio,
};

/// Fake 录音器：stop 时返回预置的录音
pub struct FakeMediaRecorder {
    recording: Mutex<RecordedAudio>,
    active: AtomicBool,
    deny: AtomicBool,
}

impl FakeMediaRecorder {
    pub fn new(data: Vec<u8>, mime_type: &str) -> Self {
        Self {
            recording: Mutex::new(RecordedAudio {
                data,
                mime_type: mime_type.to_string(),
            }),
            active: AtomicBool::new(false),
            deny: AtomicBool::new(false),
        }
    }

    /// 模拟用户拒绝麦克风权限
    pub fn deny_permission(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for FakeMediaRecorder {
    fn default() -> Self {
        Self::new(b"RIFF0000WAVErecorded".to_vec(), "audio/wav")
    }
}

#[async_trait]
impl MediaRecorderPort for FakeMediaRecorder {
    async fn start(&self) -> Result<(), MediaError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(MediaError::PermissionDenied(
                "microphone access denied".to_string(),
            ));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<RecordedAudio, MediaError> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Err(MediaError::NotRecording);
        }
        Ok(self
            .recording
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone())
    }
}

/// Fake 探测器：默认全部通过，可切换为全部拒绝
#[derive(Default)]
pub struct FakeAudioProbe {
    reject: AtomicBool,
    calls: AtomicUsize,
}

impl FakeAudioProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        let probe = Self::default();
        probe.reject.store(true, Ordering::SeqCst);
        probe
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioProbePort for FakeAudioProbe {
    async fn probe(&self, data: &[u8], _mime_type: &str) -> Result<AudioInfo, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reject.load(Ordering::SeqCst) || data.is_empty() {
            return Err(ProbeError::InvalidAudio("not decodable".to_string()));
        }
        Ok(AudioInfo::default())
    }
}

/// 手动推进的时钟
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl ClockPort for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
