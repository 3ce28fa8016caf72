//! Fake Adapters - 测试与离线演示用的端口实现

mod media;
mod player;
mod speech_api;

pub use media::{FakeAudioProbe, FakeMediaRecorder, ManualClock};
pub use player::FakeAudioPlayer;
pub use speech_api::{fake_voice, FakeSpeechApi};
