//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_player;
mod audio_probe;
mod clock;
mod key_value_store;
mod media_recorder;
mod speech_api;

pub use audio_player::{AudioClip, AudioPlayerPort, PlaybackError, PlaybackStarted};
pub use audio_probe::{AudioInfo, AudioProbePort, ProbeError};
pub use clock::{ClockPort, SystemClock};
pub use key_value_store::{keys, KeyValueStorePort, StoreError};
pub use media_recorder::{MediaError, MediaRecorderPort, RecordedAudio};
pub use speech_api::{
    ApiError, CloneVoiceForm, SpeechApiPort, SpeechMark, SpeechOptions, SpeechRequest,
    SpeechResponse, SynthesisOptions,
};
