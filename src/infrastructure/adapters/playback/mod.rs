//! Playback Adapters - AudioPlayerPort 实现

mod file_sink;
#[cfg(feature = "playback")]
mod rodio_player;

pub use file_sink::FileAudioSink;
#[cfg(feature = "playback")]
pub use rodio_player::RodioAudioPlayer;
