//! Media Adapters - 音频探测与麦克风采集

#[cfg(feature = "mic")]
mod cpal_recorder;
mod symphonia_probe;

#[cfg(feature = "mic")]
pub use cpal_recorder::CpalMediaRecorder;
pub use symphonia_probe::SymphoniaAudioProbe;
