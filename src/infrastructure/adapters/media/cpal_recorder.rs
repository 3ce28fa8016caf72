//! Cpal Media Recorder - 麦克风采集
//!
//! cpal 的 Stream 不能跨线程移动，因此每次录音起一个专用线程持有输入流，
//! 停止时把缓冲区编码成 16-bit PCM WAV 返回。

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::io::Cursor;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::oneshot;

use crate::application::ports::{MediaError, MediaRecorderPort, RecordedAudio};

struct ActiveRecording {
    stop: mpsc::Sender<()>,
    done: oneshot::Receiver<Result<RecordedAudio, MediaError>>,
}

/// 麦克风录音器
#[derive(Default)]
pub struct CpalMediaRecorder {
    active: Mutex<Option<ActiveRecording>>,
}

impl CpalMediaRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 默认输入设备是否存在
    pub fn is_available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, MediaError> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut out = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut out, spec)
                .map_err(|e| MediaError::DeviceError(e.to_string()))?;
            for s in samples {
                let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(v)
                    .map_err(|e| MediaError::DeviceError(e.to_string()))?;
            }
            writer
                .finalize()
                .map_err(|e| MediaError::DeviceError(e.to_string()))?;
        }
        Ok(out.into_inner())
    }

    fn run(
        ready: oneshot::Sender<Result<(), MediaError>>,
        stop: mpsc::Receiver<()>,
        done: oneshot::Sender<Result<RecordedAudio, MediaError>>,
    ) {
        let host = cpal::default_host();
        let Some(device) = host.default_input_device() else {
            let _ = ready.send(Err(MediaError::Unsupported));
            return;
        };

        let supported = match device.default_input_config() {
            Ok(config) => config,
            Err(e) => {
                let _ = ready.send(Err(MediaError::PermissionDenied(e.to_string())));
                return;
            }
        };

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
        let sink = Arc::clone(&buffer);

        let stream = device.build_input_stream(
            &supported.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = sink.lock() {
                    buf.extend_from_slice(data);
                }
            },
            |err| tracing::warn!(error = %err, "Audio input stream error"),
            None,
        );

        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready.send(Err(MediaError::DeviceError(e.to_string())));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready.send(Err(MediaError::DeviceError(e.to_string())));
            return;
        }

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate = sample_rate,
            channels = channels,
            "Microphone recording started"
        );
        let _ = ready.send(Ok(()));

        // 发送端被丢弃也视为停止
        let _ = stop.recv();
        drop(stream);

        let samples = buffer
            .lock()
            .map(|mut b| std::mem::take(&mut *b))
            .unwrap_or_default();

        tracing::info!(
            samples = samples.len(),
            duration_secs = samples.len() as f64 / (sample_rate as f64 * channels as f64),
            "Microphone recording stopped"
        );

        let result = Self::encode_wav(&samples, sample_rate, channels).map(|data| RecordedAudio {
            data,
            mime_type: "audio/wav".to_string(),
        });
        let _ = done.send(result);
    }
}

#[async_trait]
impl MediaRecorderPort for CpalMediaRecorder {
    async fn start(&self) -> Result<(), MediaError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = mpsc::channel();
        let (done_tx, done_rx) = oneshot::channel();

        thread::Builder::new()
            .name("speechly-mic".to_string())
            .spawn(move || Self::run(ready_tx, stop_rx, done_tx))
            .map_err(|e| MediaError::DeviceError(e.to_string()))?;

        ready_rx
            .await
            .map_err(|_| MediaError::DeviceError("recording thread exited".to_string()))??;

        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *active = Some(ActiveRecording {
            stop: stop_tx,
            done: done_rx,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<RecordedAudio, MediaError> {
        let recording = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or(MediaError::NotRecording)?;

        let _ = recording.stop.send(());
        recording
            .done
            .await
            .map_err(|_| MediaError::DeviceError("recording thread exited".to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wav_header() {
        let data = CpalMediaRecorder::encode_wav(&[0.0, 0.5, -0.5, 1.0], 16000, 1).unwrap();
        assert_eq!(&data[0..4], b"RIFF");
        assert_eq!(&data[8..12], b"WAVE");
        assert_eq!(data.len(), 44 + 4 * 2);
    }

    #[tokio::test]
    async fn test_stop_without_start() {
        let recorder = CpalMediaRecorder::new();
        assert!(matches!(
            recorder.stop().await,
            Err(MediaError::NotRecording)
        ));
    }
}
