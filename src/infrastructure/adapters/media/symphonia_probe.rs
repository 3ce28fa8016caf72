//! Symphonia Audio Probe - 基于 symphonia 的音频校验
//!
//! 探测容器格式、找到默认音轨并解码第一个数据包；
//! 任何一步失败都视为不是可用的音频文件。

use async_trait::async_trait;
use std::io::Cursor;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioInfo, AudioProbePort, ProbeError};
use crate::domain::audio::AudioFormat;

/// 查找目标音轨数据包的最大读取次数
const MAX_PACKETS: usize = 64;

/// symphonia 音频探测器
#[derive(Debug, Clone, Default)]
pub struct SymphoniaAudioProbe;

impl SymphoniaAudioProbe {
    pub fn new() -> Self {
        Self
    }

    fn probe_blocking(data: Vec<u8>, mime_type: &str) -> Result<AudioInfo, ProbeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

        let mut hint = Hint::new();
        if let Some(format) = AudioFormat::from_mime_type(mime_type) {
            hint.with_extension(format.extension());
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProbeError::InvalidAudio(format!("unrecognized format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .filter(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProbeError::InvalidAudio("no audio track".to_string()))?;

        let track_id = track.id;
        let params = track.codec_params.clone();

        let codecs = symphonia::default::get_codecs();
        let codec = codecs.get_codec(params.codec).map(|d| d.short_name.to_string());

        let mut decoder = codecs
            .make(&params, &DecoderOptions::default())
            .map_err(|e| ProbeError::InvalidAudio(format!("unsupported codec: {}", e)))?;

        let mut decoded = false;
        for _ in 0..MAX_PACKETS {
            let packet = format
                .next_packet()
                .map_err(|e| ProbeError::InvalidAudio(format!("no audio frames: {}", e)))?;

            if packet.track_id() != track_id {
                continue;
            }

            decoder
                .decode(&packet)
                .map_err(|e| ProbeError::InvalidAudio(format!("decode failed: {}", e)))?;
            decoded = true;
            break;
        }

        if !decoded {
            return Err(ProbeError::InvalidAudio("no audio frames".to_string()));
        }

        let sample_rate = params.sample_rate;
        let duration_ms = match (params.n_frames, sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => Some(frames * 1000 / rate as u64),
            _ => None,
        };

        Ok(AudioInfo {
            codec,
            sample_rate,
            channels: params.channels.map(|c| c.count()),
            duration_ms,
        })
    }
}

#[async_trait]
impl AudioProbePort for SymphoniaAudioProbe {
    async fn probe(&self, data: &[u8], mime_type: &str) -> Result<AudioInfo, ProbeError> {
        let owned = data.to_vec();
        let mime_type = mime_type.to_string();

        let info = tokio::task::spawn_blocking(move || Self::probe_blocking(owned, &mime_type))
            .await
            .map_err(|e| ProbeError::InvalidAudio(format!("probe task failed: {}", e)))??;

        tracing::debug!(
            codec = ?info.codec,
            sample_rate = ?info.sample_rate,
            duration_ms = ?info.duration_ms,
            "Audio probed"
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit 单声道 PCM WAV
    fn wav(sample_rate: u32, samples: &[i16]) -> Vec<u8> {
        let data_len = (samples.len() * 2) as u32;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[tokio::test]
    async fn test_probe_valid_wav() {
        let samples: Vec<i16> = (0..16000).map(|i| ((i % 100) * 100) as i16).collect();
        let data = wav(16000, &samples);

        let info = SymphoniaAudioProbe::new()
            .probe(&data, "audio/wav")
            .await
            .unwrap();

        assert_eq!(info.sample_rate, Some(16000));
        assert_eq!(info.channels, Some(1));
        assert_eq!(info.duration_ms, Some(1000));
    }

    #[tokio::test]
    async fn test_probe_rejects_garbage() {
        let data = b"this is definitely not audio, just some text bytes".repeat(10);
        let result = SymphoniaAudioProbe::new().probe(&data, "audio/mpeg").await;
        assert!(matches!(result, Err(ProbeError::InvalidAudio(_))));
    }

    #[tokio::test]
    async fn test_probe_rejects_empty() {
        let result = SymphoniaAudioProbe::new().probe(&[], "audio/wav").await;
        assert!(result.is_err());
    }
}
