//! File Audio Sink - 把音频写到磁盘的“播放器”
//!
//! 用于无声卡的环境（CLI、服务器）：写完文件即视为播放结束

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::application::ports::{AudioClip, AudioPlayerPort, PlaybackError, PlaybackStarted};

/// 文件输出播放器
pub struct FileAudioSink {
    output_dir: PathBuf,
}

impl FileAudioSink {
    /// 创建并确保输出目录存在
    pub async fn new(output_dir: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let output_dir = output_dir.as_ref().to_path_buf();

        fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| PlaybackError::IoError(e.to_string()))?;

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// 某次播放对应的文件路径
    pub fn path_for(&self, clip: &AudioClip, id: Uuid) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", id, clip.format.extension()))
    }
}

#[async_trait]
impl AudioPlayerPort for FileAudioSink {
    async fn play(&self, clip: AudioClip) -> Result<PlaybackStarted, PlaybackError> {
        let id = Uuid::new_v4();
        let path = self.path_for(&clip, id);

        fs::write(&path, &clip.data[..])
            .await
            .map_err(|e| PlaybackError::IoError(e.to_string()))?;

        tracing::info!(
            url = %clip.url,
            path = %path.display(),
            size = clip.data.len(),
            "Audio written"
        );

        let (tx, ended) = oneshot::channel();
        let _ = tx.send(());

        Ok(PlaybackStarted { id, ended })
    }

    fn pause(&self, id: Uuid) -> Result<(), PlaybackError> {
        Err(PlaybackError::NotFound(id))
    }

    fn resume(&self, id: Uuid) -> Result<(), PlaybackError> {
        Err(PlaybackError::NotFound(id))
    }

    fn stop(&self, _id: Uuid) -> Result<(), PlaybackError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::AudioFormat;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_play_writes_file_and_ends() {
        let dir = tempdir().unwrap();
        let sink = FileAudioSink::new(dir.path().join("out")).await.unwrap();

        let clip = AudioClip {
            url: "blob:test".to_string(),
            format: AudioFormat::Mp3,
            data: Arc::from(vec![1u8, 2, 3]),
        };

        let started = sink.play(clip.clone()).await.unwrap();
        let path = sink.path_for(&clip, started.id);

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert!(path.to_string_lossy().ends_with(".mp3"));
        assert!(started.ended.await.is_ok());
    }

    #[tokio::test]
    async fn test_pause_after_end_is_not_found() {
        let dir = tempdir().unwrap();
        let sink = FileAudioSink::new(dir.path()).await.unwrap();
        let id = Uuid::new_v4();

        assert!(matches!(sink.pause(id), Err(PlaybackError::NotFound(_))));
        assert!(sink.stop(id).is_ok());
    }
}
