//! Rodio Audio Player - 扬声器播放
//!
//! rodio 的 OutputStream 不是 Send，所以由一个专用线程持有输出流和所有 Sink，
//! 其它线程通过命令通道操作它。线程每隔一小段时间检查一次 Sink 是否播完，
//! 播完即触发 ended 信号。

use async_trait::async_trait;
use rodio::{Decoder, OutputStreamBuilder, Sink};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::application::ports::{AudioClip, AudioPlayerPort, PlaybackError, PlaybackStarted};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

enum Command {
    Play {
        id: Uuid,
        data: Vec<u8>,
        ended: oneshot::Sender<()>,
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Pause(Uuid, mpsc::Sender<Result<(), PlaybackError>>),
    Resume(Uuid, mpsc::Sender<Result<(), PlaybackError>>),
    Stop(Uuid, mpsc::Sender<Result<(), PlaybackError>>),
}

struct Playing {
    sink: Sink,
    ended: Option<oneshot::Sender<()>>,
}

/// 扬声器播放器
pub struct RodioAudioPlayer {
    commands: mpsc::Sender<Command>,
}

impl RodioAudioPlayer {
    /// 打开默认输出设备
    pub fn new() -> Result<Self, PlaybackError> {
        let (commands, rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), PlaybackError>>();

        thread::Builder::new()
            .name("speechly-playback".to_string())
            .spawn(move || {
                let stream = match OutputStreamBuilder::open_default_stream() {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::DeviceError(e.to_string())));
                        return;
                    }
                };

                let mut playing: HashMap<Uuid, Playing> = HashMap::new();

                loop {
                    match rx.recv_timeout(POLL_INTERVAL) {
                        Ok(Command::Play {
                            id,
                            data,
                            ended,
                            reply,
                        }) => match Decoder::new(Cursor::new(data)) {
                            Ok(source) => {
                                let sink = Sink::connect_new(stream.mixer());
                                sink.append(source);
                                playing.insert(
                                    id,
                                    Playing {
                                        sink,
                                        ended: Some(ended),
                                    },
                                );
                                let _ = reply.send(Ok(()));
                            }
                            Err(e) => {
                                let _ = reply.send(Err(PlaybackError::Unsupported(e.to_string())));
                            }
                        },
                        Ok(Command::Pause(id, reply)) => {
                            let result = match playing.get(&id) {
                                Some(p) => {
                                    p.sink.pause();
                                    Ok(())
                                }
                                None => Err(PlaybackError::NotFound(id)),
                            };
                            let _ = reply.send(result);
                        }
                        Ok(Command::Resume(id, reply)) => {
                            let result = match playing.get(&id) {
                                Some(p) => {
                                    p.sink.play();
                                    Ok(())
                                }
                                None => Err(PlaybackError::NotFound(id)),
                            };
                            let _ = reply.send(result);
                        }
                        Ok(Command::Stop(id, reply)) => {
                            if let Some(p) = playing.remove(&id) {
                                p.sink.stop();
                            }
                            let _ = reply.send(Ok(()));
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }

                    playing.retain(|id, p| {
                        if p.sink.empty() {
                            tracing::debug!(playback_id = %id, "Playback finished");
                            if let Some(ended) = p.ended.take() {
                                let _ = ended.send(());
                            }
                            false
                        } else {
                            true
                        }
                    });
                }

                tracing::debug!("Playback thread exiting");
            })
            .map_err(|e| PlaybackError::DeviceError(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| PlaybackError::DeviceError("playback thread exited".to_string()))??;

        tracing::info!("Speaker output opened");
        Ok(Self { commands })
    }

    fn control(
        &self,
        id: Uuid,
        make: impl FnOnce(Uuid, mpsc::Sender<Result<(), PlaybackError>>) -> Command,
    ) -> Result<(), PlaybackError> {
        let (tx, rx) = mpsc::channel();
        self.commands
            .send(make(id, tx))
            .map_err(|_| PlaybackError::DeviceError("playback thread exited".to_string()))?;
        rx.recv()
            .map_err(|_| PlaybackError::DeviceError("playback thread exited".to_string()))?
    }
}

#[async_trait]
impl AudioPlayerPort for RodioAudioPlayer {
    async fn play(&self, clip: AudioClip) -> Result<PlaybackStarted, PlaybackError> {
        let id = Uuid::new_v4();
        let (ended_tx, ended) = oneshot::channel();
        let (reply_tx, reply_rx) = oneshot::channel();

        self.commands
            .send(Command::Play {
                id,
                data: clip.data.to_vec(),
                ended: ended_tx,
                reply: reply_tx,
            })
            .map_err(|_| PlaybackError::DeviceError("playback thread exited".to_string()))?;

        reply_rx
            .await
            .map_err(|_| PlaybackError::DeviceError("playback thread exited".to_string()))??;

        tracing::debug!(playback_id = %id, url = %clip.url, format = %clip.format, "Playback started");
        Ok(PlaybackStarted { id, ended })
    }

    fn pause(&self, id: Uuid) -> Result<(), PlaybackError> {
        self.control(id, Command::Pause)
    }

    fn resume(&self, id: Uuid) -> Result<(), PlaybackError> {
        self.control(id, Command::Resume)
    }

    fn stop(&self, id: Uuid) -> Result<(), PlaybackError> {
        self.control(id, Command::Stop)
    }
}
