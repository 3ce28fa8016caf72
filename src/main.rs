//! Speechly - 选区朗读引擎（命令行宿主）
//!
//! 用同一套服务驱动：音色列表、选择、朗读、克隆。
//! 持久化使用 sled；播放默认写文件，启用 `playback` 特性后走扬声器。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use speechly::application::ports::{AudioPlayerPort, MediaRecorderPort, SystemClock};
use speechly::application::{Speechly, SpeechlyDeps, SpeechlyProps, SpeechlySettings};
use speechly::config::{load_config_from_path, print_config, AppConfig};
use speechly::domain::audio::{mime_type_for_filename, AudioFile};
use speechly::domain::voice::Gender;
use speechly::infrastructure::adapters::{
    ApiClient, ApiKeyResolver, FileAudioSink, HttpSpeechApi, SymphoniaAudioProbe,
};
use speechly::infrastructure::persistence::SledKeyValueStore;

#[derive(Debug, Parser)]
#[command(name = "speechly", version, about = "Selection-to-speech engine")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 覆盖配置中的 API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 列出可用音色
    Voices {
        /// 忽略本地缓存
        #[arg(long)]
        refresh: bool,
    },
    /// 选择朗读使用的音色
    Select { voice_id: String },
    /// 用已选音色朗读文本
    Read { text: String },
    /// 克隆音色
    Clone {
        /// 音频样本文件
        #[arg(long, conflicts_with = "record_secs")]
        sample: Option<PathBuf>,
        /// 改为从麦克风录制 N 秒
        #[arg(long)]
        record_secs: Option<u64>,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum)]
        gender: GenderArg,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// 打印生效的配置
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    if let Command::Config = cli.command {
        print_config(&config);
        return Ok(());
    }

    let (full_name, email) = match &cli.command {
        Command::Clone {
            full_name, email, ..
        } => (full_name.clone(), email.clone()),
        _ => (None, None),
    };
    let widget = build_widget(&config, cli.api_key.clone(), full_name, email).await?;

    match cli.command {
        Command::Voices { refresh } => {
            let selector = widget.selector();
            selector.load_voices(refresh).await?;
            let selected = selector.selected();
            for voice in selector.voices() {
                let marker = if selected.as_deref() == Some(voice.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<40} {}", marker, voice.id, voice.label());
            }
        }
        Command::Select { voice_id } => {
            widget.selector().select_voice(&voice_id)?;
            println!("Selected voice {}", voice_id.trim());
        }
        Command::Read { text } => match widget.read_text(&text).await? {
            Some(handle) => {
                let state = handle.wait_finished().await;
                tracing::debug!(state = ?state, "Playback finished");
                #[cfg(not(feature = "playback"))]
                println!("Audio written to {}", config.playback.output_dir.display());
            }
            None => println!("No voice selected; run `speechly select <voice-id>` first"),
        },
        Command::Clone {
            sample,
            record_secs,
            name,
            gender,
            ..
        } => {
            let recorder = widget.recorder();
            match (sample, record_secs) {
                (Some(path), _) => {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "sample.mp3".to_string());
                    let data = tokio::fs::read(&path).await?;
                    let file = AudioFile::new(&filename, mime_type_for_filename(&filename), data);
                    recorder.upload(file).await?;
                }
                (None, Some(secs)) => {
                    recorder.start_recording().await?;
                    println!("Recording for {}s...", secs);
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    recorder.stop_recording().await?;
                }
                (None, None) => anyhow::bail!("Provide --sample <file> or --record-secs <n>"),
            }

            let voice = recorder.submit_clone(&name, gender.into()).await?;
            println!("Cloned voice {} ({})", voice.id, voice.display_name);
        }
        Command::Config => {}
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},speechly={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn build_widget(
    config: &AppConfig,
    api_key: Option<String>,
    full_name: Option<String>,
    email: Option<String>,
) -> anyhow::Result<Speechly> {
    let api_key = api_key
        .or_else(|| config.api.key.clone())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("No API key: pass --api-key or set SPEECHLY__API__KEY")
        })?;

    // 确保数据目录存在
    if let Some(parent) = std::path::Path::new(&config.storage.path).parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let store = Arc::new(SledKeyValueStore::open(&config.storage.path)?);

    let keys = ApiKeyResolver::new(config.api.key.clone()).arc();
    let client = ApiClient::new(config.api.client_config(), keys.clone())?.arc();

    let props = SpeechlyProps {
        api_key: api_key.clone(),
        full_name: full_name.or_else(|| config.consent.full_name.clone()),
        email: email.or_else(|| config.consent.email.clone()),
    };

    let widget = Speechly::new(
        props,
        SpeechlyDeps {
            api: Arc::new(HttpSpeechApi::new(client)),
            keys: keys.clone(),
            player: build_player(config).await?,
            recorder: build_recorder(),
            probe: Arc::new(SymphoniaAudioProbe::new()),
            store,
            clock: Arc::new(SystemClock),
            settings: SpeechlySettings {
                voices_ttl_millis: config.cache.ttl_millis(),
                max_upload_size: config.recorder.max_upload_size,
                popup: config.popup.layout(),
            },
        },
    )?;

    // CLI 不挂载监听，只设置运行时 key
    keys.set_api_key(&api_key);
    Ok(widget)
}

async fn build_player(config: &AppConfig) -> anyhow::Result<Arc<dyn AudioPlayerPort>> {
    #[cfg(feature = "playback")]
    match speechly::infrastructure::adapters::playback::RodioAudioPlayer::new() {
        Ok(player) => return Ok(Arc::new(player)),
        Err(e) => tracing::warn!(error = %e, "No audio output, writing files instead"),
    }

    Ok(Arc::new(FileAudioSink::new(&config.playback.output_dir).await?))
}

fn build_recorder() -> Option<Arc<dyn MediaRecorderPort>> {
    #[cfg(feature = "mic")]
    {
        use speechly::infrastructure::adapters::media::CpalMediaRecorder;
        if CpalMediaRecorder::is_available() {
            return Some(Arc::new(CpalMediaRecorder::new()));
        }
        tracing::warn!("No input device, recording disabled");
    }
    None
}
