//! Widget Event Publisher
//!
//! UI 事件推送实现：选区变化、播放状态、音色加载、通知（toast）等

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::recording::RecorderState;
use crate::domain::selection::{FloatingAnchor, Point};

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Loading,
    Playing,
    Paused,
    Stopped,
}

/// Widget 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WidgetEvent {
    /// 选区变化；文本为空表示隐藏弹出按钮
    SelectionChanged {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
        #[serde(skip_serializing_if = "Option::is_none")]
        anchor: Option<FloatingAnchor>,
    },
    /// 控制面板开关
    PanelToggled { open: bool },
    /// 播放状态变更
    PlaybackStateChanged {
        status: PlaybackStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        voice_id: Option<String>,
    },
    /// 音色列表加载完成
    VoicesLoaded { count: usize, from_cache: bool },
    /// 用户选择了音色
    VoiceSelected { voice_id: String },
    /// 音色克隆成功
    VoiceCloned { voice_id: String, display_name: String },
    /// 录音控制器状态变更
    RecorderStateChanged { state: RecorderState },
    /// 用户可见的通知
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

/// 事件发布器
pub struct WidgetEventPublisher {
    channel: broadcast::Sender<WidgetEvent>,
}

impl WidgetEventPublisher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { channel: tx }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅 UI 事件
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.channel.subscribe()
    }

    /// 发布事件
    pub fn publish(&self, event: WidgetEvent) {
        if let Err(e) = self.channel.send(event) {
            tracing::trace!(error = %e, "Widget event dropped (no receivers)");
        }
    }

    /// 发布通知
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            NotificationLevel::Error => tracing::error!(message = %message, "Notification"),
            NotificationLevel::Warning => tracing::warn!(message = %message, "Notification"),
            _ => tracing::info!(message = %message, "Notification"),
        }
        self.publish(WidgetEvent::Notification { level, message });
    }

    /// 发布播放状态变更
    pub fn publish_playback(&self, status: PlaybackStatus, voice_id: Option<&str>) {
        self.publish(WidgetEvent::PlaybackStateChanged {
            status,
            voice_id: voice_id.map(str::to_string),
        });
    }
}

impl Default for WidgetEventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
