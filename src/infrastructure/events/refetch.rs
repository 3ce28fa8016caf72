//! Refetch Channel
//!
//! 音色列表的“缓存已失效”通知。发布/订阅对象由 VoiceService 持有并注入给订阅方。

use std::sync::Arc;
use tokio::sync::broadcast;

/// 刷新事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchEvent;

/// 刷新通知通道
#[derive(Debug, Clone)]
pub struct RefetchChannel {
    sender: broadcast::Sender<RefetchEvent>,
}

impl RefetchChannel {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅；丢弃返回的 Receiver 即取消订阅
    pub fn subscribe(&self) -> broadcast::Receiver<RefetchEvent> {
        self.sender.subscribe()
    }

    /// 通知所有订阅者；返回收到通知的订阅者数量
    pub fn trigger(&self) -> usize {
        match self.sender.send(RefetchEvent) {
            Ok(receivers) => {
                tracing::debug!(receivers = receivers, "Voices refetch triggered");
                receivers
            }
            Err(_) => {
                tracing::debug!("Voices refetch triggered (no subscribers)");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RefetchChannel {
    fn default() -> Self {
        Self::new()
    }
}
