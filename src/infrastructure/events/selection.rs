//! Selection Events
//!
//! 宿主（浏览器桥接、终端、测试）在选区变化时调用 `emit`，
//! 编排器挂载时订阅，卸载时通过取消信号退出监听。

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::domain::selection::SelectionSnapshot;

/// 选区变化事件；None 表示没有选区
pub type SelectionChange = Option<SelectionSnapshot>;

/// `selectionchange` 事件源
#[derive(Debug, Clone)]
pub struct SelectionEvents {
    sender: broadcast::Sender<SelectionChange>,
}

impl SelectionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SelectionChange> {
        self.sender.subscribe()
    }

    /// 派发一次选区变化
    pub fn emit(&self, change: SelectionChange) {
        if self.sender.send(change).is_err() {
            tracing::trace!("selectionchange dropped (no listeners)");
        }
    }

    /// 当前注册的监听者数量
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SelectionEvents {
    fn default() -> Self {
        Self::new()
    }
}
