//! Events - 事件发布与订阅
//!
//! - publisher: UI 事件（toast、播放状态、选区）
//! - refetch: 音色列表刷新通知
//! - selection: 选区变化事件源

mod publisher;
mod refetch;
mod selection;

pub use publisher::{NotificationLevel, PlaybackStatus, WidgetEvent, WidgetEventPublisher};
pub use refetch::{RefetchChannel, RefetchEvent};
pub use selection::{SelectionChange, SelectionEvents};
