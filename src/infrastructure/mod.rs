//! Infrastructure Layer - 基础设施层
//!
//! - adapters: 外部服务适配器（HTTP API、播放、录音、探测）
//! - events: 事件发布与订阅
//! - memory: 内存实现（键值存储、Object URL）
//! - persistence: 持久化（sled）

pub mod adapters;
pub mod events;
pub mod memory;
pub mod persistence;
