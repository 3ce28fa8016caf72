//! Clock Port - 时间源
//!
//! 缓存过期判断依赖注入的时钟，便于测试

use chrono::Utc;

pub trait ClockPort: Send + Sync {
    /// 当前时间（毫秒时间戳）
    fn now_millis(&self) -> i64;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockPort for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
