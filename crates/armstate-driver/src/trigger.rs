//! 发布频率门控
//!
//! 把高频控制循环（如 1kHz）降频到输出频率（默认 30Hz）。

use crate::error::DriverError;
use std::time::Duration;

/// 周期触发器
///
/// 每个控制周期调用一次 [`should_fire`](Self::should_fire)。首次调用必定触发；
/// 之后只有距离上次触发的时间 ≥ 周期时才触发，并把 `now` 记为新的触发时间。
///
/// O(1)、无分配、无阻塞。
///
/// # 示例
///
/// ```rust
/// use armstate_driver::RateTrigger;
/// use std::time::Duration;
///
/// let mut trigger = RateTrigger::new(10.0).unwrap(); // 100ms 周期
/// assert!(trigger.should_fire(Duration::from_millis(0)));
/// assert!(!trigger.should_fire(Duration::from_millis(50)));
/// assert!(trigger.should_fire(Duration::from_millis(100)));
/// ```
#[derive(Debug, Clone)]
pub struct RateTrigger {
    period: Duration,
    last_fire: Option<Duration>,
}

impl RateTrigger {
    /// 创建触发器
    ///
    /// # 错误
    /// - `DriverError::InvalidPublishRate`: 频率 ≤ 0、非有限值，或小到周期无法表示
    pub fn new(frequency_hz: f64) -> Result<Self, DriverError> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(DriverError::InvalidPublishRate(frequency_hz));
        }

        // 频率过小时周期超出 Duration 可表示范围
        let period = Duration::try_from_secs_f64(1.0 / frequency_hz)
            .map_err(|_| DriverError::InvalidPublishRate(frequency_hz))?;

        Ok(Self {
            period,
            last_fire: None,
        })
    }

    /// 触发周期
    pub fn period(&self) -> Duration {
        self.period
    }

    /// 目标频率（Hz）
    pub fn frequency_hz(&self) -> f64 {
        1.0 / self.period.as_secs_f64()
    }

    /// 本周期是否应当输出
    ///
    /// `now` 必须单调不减；时间回退时视为未到周期，不触发。
    #[inline]
    pub fn should_fire(&mut self, now: Duration) -> bool {
        let fire = match self.last_fire {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.period,
        };
        if fire {
            self.last_fire = Some(now);
        }
        fire
    }
}
