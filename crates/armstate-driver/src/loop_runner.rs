//! Loop Runner - 周期控制循环
//!
//! 以固定频率调用 `tick(now)`，`now` 为循环启动以来的单调时间。
//! 用于在没有宿主控制框架时驱动 [`StateController::update`](crate::StateController::update)。
//!
//! # 核心功能
//!
//! - **精确定时**: 使用 `spin_sleep` 实现低抖动延时
//! - **按截止时间调度**: 周期 N 的截止时间为 `start + N * period`，单次超时不会累积漂移
//! - **超时统计**: 记录超过截止时间的周期数

use crate::error::DriverError;
use spin_sleep::SpinSleeper;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    ///
    /// 例如：1000.0 表示 1kHz（1ms 周期）
    pub frequency_hz: f64,

    /// 最大迭代次数（None 表示运行到 `is_running` 被清除）
    pub max_iterations: Option<u64>,

    /// 尝试把当前线程提升为最高优先级（需要 `realtime` feature）
    pub realtime_priority: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 1000.0,
            max_iterations: None,
            realtime_priority: false,
        }
    }
}

/// 循环运行统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    /// 执行的周期数
    pub iterations: u64,
    /// 错过截止时间的周期数
    pub overruns: u64,
    /// 单次 tick 的最长耗时
    pub max_tick: Duration,
    /// 总运行时间
    pub elapsed: Duration,
}

/// 运行周期循环
///
/// 阻塞直到 `is_running` 变为 false 或达到 `max_iterations`。
///
/// # 参数
///
/// - `config`: 循环配置
/// - `is_running`: 运行标志（例如由 Ctrl-C 处理器清除）
/// - `tick`: 每周期回调，参数为循环启动以来的时间
///
/// # 错误
/// - `DriverError::InvalidLoopFrequency`: 频率 ≤ 0 或非有限值
pub fn run_periodic<F>(
    config: &LoopConfig,
    is_running: &AtomicBool,
    mut tick: F,
) -> Result<LoopStats, DriverError>
where
    F: FnMut(Duration),
{
    if !config.frequency_hz.is_finite() || config.frequency_hz <= 0.0 {
        return Err(DriverError::InvalidLoopFrequency(config.frequency_hz));
    }
    if config.frequency_hz > 10000.0 {
        warn!(
            "Very high control frequency: {} Hz. This may cause performance issues.",
            config.frequency_hz
        );
    }

    if config.realtime_priority {
        set_realtime_priority();
    }

    let period = Duration::from_secs_f64(1.0 / config.frequency_hz);
    let sleeper = SpinSleeper::default();
    let start = Instant::now();
    let mut stats = LoopStats::default();
    let mut deadline = start;

    loop {
        if let Some(max_iter) = config.max_iterations
            && stats.iterations >= max_iter
        {
            break;
        }
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Loop runner: is_running flag is false, exiting");
            break;
        }

        let tick_start = Instant::now();
        tick(tick_start - start);
        stats.max_tick = stats.max_tick.max(tick_start.elapsed());
        stats.iterations += 1;

        deadline += period;
        let now = Instant::now();
        if now < deadline {
            sleeper.sleep(deadline - now);
        } else {
            stats.overruns += 1;
            // 严重落后时重新对齐，避免连续补跑
            if now - deadline > period {
                deadline = now;
            }
        }
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

#[cfg(feature = "realtime")]
fn set_realtime_priority() {
    use thread_priority::*;
    use tracing::info;

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => {
            info!("Control loop thread priority set to MAX (realtime)");
        },
        Err(e) => {
            warn!(
                "Failed to set control loop thread priority: {}. \
                On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                e
            );
        },
    }
}

#[cfg(not(feature = "realtime"))]
fn set_realtime_priority() {
    warn!("Realtime priority requested but the `realtime` feature is disabled");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_config_default() {
        let config = LoopConfig::default();
        assert_eq!(config.frequency_hz, 1000.0);
        assert_eq!(config.max_iterations, None);
        assert!(!config.realtime_priority);
    }

    #[test]
    fn test_invalid_frequency() {
        let running = AtomicBool::new(true);
        for hz in [0.0, -1.0, f64::NAN] {
            let config = LoopConfig {
                frequency_hz: hz,
                ..LoopConfig::default()
            };
            assert!(matches!(
                run_periodic(&config, &running, |_| {}),
                Err(DriverError::InvalidLoopFrequency(_))
            ));
        }
    }

    #[test]
    fn test_max_iterations_and_monotonic_time() {
        let running = AtomicBool::new(true);
        let config = LoopConfig {
            frequency_hz: 2000.0,
            max_iterations: Some(20),
            realtime_priority: false,
        };

        let mut times = Vec::new();
        let stats = run_periodic(&config, &running, |now| times.push(now)).unwrap();

        assert_eq!(stats.iterations, 20);
        assert_eq!(times.len(), 20);
        assert!(times.windows(2).all(|w| w[1] >= w[0]));
        // 20 个 0.5ms 周期
        assert!(stats.elapsed >= Duration::from_millis(9));
    }

    #[test]
    fn test_stops_when_flag_cleared() {
        let running = AtomicBool::new(true);
        let config = LoopConfig {
            frequency_hz: 1000.0,
            max_iterations: Some(10_000),
            realtime_priority: false,
        };

        let mut count = 0;
        let stats = run_periodic(&config, &running, |_| {
            count += 1;
            if count == 5 {
                running.store(false, Ordering::Release);
            }
        })
        .unwrap();
        assert_eq!(stats.iterations, 5);
    }
}
