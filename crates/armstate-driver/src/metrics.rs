//! 发布性能指标模块
//!
//! 提供零开销的原子计数器，用于监控发布链路的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，不会引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 单个输出通道的指标
///
/// # 使用示例
///
/// ```rust
/// use armstate_driver::PublisherMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = PublisherMetrics::default();
/// metrics.published.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.published, 1);
/// ```
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    /// 生产者成功填充并提交的次数
    pub published: AtomicU64,

    /// 因 try-lock 争用（或上一帧尚未投递）而跳过的次数
    ///
    /// 如果这个值快速增长，说明消费者（传输层）处理速度跟不上发布频率。
    pub skipped: AtomicU64,

    /// 投递线程交给传输层的消息数
    pub delivered: AtomicU64,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> PublisherMetricsSnapshot {
        PublisherMetricsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器（用于性能测试）
    pub fn reset(&self) {
        self.published.store(0, Ordering::Relaxed);
        self.skipped.store(0, Ordering::Relaxed);
        self.delivered.store(0, Ordering::Relaxed);
    }
}

/// 通道指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublisherMetricsSnapshot {
    pub published: u64,
    pub skipped: u64,
    pub delivered: u64,
}

impl PublisherMetricsSnapshot {
    /// 跳过率（百分比），无尝试时返回 0.0
    pub fn skip_rate(&self) -> f64 {
        let attempts = self.published + self.skipped;
        if attempts == 0 {
            return 0.0;
        }
        (self.skipped as f64 / attempts as f64) * 100.0
    }
}

/// 控制器指标
#[derive(Debug, Default)]
pub struct ControllerMetrics {
    /// `update` 调用总次数
    pub ticks_total: AtomicU64,

    /// 触发输出的周期数（等于已分配的序列号数量）
    pub ticks_fired: AtomicU64,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ControllerMetricsSnapshot {
        ControllerMetricsSnapshot {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            ticks_fired: self.ticks_fired.load(Ordering::Relaxed),
        }
    }
}

/// 控制器指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerMetricsSnapshot {
    pub ticks_total: u64,
    pub ticks_fired: u64,
}
