//! 驱动层模块
//!
//! 本模块把实时控制循环与低频状态发布解耦，包括：
//! - 发布频率门控（[`RateTrigger`]）
//! - 非阻塞输出通道（[`RealtimePublisher`]，try-lock 失败即跳过）
//! - 四通道状态发布控制器（[`StateController`]）
//! - 传输层抽象（[`Transport`] / [`MessageSink`]）
//! - 硬件状态句柄抽象（[`StateHandle`] / [`StateInterface`]）
//!
//! # 线程模型
//!
//! ```text
//! 控制线程 (1kHz)                       投递线程 (每通道一个)
//!   StateController::update(now)
//!     └─ RateTrigger 未触发 → 返回
//!     └─ 触发：复制快照
//!          ├─ try_lock → 填充 → unlock_and_publish ──→ drain → MessageSink::publish
//!          ├─ try_lock 失败 → 本周期跳过该通道
//!          └─ ...
//! ```

pub mod config;
pub mod controller;
mod error;
pub mod hardware;
pub mod loop_runner;
pub mod marshal;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod publisher;
pub mod transport;
pub mod trigger;

pub use config::{ControllerConfig, DEFAULT_PUBLISH_RATE_HZ, default_joint_names};
pub use controller::{
    ChannelHandles, FrameIds, StateController, StateControllerBuilder, TOPIC_EXTERNAL_WRENCH,
    TOPIC_JOINT_STATES, TOPIC_ROBOT_STATES, TOPIC_TF,
};
pub use error::{DriverError, HardwareError};
pub use hardware::{RobotHardware, StateHandle, StateInterface};
pub use loop_runner::{LoopConfig, LoopStats, run_periodic};
pub use metrics::{
    ControllerMetrics, ControllerMetricsSnapshot, PublisherMetrics, PublisherMetricsSnapshot,
};
pub use publisher::{PublisherGuard, PublisherHandle, RealtimePublisher};
pub use transport::{ChannelTransport, LogTransport, Message, MessageSink, Transport};
pub use trigger::RateTrigger;
