//! Armstate SDK - 机械臂状态发布
//!
//! 把 1kHz 实时控制循环中的机器人状态，以较低频率（默认 30Hz）无阻塞地发布到四个通道：
//! 完整状态、关节状态、坐标系、外部力。
//!
//! # 架构设计
//!
//! - **协议层** (`protocol`): 状态快照、故障位集合、输出消息、坐标变换转换
//! - **驱动层** (`driver`): 频率门控、try-lock 发布器、控制器、传输层与硬件抽象
//! - **日志** (`logging`): `tracing` 初始化
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use armstate_sdk::prelude::*;
//! # fn example(hardware: &dyn RobotHardware) -> Result<(), DriverError> {
//!
//! let transport = ChannelTransport::default();
//! let joints = transport.subscribe::<JointStateMsg>(TOPIC_JOINT_STATES).unwrap();
//!
//! let mut controller = StateControllerBuilder::new("panda")
//!     .publish_rate(30.0)
//!     .build(hardware, &transport)?;
//!
//! // 在控制循环中每周期调用
//! controller.update(std::time::Duration::from_millis(1));
//! let _msg = joints.recv();
//! # Ok(())
//! # }
//! ```

pub mod logging;
pub mod prelude;

/// 协议层
pub mod protocol {
    pub use armstate_protocol::*;
}

/// 驱动层
pub mod driver {
    pub use armstate_driver::*;
}

// --- 用户以此为界 ---
// 以下是通过 Facade Pattern 提供的公共 API

pub use armstate_driver::{
    ChannelTransport, ControllerConfig, DriverError, HardwareError, LogTransport, RateTrigger,
    RealtimePublisher, RobotHardware, StateController, StateControllerBuilder, StateHandle,
    StateInterface, Transport,
};
pub use armstate_protocol::{ProtocolError, RobotState};
pub use logging::{init_logging, init_logging_with_filter};
