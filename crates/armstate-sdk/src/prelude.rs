//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use armstate_sdk::prelude::*;
//! ```

// 控制器与配置
pub use armstate_driver::{
    ControllerConfig, DEFAULT_PUBLISH_RATE_HZ, StateController, StateControllerBuilder,
    default_joint_names,
};
pub use armstate_driver::{
    TOPIC_EXTERNAL_WRENCH, TOPIC_JOINT_STATES, TOPIC_ROBOT_STATES, TOPIC_TF,
};

// 传输层与硬件抽象（常用 Trait）
pub use armstate_driver::{
    ChannelTransport, LogTransport, MessageSink, RobotHardware, StateHandle, StateInterface,
    Transport,
};

// 输出消息与状态
pub use armstate_protocol::{
    ErrorsMsg, Fault, JointStateMsg, RobotErrors, RobotState, RobotStateMsg, TfMessage,
    WrenchStamped,
};

// 错误类型
pub use armstate_driver::{DriverError, HardwareError};
pub use armstate_protocol::ProtocolError;
