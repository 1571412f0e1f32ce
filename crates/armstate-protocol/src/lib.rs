//! # Armstate Protocol
//!
//! 机械臂状态发布的数据定义（无硬件依赖、无线程）
//!
//! ## 模块
//!
//! - `state`: 每个控制周期从硬件句柄复制出的状态快照 [`RobotState`]
//! - `errors`: 故障位集合 [`RobotErrors`] 及其对外的具名布尔记录 [`ErrorsMsg`]
//! - `msgs`: 四个输出通道的消息结构
//! - `transform`: 16 元素列主序齐次变换与刚体变换之间的转换
//!
//! ## 尺寸约定
//!
//! 所有数组字段都是定长数组，长度在编译期确定：
//!
//! | 类别 | 长度 |
//! |------|------|
//! | 关节向量 | [`NUM_JOINTS`] = 7 |
//! | 笛卡尔向量 | [`NUM_AXES`] = 6 |
//! | 齐次变换 | [`TRANSFORM_LEN`] = 16（列主序） |
//! | 肘部配置 | [`ELBOW_LEN`] = 2 |
//! | 负载惯量 | [`INERTIA_LEN`] = 9 |
//! | 负载质心 | [`COM_LEN`] = 3 |

pub mod errors;
pub mod msgs;
pub mod state;
pub mod transform;

// 重新导出常用类型
pub use errors::*;
pub use msgs::*;
pub use state::*;
pub use transform::*;

use thiserror::Error;

/// 关节数量
pub const NUM_JOINTS: usize = 7;

/// 笛卡尔轴数量（3 个力 + 3 个力矩）
pub const NUM_AXES: usize = 6;

/// 齐次变换数组长度（4x4，列主序）
pub const TRANSFORM_LEN: usize = 16;

/// 肘部配置长度
pub const ELBOW_LEN: usize = 2;

/// 负载惯量张量长度（3x3）
pub const INERTIA_LEN: usize = 9;

/// 负载质心偏移长度
pub const COM_LEN: usize = 3;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid length for {field}: expected {expected}, got {actual}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid fault index: {0}")]
    InvalidFault(u8),
}
