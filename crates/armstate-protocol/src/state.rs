//! 机械臂状态快照
//!
//! 每个触发周期从硬件句柄按值复制一次，复制后不可变。

use crate::errors::RobotErrors;
use crate::{COM_LEN, ELBOW_LEN, INERTIA_LEN, NUM_AXES, NUM_JOINTS, TRANSFORM_LEN};

/// 单位齐次变换（列主序）
pub const IDENTITY_TRANSFORM: [f64; TRANSFORM_LEN] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// 设备时间（单调递增，毫秒精度）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceTime {
    millis: u64,
}

impl DeviceTime {
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub const fn millis(&self) -> u64 {
        self.millis
    }

    /// 秒（浮点）
    pub fn secs(&self) -> f64 {
        self.millis as f64 / 1000.0
    }
}

/// 机械臂状态快照
///
/// 字段命名沿用硬件侧的记号：
///
/// - `o_t_ee`：基座 → 末端执行器位姿
/// - `f_t_ee`：法兰 → 末端执行器偏移
/// - `ee_t_k`：末端执行器 → 刚度坐标系偏移
/// - `k_f_ext_hat_k` / `o_f_ext_hat_k`：刚度坐标系 / 基座坐标系下的外力估计
///
/// # 设计特性
///
/// - **Copy**：整个快照约 1.3KB，按值复制，无堆分配
/// - **定长数组**：长度不变量由类型保证
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    // === 关节空间 ===
    /// 关节位置（rad）
    pub q: [f64; NUM_JOINTS],
    /// 关节速度（rad/s）
    pub dq: [f64; NUM_JOINTS],
    /// 关节测量力矩（Nm）
    pub tau_j: [f64; NUM_JOINTS],
    /// 关节力矩导数（Nm/s）
    pub dtau_j: [f64; NUM_JOINTS],
    /// 期望关节位置（rad）
    pub q_d: [f64; NUM_JOINTS],
    /// 滤波后的外部力矩估计（Nm）
    pub tau_ext_hat_filtered: [f64; NUM_JOINTS],
    /// 关节碰撞标志（0.0 / 1.0）
    pub joint_collision: [f64; NUM_JOINTS],
    /// 关节接触标志（0.0 / 1.0）
    pub joint_contact: [f64; NUM_JOINTS],

    // === 笛卡尔空间 ===
    /// 刚度坐标系下的外部力/力矩估计
    pub k_f_ext_hat_k: [f64; NUM_AXES],
    /// 基座坐标系下的外部力/力矩估计
    pub o_f_ext_hat_k: [f64; NUM_AXES],
    pub cartesian_collision: [f64; NUM_AXES],
    pub cartesian_contact: [f64; NUM_AXES],

    // === 齐次变换（列主序） ===
    pub o_t_ee: [f64; TRANSFORM_LEN],
    pub f_t_ee: [f64; TRANSFORM_LEN],
    pub ee_t_k: [f64; TRANSFORM_LEN],
    pub o_t_ee_d: [f64; TRANSFORM_LEN],

    // === 肘部 ===
    pub elbow: [f64; ELBOW_LEN],
    pub elbow_d: [f64; ELBOW_LEN],

    // === 负载 ===
    /// 负载质量（kg）
    pub m_load: f64,
    /// 负载惯量张量（列主序 3x3）
    pub i_load: [f64; INERTIA_LEN],
    /// 负载质心（法兰坐标系）
    pub f_x_cload: [f64; COM_LEN],

    pub time: DeviceTime,
    pub current_errors: RobotErrors,
    pub last_motion_errors: RobotErrors,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            q: [0.0; NUM_JOINTS],
            dq: [0.0; NUM_JOINTS],
            tau_j: [0.0; NUM_JOINTS],
            dtau_j: [0.0; NUM_JOINTS],
            q_d: [0.0; NUM_JOINTS],
            tau_ext_hat_filtered: [0.0; NUM_JOINTS],
            joint_collision: [0.0; NUM_JOINTS],
            joint_contact: [0.0; NUM_JOINTS],
            k_f_ext_hat_k: [0.0; NUM_AXES],
            o_f_ext_hat_k: [0.0; NUM_AXES],
            cartesian_collision: [0.0; NUM_AXES],
            cartesian_contact: [0.0; NUM_AXES],
            o_t_ee: IDENTITY_TRANSFORM,
            f_t_ee: IDENTITY_TRANSFORM,
            ee_t_k: IDENTITY_TRANSFORM,
            o_t_ee_d: IDENTITY_TRANSFORM,
            elbow: [0.0; ELBOW_LEN],
            elbow_d: [0.0; ELBOW_LEN],
            m_load: 0.0,
            i_load: [0.0; INERTIA_LEN],
            f_x_cload: [0.0; COM_LEN],
            time: DeviceTime::default(),
            current_errors: RobotErrors::empty(),
            last_motion_errors: RobotErrors::empty(),
        }
    }
}

impl RobotState {
    /// 是否有任一关节或笛卡尔轴报告碰撞
    pub fn in_collision(&self) -> bool {
        self.joint_collision
            .iter()
            .chain(self.cartesian_collision.iter())
            .any(|&v| v != 0.0)
    }
}
