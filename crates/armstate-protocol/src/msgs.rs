//! 输出通道消息结构
//!
//! 四个通道各自拥有一个消息缓冲区，缓冲区在初始化时确定形状，之后只覆盖动态字段：
//!
//! | 通道 | 消息 |
//! |------|------|
//! | 完整状态 | [`RobotStateMsg`] |
//! | 关节状态 | [`JointStateMsg`] |
//! | 坐标系 | [`TfMessage`]（固定 2 个变换） |
//! | 外部力 | [`WrenchStamped`] |

use crate::errors::ErrorsMsg;
use crate::state::IDENTITY_TRANSFORM;
use crate::{COM_LEN, ELBOW_LEN, INERTIA_LEN, NUM_AXES, NUM_JOINTS, TRANSFORM_LEN};
use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use std::time::Duration;

/// 消息头
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// 序列号（同一触发周期内四个通道相同）
    pub seq: u32,
    /// 时间戳（等于触发周期的时间）
    pub stamp: Duration,
    /// 坐标系名称
    pub frame_id: String,
}

impl Header {
    pub fn with_frame(frame_id: impl Into<String>) -> Self {
        Self {
            frame_id: frame_id.into(),
            ..Self::default()
        }
    }
}

/// 三维向量
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 四元数（x, y, z, w）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 刚体变换（平移 + 旋转）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl Transform {
    /// 单位旋转 + 给定平移
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            translation: Vector3::new(x, y, z),
            rotation: Quaternion::IDENTITY,
        }
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        let t = &iso.translation.vector;
        // coords 存储顺序为 [x, y, z, w]
        let q = &iso.rotation.quaternion().coords;
        Self {
            translation: Vector3::new(t[0], t[1], t[2]),
            rotation: Quaternion {
                x: q[0],
                y: q[1],
                z: q[2],
                w: q[3],
            },
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        let r = &self.rotation;
        let rotation =
            UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(r.w, r.x, r.y, r.z));
        let t = &self.translation;
        Isometry3::from_parts(Translation3::new(t.x, t.y, t.z), rotation)
    }
}

impl From<Isometry3<f64>> for Transform {
    fn from(iso: Isometry3<f64>) -> Self {
        Self::from_isometry(&iso)
    }
}

/// 带时间戳的坐标变换（`header.frame_id` 为父坐标系）
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Transform,
}

/// 坐标系通道消息：0 = 法兰 → 末端执行器，1 = 末端执行器 → 刚度坐标系
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TfMessage {
    pub transforms: [TransformStamped; 2],
}

/// 关节状态通道消息
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointStateMsg {
    pub header: Header,
    pub name: [String; NUM_JOINTS],
    pub position: [f64; NUM_JOINTS],
    pub velocity: [f64; NUM_JOINTS],
    pub effort: [f64; NUM_JOINTS],
}

/// 力/力矩
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Wrench {
    pub force: Vector3,
    pub torque: Vector3,
}

impl Wrench {
    /// 从 6 维数组（fx, fy, fz, tx, ty, tz）构造
    pub fn from_array(w: &[f64; NUM_AXES]) -> Self {
        Self {
            force: Vector3::new(w[0], w[1], w[2]),
            torque: Vector3::new(w[3], w[4], w[5]),
        }
    }
}

/// 外部力通道消息
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WrenchStamped {
    pub header: Header,
    pub wrench: Wrench,
}

/// 完整状态通道消息
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotStateMsg {
    pub header: Header,
    pub cartesian_collision: [f64; NUM_AXES],
    pub cartesian_contact: [f64; NUM_AXES],
    pub k_f_ext_hat_k: [f64; NUM_AXES],
    pub o_f_ext_hat_k: [f64; NUM_AXES],
    pub q: [f64; NUM_JOINTS],
    pub dq: [f64; NUM_JOINTS],
    pub tau_j: [f64; NUM_JOINTS],
    pub dtau_j: [f64; NUM_JOINTS],
    pub joint_collision: [f64; NUM_JOINTS],
    pub joint_contact: [f64; NUM_JOINTS],
    pub q_d: [f64; NUM_JOINTS],
    pub tau_ext_hat_filtered: [f64; NUM_JOINTS],
    pub elbow: [f64; ELBOW_LEN],
    pub elbow_d: [f64; ELBOW_LEN],
    pub o_t_ee: [f64; TRANSFORM_LEN],
    pub f_t_ee: [f64; TRANSFORM_LEN],
    pub ee_t_k: [f64; TRANSFORM_LEN],
    pub o_t_ee_d: [f64; TRANSFORM_LEN],
    pub m_load: f64,
    pub i_load: [f64; INERTIA_LEN],
    pub f_x_cload: [f64; COM_LEN],
    /// 设备时间（秒）
    pub time: f64,
    pub current_errors: ErrorsMsg,
    pub last_motion_errors: ErrorsMsg,
}

impl Default for RobotStateMsg {
    fn default() -> Self {
        Self {
            header: Header::default(),
            cartesian_collision: [0.0; NUM_AXES],
            cartesian_contact: [0.0; NUM_AXES],
            k_f_ext_hat_k: [0.0; NUM_AXES],
            o_f_ext_hat_k: [0.0; NUM_AXES],
            q: [0.0; NUM_JOINTS],
            dq: [0.0; NUM_JOINTS],
            tau_j: [0.0; NUM_JOINTS],
            dtau_j: [0.0; NUM_JOINTS],
            joint_collision: [0.0; NUM_JOINTS],
            joint_contact: [0.0; NUM_JOINTS],
            q_d: [0.0; NUM_JOINTS],
            tau_ext_hat_filtered: [0.0; NUM_JOINTS],
            elbow: [0.0; ELBOW_LEN],
            elbow_d: [0.0; ELBOW_LEN],
            o_t_ee: IDENTITY_TRANSFORM,
            f_t_ee: IDENTITY_TRANSFORM,
            ee_t_k: IDENTITY_TRANSFORM,
            o_t_ee_d: IDENTITY_TRANSFORM,
            m_load: 0.0,
            i_load: [0.0; INERTIA_LEN],
            f_x_cload: [0.0; COM_LEN],
            time: 0.0,
            current_errors: ErrorsMsg::default(),
            last_motion_errors: ErrorsMsg::default(),
        }
    }
}
