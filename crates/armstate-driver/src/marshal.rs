//! 状态快照 → 通道消息的逐字段映射
//!
//! 所有函数都是纯函数：只覆盖消息的动态字段，不分配内存（坐标系名称等静态字段在
//! 初始化时由 `initial_*` 函数写入，之后不再改变）。
//!
//! | 通道 | 动态字段来源 |
//! |------|-------------|
//! | 完整状态 | 快照的每个字段，故障位集合经 [`errors_to_message`] 转换 |
//! | 关节状态 | `position = q`，`velocity = dq`，`effort = tau_j` |
//! | 坐标系 | `f_t_ee`、`ee_t_k` 经 [`convert_array_to_transform`] 转换 |
//! | 外部力 | `k_f_ext_hat_k`（前 3 个为力，后 3 个为力矩） |

use armstate_protocol::{
    Header, JointStateMsg, NUM_JOINTS, RobotState, RobotStateMsg, TfMessage, Transform,
    TransformStamped, Wrench, WrenchStamped, convert_array_to_transform, errors_to_message,
};
use std::time::Duration;

/// 由 arm_id 派生的坐标系名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIds {
    /// 法兰：`<arm_id>_link8`
    pub flange: String,
    /// 末端执行器：`<arm_id>_EE`
    pub end_effector: String,
    /// 刚度坐标系：`<arm_id>_K`
    pub stiffness: String,
}

impl FrameIds {
    pub fn new(arm_id: &str) -> Self {
        Self {
            flange: format!("{arm_id}_link8"),
            end_effector: format!("{arm_id}_EE"),
            stiffness: format!("{arm_id}_K"),
        }
    }
}

/// 首次触发前末端执行器相对法兰的默认偏移（沿 z 轴，米）
pub const DEFAULT_FLANGE_TO_EE_Z: f64 = 0.05;

#[inline]
fn stamp_header(header: &mut Header, seq: u32, stamp: Duration) {
    header.seq = seq;
    header.stamp = stamp;
}

/// 完整状态通道的初始缓冲区
pub fn initial_robot_state() -> RobotStateMsg {
    RobotStateMsg::default()
}

/// 坐标系通道的初始缓冲区：两个变换都是单位旋转，
/// 法兰 → 末端执行器带默认偏移，末端执行器 → 刚度坐标系为零平移
pub fn initial_transforms(frames: &FrameIds) -> TfMessage {
    TfMessage {
        transforms: [
            TransformStamped {
                header: Header::with_frame(frames.flange.as_str()),
                child_frame_id: frames.end_effector.clone(),
                transform: Transform::from_translation(0.0, 0.0, DEFAULT_FLANGE_TO_EE_Z),
            },
            TransformStamped {
                header: Header::with_frame(frames.end_effector.as_str()),
                child_frame_id: frames.stiffness.clone(),
                transform: Transform::from_translation(0.0, 0.0, 0.0),
            },
        ],
    }
}

/// 外部力通道的初始缓冲区（零力）
pub fn initial_external_wrench(frames: &FrameIds) -> WrenchStamped {
    WrenchStamped {
        header: Header::with_frame(frames.stiffness.as_str()),
        wrench: Wrench::default(),
    }
}

/// 关节状态通道的初始缓冲区
pub fn initial_joint_state(names: [String; NUM_JOINTS]) -> JointStateMsg {
    JointStateMsg {
        name: names,
        ..JointStateMsg::default()
    }
}

/// 填充完整状态消息
pub fn fill_robot_state(msg: &mut RobotStateMsg, state: &RobotState, seq: u32, stamp: Duration) {
    msg.cartesian_collision = state.cartesian_collision;
    msg.cartesian_contact = state.cartesian_contact;
    msg.k_f_ext_hat_k = state.k_f_ext_hat_k;
    msg.o_f_ext_hat_k = state.o_f_ext_hat_k;

    msg.q = state.q;
    msg.dq = state.dq;
    msg.tau_j = state.tau_j;
    msg.dtau_j = state.dtau_j;
    msg.joint_collision = state.joint_collision;
    msg.joint_contact = state.joint_contact;
    msg.q_d = state.q_d;
    msg.tau_ext_hat_filtered = state.tau_ext_hat_filtered;

    msg.elbow = state.elbow;
    msg.elbow_d = state.elbow_d;

    msg.o_t_ee = state.o_t_ee;
    msg.f_t_ee = state.f_t_ee;
    msg.ee_t_k = state.ee_t_k;
    msg.o_t_ee_d = state.o_t_ee_d;

    msg.m_load = state.m_load;
    msg.i_load = state.i_load;
    msg.f_x_cload = state.f_x_cload;

    msg.time = state.time.secs();
    msg.current_errors = errors_to_message(&state.current_errors);
    msg.last_motion_errors = errors_to_message(&state.last_motion_errors);

    stamp_header(&mut msg.header, seq, stamp);
}

/// 填充坐标系消息（只覆盖变换和消息头的 seq/stamp，坐标系名称保持不变）
pub fn fill_transforms(msg: &mut TfMessage, state: &RobotState, seq: u32, stamp: Duration) {
    let [flange_to_ee, ee_to_k] = &mut msg.transforms;

    flange_to_ee.transform = convert_array_to_transform(&state.f_t_ee).into();
    stamp_header(&mut flange_to_ee.header, seq, stamp);

    ee_to_k.transform = convert_array_to_transform(&state.ee_t_k).into();
    stamp_header(&mut ee_to_k.header, seq, stamp);
}

/// 填充外部力消息
pub fn fill_external_wrench(
    msg: &mut WrenchStamped,
    state: &RobotState,
    seq: u32,
    stamp: Duration,
) {
    msg.wrench = Wrench::from_array(&state.k_f_ext_hat_k);
    stamp_header(&mut msg.header, seq, stamp);
}

/// 填充关节状态消息
pub fn fill_joint_state(msg: &mut JointStateMsg, state: &RobotState, seq: u32, stamp: Duration) {
    msg.position = state.q;
    msg.velocity = state.dq;
    msg.effort = state.tau_j;
    stamp_header(&mut msg.header, seq, stamp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use armstate_protocol::{DeviceTime, Fault, IDENTITY_TRANSFORM, RobotErrors, Vector3};

    fn joint_names() -> [String; NUM_JOINTS] {
        std::array::from_fn(|i| format!("panda_joint{}", i + 1))
    }

    fn sample_state() -> RobotState {
        let mut state = RobotState::default();
        for i in 0..NUM_JOINTS {
            state.q[i] = (i + 1) as f64;
            state.dq[i] = (i + 1) as f64 * 10.0;
            state.tau_j[i] = (i + 1) as f64 * 100.0;
        }
        state.k_f_ext_hat_k = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        state.time = DeviceTime::from_millis(1500);
        state.current_errors = RobotErrors::empty().with(Fault::JointReflex);
        state
    }

    #[test]
    fn test_frame_ids() {
        let frames = FrameIds::new("panda");
        assert_eq!(frames.flange, "panda_link8");
        assert_eq!(frames.end_effector, "panda_EE");
        assert_eq!(frames.stiffness, "panda_K");
    }

    #[test]
    fn test_initial_transforms_seeded() {
        let tf = initial_transforms(&FrameIds::new("panda"));

        let [first, second] = &tf.transforms;
        assert_eq!(first.header.frame_id, "panda_link8");
        assert_eq!(first.child_frame_id, "panda_EE");
        assert_eq!(first.transform.translation, Vector3::new(0.0, 0.0, 0.05));
        assert_eq!(first.transform.rotation.w, 1.0);

        assert_eq!(second.header.frame_id, "panda_EE");
        assert_eq!(second.child_frame_id, "panda_K");
        assert_eq!(second.transform.translation, Vector3::default());
        assert_eq!(second.transform.rotation.w, 1.0);
    }

    #[test]
    fn test_initial_wrench_is_zero() {
        let msg = initial_external_wrench(&FrameIds::new("fr3"));
        assert_eq!(msg.header.frame_id, "fr3_K");
        assert_eq!(msg.wrench, Wrench::default());
    }

    #[test]
    fn test_fill_joint_state() {
        let mut msg = initial_joint_state(joint_names());
        let state = sample_state();
        fill_joint_state(&mut msg, &state, 7, Duration::from_millis(20));

        for i in 0..NUM_JOINTS {
            assert_eq!(msg.name[i], format!("panda_joint{}", i + 1));
            assert_eq!(msg.position[i], (i + 1) as f64);
        }
        assert_eq!(msg.velocity, state.dq);
        assert_eq!(msg.effort, state.tau_j);
        assert_eq!(msg.header.seq, 7);
        assert_eq!(msg.header.stamp, Duration::from_millis(20));
    }

    #[test]
    fn test_fill_external_wrench() {
        let frames = FrameIds::new("panda");
        let mut msg = initial_external_wrench(&frames);
        fill_external_wrench(&mut msg, &sample_state(), 3, Duration::from_secs(1));

        assert_eq!(msg.wrench.force, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(msg.wrench.torque, Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(msg.header.frame_id, "panda_K");
        assert_eq!(msg.header.seq, 3);
    }

    #[test]
    fn test_fill_transforms_keeps_frame_names() {
        let frames = FrameIds::new("panda");
        let mut msg = initial_transforms(&frames);

        let mut state = sample_state();
        state.f_t_ee = IDENTITY_TRANSFORM;
        state.f_t_ee[14] = 0.1034;
        state.ee_t_k = IDENTITY_TRANSFORM;
        state.ee_t_k[12] = 0.2;

        fill_transforms(&mut msg, &state, 11, Duration::from_millis(33));

        let [first, second] = &msg.transforms;
        assert_eq!(first.header.frame_id, "panda_link8");
        assert_eq!(first.child_frame_id, "panda_EE");
        assert!((first.transform.translation.z - 0.1034).abs() < 1e-12);
        assert!((second.transform.translation.x - 0.2).abs() < 1e-12);
        for t in [first, second] {
            assert_eq!(t.header.seq, 11);
            assert_eq!(t.header.stamp, Duration::from_millis(33));
        }
    }

    #[test]
    fn test_fill_robot_state() {
        let mut msg = initial_robot_state();
        let mut state = sample_state();
        state.m_load = 0.73;
        state.i_load[4] = 0.001;
        state.f_x_cload = [0.0, 0.0, 0.02];
        state.elbow = [0.3, -1.0];
        state.cartesian_contact[2] = 1.0;
        state.last_motion_errors =
            RobotErrors::empty().with(Fault::JointMotionGeneratorVelocityLimitsViolation);

        fill_robot_state(&mut msg, &state, 42, Duration::from_millis(99));

        assert_eq!(msg.q, state.q);
        assert_eq!(msg.dq, state.dq);
        assert_eq!(msg.tau_j, state.tau_j);
        assert_eq!(msg.k_f_ext_hat_k, state.k_f_ext_hat_k);
        assert_eq!(msg.cartesian_contact, state.cartesian_contact);
        assert_eq!(msg.elbow, state.elbow);
        assert_eq!(msg.m_load, 0.73);
        assert_eq!(msg.i_load, state.i_load);
        assert_eq!(msg.f_x_cload, state.f_x_cload);
        assert!((msg.time - 1.5).abs() < 1e-12);
        assert!(msg.current_errors.joint_reflex);
        assert!(
            msg.last_motion_errors
                .joint_motion_generator_velocity_limits_violation
        );
        assert!(!msg.last_motion_errors.joint_reflex);
        assert_eq!(msg.header.seq, 42);
        assert_eq!(msg.header.stamp, Duration::from_millis(99));
    }
}
