//! 故障标志
//!
//! 硬件层以不透明的位集合 [`RobotErrors`] 报告故障，发布层需要的是每个故障类别
//! 一个具名布尔字段的 [`ErrorsMsg`]。[`errors_to_message`] 负责两者之间 1:1 的复制。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 故障类别数量
pub const FAULT_COUNT: usize = 24;

/// 故障类别（位索引与硬件上报顺序一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Fault {
    JointPositionLimitsViolation = 0,
    CartesianPositionLimitsViolation = 1,
    SelfCollisionAvoidanceViolation = 2,
    JointVelocityViolation = 3,
    CartesianVelocityViolation = 4,
    ForceControlSafetyViolation = 5,
    JointReflex = 6,
    CartesianReflex = 7,
    MaxGoalPoseDeviationViolation = 8,
    MaxPathPoseDeviationViolation = 9,
    CartesianVelocityProfileSafetyViolation = 10,
    JointPositionMotionGeneratorStartPoseInvalid = 11,
    JointMotionGeneratorPositionLimitsViolation = 12,
    JointMotionGeneratorVelocityLimitsViolation = 13,
    JointMotionGeneratorVelocityDiscontinuity = 14,
    JointMotionGeneratorAccelerationDiscontinuity = 15,
    CartesianPositionMotionGeneratorStartPoseInvalid = 16,
    CartesianMotionGeneratorElbowLimitViolation = 17,
    CartesianMotionGeneratorVelocityLimitsViolation = 18,
    CartesianMotionGeneratorVelocityDiscontinuity = 19,
    CartesianMotionGeneratorAccelerationDiscontinuity = 20,
    CartesianMotionGeneratorElbowSignInconsistent = 21,
    CartesianMotionGeneratorStartElbowInvalid = 22,
    ForceControllerDesiredForceToleranceViolation = 23,
}

impl Fault {
    /// 全部故障类别（按位索引排序）
    pub const ALL: [Fault; FAULT_COUNT] = [
        Fault::JointPositionLimitsViolation,
        Fault::CartesianPositionLimitsViolation,
        Fault::SelfCollisionAvoidanceViolation,
        Fault::JointVelocityViolation,
        Fault::CartesianVelocityViolation,
        Fault::ForceControlSafetyViolation,
        Fault::JointReflex,
        Fault::CartesianReflex,
        Fault::MaxGoalPoseDeviationViolation,
        Fault::MaxPathPoseDeviationViolation,
        Fault::CartesianVelocityProfileSafetyViolation,
        Fault::JointPositionMotionGeneratorStartPoseInvalid,
        Fault::JointMotionGeneratorPositionLimitsViolation,
        Fault::JointMotionGeneratorVelocityLimitsViolation,
        Fault::JointMotionGeneratorVelocityDiscontinuity,
        Fault::JointMotionGeneratorAccelerationDiscontinuity,
        Fault::CartesianPositionMotionGeneratorStartPoseInvalid,
        Fault::CartesianMotionGeneratorElbowLimitViolation,
        Fault::CartesianMotionGeneratorVelocityLimitsViolation,
        Fault::CartesianMotionGeneratorVelocityDiscontinuity,
        Fault::CartesianMotionGeneratorAccelerationDiscontinuity,
        Fault::CartesianMotionGeneratorElbowSignInconsistent,
        Fault::CartesianMotionGeneratorStartElbowInvalid,
        Fault::ForceControllerDesiredForceToleranceViolation,
    ];

    /// 字段名（与 [`ErrorsMsg`] 的字段名一致）
    pub fn name(self) -> &'static str {
        match self {
            Fault::JointPositionLimitsViolation => "joint_position_limits_violation",
            Fault::CartesianPositionLimitsViolation => "cartesian_position_limits_violation",
            Fault::SelfCollisionAvoidanceViolation => "self_collision_avoidance_violation",
            Fault::JointVelocityViolation => "joint_velocity_violation",
            Fault::CartesianVelocityViolation => "cartesian_velocity_violation",
            Fault::ForceControlSafetyViolation => "force_control_safety_violation",
            Fault::JointReflex => "joint_reflex",
            Fault::CartesianReflex => "cartesian_reflex",
            Fault::MaxGoalPoseDeviationViolation => "max_goal_pose_deviation_violation",
            Fault::MaxPathPoseDeviationViolation => "max_path_pose_deviation_violation",
            Fault::CartesianVelocityProfileSafetyViolation => {
                "cartesian_velocity_profile_safety_violation"
            },
            Fault::JointPositionMotionGeneratorStartPoseInvalid => {
                "joint_position_motion_generator_start_pose_invalid"
            },
            Fault::JointMotionGeneratorPositionLimitsViolation => {
                "joint_motion_generator_position_limits_violation"
            },
            Fault::JointMotionGeneratorVelocityLimitsViolation => {
                "joint_motion_generator_velocity_limits_violation"
            },
            Fault::JointMotionGeneratorVelocityDiscontinuity => {
                "joint_motion_generator_velocity_discontinuity"
            },
            Fault::JointMotionGeneratorAccelerationDiscontinuity => {
                "joint_motion_generator_acceleration_discontinuity"
            },
            Fault::CartesianPositionMotionGeneratorStartPoseInvalid => {
                "cartesian_position_motion_generator_start_pose_invalid"
            },
            Fault::CartesianMotionGeneratorElbowLimitViolation => {
                "cartesian_motion_generator_elbow_limit_violation"
            },
            Fault::CartesianMotionGeneratorVelocityLimitsViolation => {
                "cartesian_motion_generator_velocity_limits_violation"
            },
            Fault::CartesianMotionGeneratorVelocityDiscontinuity => {
                "cartesian_motion_generator_velocity_discontinuity"
            },
            Fault::CartesianMotionGeneratorAccelerationDiscontinuity => {
                "cartesian_motion_generator_acceleration_discontinuity"
            },
            Fault::CartesianMotionGeneratorElbowSignInconsistent => {
                "cartesian_motion_generator_elbow_sign_inconsistent"
            },
            Fault::CartesianMotionGeneratorStartElbowInvalid => {
                "cartesian_motion_generator_start_elbow_invalid"
            },
            Fault::ForceControllerDesiredForceToleranceViolation => {
                "force_controller_desired_force_tolerance_violation"
            },
        }
    }

    /// 位掩码
    #[inline]
    pub fn mask(self) -> u32 {
        1u32 << u8::from(self)
    }
}

/// 硬件上报的故障集合（不透明位集合）
///
/// # 设计特性
///
/// - **Copy**：随 [`RobotState`](crate::RobotState) 一起按值复制
/// - **无分配**：固定 32 位存储，高于 [`FAULT_COUNT`] 的位始终为 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotErrors {
    bits: u32,
}

impl RobotErrors {
    const VALID_MASK: u32 = (1u32 << FAULT_COUNT) - 1;

    /// 空集合（无故障）
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// 从原始位构造，忽略未定义的高位
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self {
            bits: bits & Self::VALID_MASK,
        }
    }

    /// 从硬件的布尔数组构造（长度必须等于 [`FAULT_COUNT`]）
    pub fn from_flags(flags: &[bool]) -> Result<Self, ProtocolError> {
        if flags.len() != FAULT_COUNT {
            return Err(ProtocolError::InvalidLength {
                field: "errors",
                expected: FAULT_COUNT,
                actual: flags.len(),
            });
        }

        let bits = flags
            .iter()
            .enumerate()
            .filter(|(_, set)| **set)
            .fold(0u32, |acc, (i, _)| acc | (1 << i));
        Ok(Self { bits })
    }

    /// 原始位
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    pub fn contains(&self, fault: Fault) -> bool {
        self.bits & fault.mask() != 0
    }

    pub fn insert(&mut self, fault: Fault) {
        self.bits |= fault.mask();
    }

    pub fn remove(&mut self, fault: Fault) {
        self.bits &= !fault.mask();
    }

    /// 链式构造
    #[must_use]
    pub fn with(mut self, fault: Fault) -> Self {
        self.insert(fault);
        self
    }

    /// 按位索引设置（索引越界返回错误）
    pub fn set_index(&mut self, index: u8, value: bool) -> Result<(), ProtocolError> {
        let fault = Fault::try_from(index).map_err(|_| ProtocolError::InvalidFault(index))?;
        if value {
            self.insert(fault);
        } else {
            self.remove(fault);
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// 已置位的故障
    pub fn iter(&self) -> impl Iterator<Item = Fault> + '_ {
        Fault::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Fault> for RobotErrors {
    fn from_iter<I: IntoIterator<Item = Fault>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), RobotErrors::with)
    }
}

/// 对外发布的故障记录：每个故障类别一个具名字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorsMsg {
    pub cartesian_motion_generator_acceleration_discontinuity: bool,
    pub cartesian_motion_generator_elbow_limit_violation: bool,
    pub cartesian_motion_generator_elbow_sign_inconsistent: bool,
    pub cartesian_motion_generator_start_elbow_invalid: bool,
    pub cartesian_motion_generator_velocity_discontinuity: bool,
    pub cartesian_motion_generator_velocity_limits_violation: bool,
    pub cartesian_position_limits_violation: bool,
    pub cartesian_position_motion_generator_start_pose_invalid: bool,
    pub cartesian_reflex: bool,
    pub cartesian_velocity_profile_safety_violation: bool,
    pub cartesian_velocity_violation: bool,
    pub force_controller_desired_force_tolerance_violation: bool,
    pub force_control_safety_violation: bool,
    pub joint_motion_generator_acceleration_discontinuity: bool,
    pub joint_motion_generator_position_limits_violation: bool,
    pub joint_motion_generator_velocity_discontinuity: bool,
    pub joint_motion_generator_velocity_limits_violation: bool,
    pub joint_position_limits_violation: bool,
    pub joint_position_motion_generator_start_pose_invalid: bool,
    pub joint_reflex: bool,
    pub joint_velocity_violation: bool,
    pub max_goal_pose_deviation_violation: bool,
    pub max_path_pose_deviation_violation: bool,
    pub self_collision_avoidance_violation: bool,
}

impl ErrorsMsg {
    /// 所有字段（字段名, 值），顺序与结构体声明一致
    pub fn fields(&self) -> [(&'static str, bool); FAULT_COUNT] {
        [
            (
                "cartesian_motion_generator_acceleration_discontinuity",
                self.cartesian_motion_generator_acceleration_discontinuity,
            ),
            (
                "cartesian_motion_generator_elbow_limit_violation",
                self.cartesian_motion_generator_elbow_limit_violation,
            ),
            (
                "cartesian_motion_generator_elbow_sign_inconsistent",
                self.cartesian_motion_generator_elbow_sign_inconsistent,
            ),
            (
                "cartesian_motion_generator_start_elbow_invalid",
                self.cartesian_motion_generator_start_elbow_invalid,
            ),
            (
                "cartesian_motion_generator_velocity_discontinuity",
                self.cartesian_motion_generator_velocity_discontinuity,
            ),
            (
                "cartesian_motion_generator_velocity_limits_violation",
                self.cartesian_motion_generator_velocity_limits_violation,
            ),
            (
                "cartesian_position_limits_violation",
                self.cartesian_position_limits_violation,
            ),
            (
                "cartesian_position_motion_generator_start_pose_invalid",
                self.cartesian_position_motion_generator_start_pose_invalid,
            ),
            ("cartesian_reflex", self.cartesian_reflex),
            (
                "cartesian_velocity_profile_safety_violation",
                self.cartesian_velocity_profile_safety_violation,
            ),
            (
                "cartesian_velocity_violation",
                self.cartesian_velocity_violation,
            ),
            (
                "force_controller_desired_force_tolerance_violation",
                self.force_controller_desired_force_tolerance_violation,
            ),
            (
                "force_control_safety_violation",
                self.force_control_safety_violation,
            ),
            (
                "joint_motion_generator_acceleration_discontinuity",
                self.joint_motion_generator_acceleration_discontinuity,
            ),
            (
                "joint_motion_generator_position_limits_violation",
                self.joint_motion_generator_position_limits_violation,
            ),
            (
                "joint_motion_generator_velocity_discontinuity",
                self.joint_motion_generator_velocity_discontinuity,
            ),
            (
                "joint_motion_generator_velocity_limits_violation",
                self.joint_motion_generator_velocity_limits_violation,
            ),
            (
                "joint_position_limits_violation",
                self.joint_position_limits_violation,
            ),
            (
                "joint_position_motion_generator_start_pose_invalid",
                self.joint_position_motion_generator_start_pose_invalid,
            ),
            ("joint_reflex", self.joint_reflex),
            ("joint_velocity_violation", self.joint_velocity_violation),
            (
                "max_goal_pose_deviation_violation",
                self.max_goal_pose_deviation_violation,
            ),
            (
                "max_path_pose_deviation_violation",
                self.max_path_pose_deviation_violation,
            ),
            (
                "self_collision_avoidance_violation",
                self.self_collision_avoidance_violation,
            ),
        ]
    }

    /// 已置位字段的名称
    pub fn active(&self) -> impl Iterator<Item = &'static str> {
        self.fields()
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
    }

    /// 是否存在任意故障
    pub fn any(&self) -> bool {
        self.fields().iter().any(|(_, set)| *set)
    }
}

/// 故障集合 → 具名布尔记录
///
/// 逐字段复制，不做任何推导。每个输出字段都只从 `errors` 读取。
pub fn errors_to_message(errors: &RobotErrors) -> ErrorsMsg {
    ErrorsMsg {
        cartesian_motion_generator_acceleration_discontinuity: errors
            .contains(Fault::CartesianMotionGeneratorAccelerationDiscontinuity),
        cartesian_motion_generator_elbow_limit_violation: errors
            .contains(Fault::CartesianMotionGeneratorElbowLimitViolation),
        cartesian_motion_generator_elbow_sign_inconsistent: errors
            .contains(Fault::CartesianMotionGeneratorElbowSignInconsistent),
        cartesian_motion_generator_start_elbow_invalid: errors
            .contains(Fault::CartesianMotionGeneratorStartElbowInvalid),
        cartesian_motion_generator_velocity_discontinuity: errors
            .contains(Fault::CartesianMotionGeneratorVelocityDiscontinuity),
        cartesian_motion_generator_velocity_limits_violation: errors
            .contains(Fault::CartesianMotionGeneratorVelocityLimitsViolation),
        cartesian_position_limits_violation: errors
            .contains(Fault::CartesianPositionLimitsViolation),
        cartesian_position_motion_generator_start_pose_invalid: errors
            .contains(Fault::CartesianPositionMotionGeneratorStartPoseInvalid),
        cartesian_reflex: errors.contains(Fault::CartesianReflex),
        cartesian_velocity_profile_safety_violation: errors
            .contains(Fault::CartesianVelocityProfileSafetyViolation),
        cartesian_velocity_violation: errors.contains(Fault::CartesianVelocityViolation),
        force_controller_desired_force_tolerance_violation: errors
            .contains(Fault::ForceControllerDesiredForceToleranceViolation),
        force_control_safety_violation: errors.contains(Fault::ForceControlSafetyViolation),
        joint_motion_generator_acceleration_discontinuity: errors
            .contains(Fault::JointMotionGeneratorAccelerationDiscontinuity),
        joint_motion_generator_position_limits_violation: errors
            .contains(Fault::JointMotionGeneratorPositionLimitsViolation),
        joint_motion_generator_velocity_discontinuity: errors
            .contains(Fault::JointMotionGeneratorVelocityDiscontinuity),
        joint_motion_generator_velocity_limits_violation: errors
            .contains(Fault::JointMotionGeneratorVelocityLimitsViolation),
        joint_position_limits_violation: errors.contains(Fault::JointPositionLimitsViolation),
        joint_position_motion_generator_start_pose_invalid: errors
            .contains(Fault::JointPositionMotionGeneratorStartPoseInvalid),
        joint_reflex: errors.contains(Fault::JointReflex),
        joint_velocity_violation: errors.contains(Fault::JointVelocityViolation),
        max_goal_pose_deviation_violation: errors.contains(Fault::MaxGoalPoseDeviationViolation),
        max_path_pose_deviation_violation: errors.contains(Fault::MaxPathPoseDeviationViolation),
        self_collision_avoidance_violation: errors
            .contains(Fault::SelfCollisionAvoidanceViolation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fault_index_roundtrip() {
        for (i, fault) in Fault::ALL.iter().enumerate() {
            assert_eq!(u8::from(*fault) as usize, i);
            assert_eq!(Fault::try_from(i as u8).unwrap(), *fault);
        }
        assert!(Fault::try_from(FAULT_COUNT as u8).is_err());
    }

    #[test]
    fn test_fault_names_unique_and_match_message_fields() {
        let names: HashSet<_> = Fault::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names.len(), FAULT_COUNT);

        let fields: HashSet<_> = ErrorsMsg::default()
            .fields()
            .iter()
            .map(|(name, _)| *name)
            .collect();
        assert_eq!(names, fields);
    }

    /// 每个输出字段当且仅当对应输入位置位时才偏离默认值
    #[test]
    fn test_every_output_fault_differs_from_default_iff_input_set() {
        for fault in Fault::ALL {
            let msg = errors_to_message(&RobotErrors::empty().with(fault));
            let active: Vec<_> = msg.active().collect();
            assert_eq!(active, vec![fault.name()], "mapping for {:?}", fault);
        }
    }

    #[test]
    fn test_joint_motion_generator_velocity_limits_violation_is_mapped() {
        let errors = RobotErrors::empty().with(Fault::JointMotionGeneratorVelocityLimitsViolation);
        let msg = errors_to_message(&errors);
        assert!(msg.joint_motion_generator_velocity_limits_violation);
    }

    #[test]
    fn test_empty_and_full_sets() {
        assert_eq!(
            errors_to_message(&RobotErrors::empty()),
            ErrorsMsg::default()
        );
        assert!(!ErrorsMsg::default().any());

        let all: RobotErrors = Fault::ALL.into_iter().collect();
        let msg = errors_to_message(&all);
        assert!(msg.fields().iter().all(|(_, set)| *set));
        assert_eq!(msg.active().count(), FAULT_COUNT);
    }

    #[test]
    fn test_mapping_is_order_independent() {
        let a: RobotErrors = [Fault::JointReflex, Fault::CartesianReflex]
            .into_iter()
            .collect();
        let b: RobotErrors = [Fault::CartesianReflex, Fault::JointReflex]
            .into_iter()
            .collect();
        assert_eq!(errors_to_message(&a), errors_to_message(&b));
    }

    #[test]
    fn test_from_flags() {
        let mut flags = [false; FAULT_COUNT];
        flags[6] = true; // joint_reflex
        let errors = RobotErrors::from_flags(&flags).unwrap();
        assert!(errors.contains(Fault::JointReflex));
        assert_eq!(errors.iter().count(), 1);

        let err = RobotErrors::from_flags(&[false; 37]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidLength {
                field: "errors",
                expected: FAULT_COUNT,
                actual: 37,
            }
        );
    }

    #[test]
    fn test_set_index_and_truncate() {
        let mut errors = RobotErrors::empty();
        errors.set_index(2, true).unwrap();
        assert!(errors.contains(Fault::SelfCollisionAvoidanceViolation));
        errors.set_index(2, false).unwrap();
        assert!(errors.is_empty());

        assert_eq!(
            errors.set_index(30, true),
            Err(ProtocolError::InvalidFault(30))
        );

        let truncated = RobotErrors::from_bits_truncate(u32::MAX);
        assert_eq!(truncated.iter().count(), FAULT_COUNT);
    }
}
