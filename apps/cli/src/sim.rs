//! 模拟机械臂
//!
//! 关节按正弦轨迹运动，力矩和外部力叠加少量随机噪声。
//! 实现硬件抽象，控制器通过 `<arm_id>_robot` 句柄读取状态。

use armstate_protocol::{DeviceTime, IDENTITY_TRANSFORM, NUM_JOINTS, RobotState};
use armstate_sdk::{HardwareError, RobotHardware, StateHandle, StateInterface};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::Arc;
use std::time::Duration;

/// 轨迹幅值（rad）
const AMPLITUDE: f64 = 0.3;
/// 轨迹频率（Hz）
const MOTION_HZ: f64 = 0.2;
/// 法兰到末端执行器的 z 偏移（m）
const FLANGE_TO_EE_Z: f64 = 0.1034;

#[derive(Clone)]
struct SharedState(Arc<Mutex<RobotState>>);

impl StateHandle for SharedState {
    fn robot_state(&self) -> RobotState {
        *self.0.lock()
    }
}

/// 模拟机械臂
pub struct SimulatedArm {
    handle_name: String,
    state: SharedState,
    rng: StdRng,
}

impl SimulatedArm {
    pub fn new(arm_id: &str, seed: u64) -> Self {
        let mut state = RobotState::default();
        state.f_t_ee = IDENTITY_TRANSFORM;
        state.f_t_ee[14] = FLANGE_TO_EE_Z;
        state.m_load = 0.73;

        Self {
            handle_name: format!("{arm_id}_robot"),
            state: SharedState(Arc::new(Mutex::new(state))),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// 推进到时间 `now`
    pub fn step(&mut self, now: Duration) {
        let t = now.as_secs_f64();
        let omega = 2.0 * PI * MOTION_HZ;
        let mut state = self.state.0.lock();

        for i in 0..NUM_JOINTS {
            let phase = omega * t + i as f64;
            state.q[i] = AMPLITUDE * phase.sin();
            state.dq[i] = AMPLITUDE * omega * phase.cos();
            state.q_d[i] = state.q[i];
            state.tau_j[i] = 2.0 * state.q[i] + self.rng.gen_range(-0.05..0.05);
        }
        for f in state.k_f_ext_hat_k.iter_mut() {
            *f = self.rng.gen_range(-0.5..0.5);
        }

        // 末端执行器位置跟随第一个关节绕 z 轴
        state.o_t_ee = IDENTITY_TRANSFORM;
        state.o_t_ee[12] = 0.3 + 0.1 * state.q[0].cos();
        state.o_t_ee[13] = 0.1 * state.q[0].sin();
        state.o_t_ee[14] = 0.5;
        state.o_t_ee_d = state.o_t_ee;

        state.time = DeviceTime::from_millis(now.as_millis() as u64);
    }
}

impl StateInterface for SimulatedArm {
    fn handle(&self, name: &str) -> Result<Box<dyn StateHandle>, HardwareError> {
        if name == self.handle_name {
            Ok(Box::new(self.state.clone()))
        } else {
            Err(HardwareError::UnknownHandle {
                name: name.to_string(),
            })
        }
    }

    fn handle_names(&self) -> Vec<String> {
        vec![self.handle_name.clone()]
    }
}

impl RobotHardware for SimulatedArm {
    fn state_interface(&self) -> Option<&dyn StateInterface> {
        Some(self)
    }
}
