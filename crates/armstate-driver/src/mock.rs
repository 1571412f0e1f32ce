//! Mock 硬件（用于无机器人测试）
//!
//! 提供一个可在测试线程中随时改写的状态源，以及对硬件接口缺失、句柄查找失败等
//! 初始化错误的模拟。

use crate::error::HardwareError;
use crate::hardware::{RobotHardware, StateHandle, StateInterface};
use armstate_protocol::RobotState;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Mock 状态源
///
/// 克隆后共享同一份状态；[`reads`](Self::reads) 统计控制器读取快照的次数。
#[derive(Debug, Clone, Default)]
pub struct MockStateHandle {
    state: Arc<Mutex<RobotState>>,
    reads: Arc<AtomicU64>,
}

impl MockStateHandle {
    pub fn new(state: RobotState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 替换整个状态
    pub fn set_state(&self, state: RobotState) {
        *self.state.lock() = state;
    }

    /// 原地修改状态
    pub fn modify<F: FnOnce(&mut RobotState)>(&self, f: F) {
        f(&mut self.state.lock());
    }

    /// 已被读取的次数
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl StateHandle for MockStateHandle {
    fn robot_state(&self) -> RobotState {
        self.reads.fetch_add(1, Ordering::Relaxed);
        *self.state.lock()
    }
}

/// Mock 状态接口
#[derive(Debug, Default)]
pub struct MockStateInterface {
    handles: BTreeMap<String, MockStateHandle>,
    failure: Option<HardwareError>,
}

impl StateInterface for MockStateInterface {
    fn handle(&self, name: &str) -> Result<Box<dyn StateHandle>, HardwareError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.handles
            .get(name)
            .map(|h| Box::new(h.clone()) as Box<dyn StateHandle>)
            .ok_or_else(|| HardwareError::UnknownHandle {
                name: name.to_string(),
            })
    }

    fn handle_names(&self) -> Vec<String> {
        self.handles.keys().cloned().collect()
    }
}

/// Mock 硬件
///
/// # 示例
///
/// ```rust
/// use armstate_driver::mock::MockHardware;
/// use armstate_driver::{RobotHardware, StateInterface};
///
/// let hw = MockHardware::new("panda");
/// hw.state().modify(|s| s.q[0] = 1.0);
///
/// let iface = hw.state_interface().unwrap();
/// let handle = iface.handle("panda_robot").unwrap();
/// assert_eq!(handle.robot_state().q[0], 1.0);
/// ```
#[derive(Debug)]
pub struct MockHardware {
    interface: Option<MockStateInterface>,
    state: MockStateHandle,
}

impl MockHardware {
    /// 创建带 `<arm_id>_robot` 句柄的硬件
    pub fn new(arm_id: &str) -> Self {
        let state = MockStateHandle::default();
        let mut handles = BTreeMap::new();
        handles.insert(format!("{arm_id}_robot"), state.clone());
        Self {
            interface: Some(MockStateInterface {
                handles,
                failure: None,
            }),
            state,
        }
    }

    /// 不提供状态接口的硬件
    pub fn without_state_interface() -> Self {
        Self {
            interface: None,
            state: MockStateHandle::default(),
        }
    }

    /// 句柄查找始终失败
    pub fn with_handle_error(mut self, err: HardwareError) -> Self {
        if let Some(iface) = &mut self.interface {
            iface.failure = Some(err);
        }
        self
    }

    /// 默认句柄对应的状态源
    pub fn state(&self) -> MockStateHandle {
        self.state.clone()
    }
}

impl RobotHardware for MockHardware {
    fn state_interface(&self) -> Option<&dyn StateInterface> {
        self.interface.as_ref().map(|i| i as &dyn StateInterface)
    }
}
