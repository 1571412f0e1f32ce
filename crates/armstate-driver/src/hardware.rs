//! 硬件状态抽象
//!
//! 控制器只依赖三个 trait：
//!
//! - [`RobotHardware`]: 硬件对象，可能不提供状态接口
//! - [`StateInterface`]: 按名称查找状态句柄（`<arm_id>_robot`）
//! - [`StateHandle`]: 读取当前周期的 [`RobotState`]
//!
//! 真实机器人驱动、仿真器以及测试中的 mock 都实现这几个 trait。

use crate::error::HardwareError;
use armstate_protocol::RobotState;

/// 机器人状态句柄
///
/// `robot_state` 在控制线程上每周期调用，实现必须是非阻塞的。
pub trait StateHandle: Send {
    /// 当前周期的完整状态（按值复制）
    fn robot_state(&self) -> RobotState;
}

/// 状态接口：按名称查找句柄
pub trait StateInterface {
    /// 获取指定名称的状态句柄
    ///
    /// # 错误
    /// - `HardwareError::UnknownHandle`: 名称不存在
    /// - `HardwareError::Unavailable`: 硬件暂不可用
    fn handle(&self, name: &str) -> Result<Box<dyn StateHandle>, HardwareError>;

    /// 可用句柄名称（用于诊断日志）
    fn handle_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// 硬件对象
pub trait RobotHardware {
    /// 状态接口；硬件不提供时返回 `None`
    fn state_interface(&self) -> Option<&dyn StateInterface>;
}

impl<T: RobotHardware + ?Sized> RobotHardware for &T {
    fn state_interface(&self) -> Option<&dyn StateInterface> {
        (**self).state_interface()
    }
}

impl<T: RobotHardware + ?Sized> RobotHardware for Box<T> {
    fn state_interface(&self) -> Option<&dyn StateInterface> {
        (**self).state_interface()
    }
}

impl<F> StateHandle for F
where
    F: Fn() -> RobotState + Send,
{
    fn robot_state(&self) -> RobotState {
        self()
    }
}
