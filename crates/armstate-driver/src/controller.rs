//! 四通道状态发布控制器
//!
//! 宿主控制循环每周期调用一次 [`StateController::update`]。
//!
//! # 周期流程
//!
//! 1. [`RateTrigger`] 未触发 → 立即返回（无副作用）
//! 2. 从硬件句柄复制一份新的 [`RobotState`]
//! 3. 按固定顺序发布：完整状态 → 坐标系 → 外部力 → 关节状态
//!    （每个通道独立 try-lock，失败则跳过本周期）
//! 4. 序列号加一（每个触发周期一次，与通道是否成功无关）
//!
//! # 设计特性
//!
//! - **实时路径无阻塞**: `update` 只使用 try-lock 和原子操作，不分配内存
//! - **序列号共享**: 同一触发周期内四个通道携带相同的序列号
//! - **初始化即失败**: 配置或硬件问题在 [`StateController::init`] 中返回错误，不会带病运行

use crate::config::ControllerConfig;
use crate::error::DriverError;
use crate::hardware::{RobotHardware, StateHandle, StateInterface};
use crate::marshal;
use crate::metrics::ControllerMetrics;
use crate::publisher::{PublisherHandle, RealtimePublisher};
use crate::transport::{Message, Transport};
use crate::trigger::RateTrigger;
use armstate_protocol::{
    JointStateMsg, NUM_JOINTS, RobotState, RobotStateMsg, TfMessage, WrenchStamped,
};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{error, info};

pub use crate::marshal::FrameIds;

/// 完整状态话题
pub const TOPIC_ROBOT_STATES: &str = "franka_states";
/// 关节状态话题
pub const TOPIC_JOINT_STATES: &str = "joint_states";
/// 坐标系话题
pub const TOPIC_TF: &str = "/tf";
/// 外部力话题
pub const TOPIC_EXTERNAL_WRENCH: &str = "F_ext";

/// 四个通道的消费者侧句柄
#[derive(Clone)]
pub struct ChannelHandles {
    pub franka_states: PublisherHandle<RobotStateMsg>,
    pub transforms: PublisherHandle<TfMessage>,
    pub external_wrench: PublisherHandle<WrenchStamped>,
    pub joint_states: PublisherHandle<JointStateMsg>,
}

/// 状态发布控制器
pub struct StateController {
    arm_id: String,
    frames: FrameIds,
    joint_names: [String; NUM_JOINTS],
    trigger: RateTrigger,
    handle: Box<dyn StateHandle>,
    robot_state: RobotState,
    sequence_number: u32,

    franka_states: RealtimePublisher<RobotStateMsg>,
    transforms: RealtimePublisher<TfMessage>,
    external_wrench: RealtimePublisher<WrenchStamped>,
    joint_states: RealtimePublisher<JointStateMsg>,

    metrics: ControllerMetrics,
}

fn fail(err: DriverError) -> DriverError {
    error!("StateController: {}", err);
    err
}

/// 诊断用的句柄名称列表
fn available_handles(interface: &dyn StateInterface) -> String {
    let names = interface.handle_names();
    if names.is_empty() {
        "<not listed>".to_string()
    } else {
        names.join(", ")
    }
}

impl StateController {
    /// 初始化控制器，每个通道由独立线程投递到 `transport`
    ///
    /// # 错误
    /// - `DriverError::NoStateInterface`: 硬件不提供状态接口
    /// - `DriverError::MissingArmId`: arm_id 为空
    /// - `DriverError::InvalidPublishRate`: 发布频率 ≤ 0
    /// - `DriverError::InvalidJointNames`: 关节名称数量不为 7
    /// - `DriverError::StateHandle`: 获取 `<arm_id>_robot` 句柄失败
    /// - `DriverError::SpawnThread`: 投递线程创建失败
    pub fn init<H, T>(
        hardware: &H,
        transport: &T,
        config: &ControllerConfig,
    ) -> Result<Self, DriverError>
    where
        H: RobotHardware + ?Sized,
        T: Transport,
    {
        Self::init_inner(hardware, Some(transport), config)
    }

    /// 初始化控制器，通道不启动投递线程
    ///
    /// 由调用方通过 [`ChannelHandles`] 或各发布器的 `drain` 取走消息。
    pub fn init_manual<H>(hardware: &H, config: &ControllerConfig) -> Result<Self, DriverError>
    where
        H: RobotHardware + ?Sized,
    {
        Self::init_inner::<H, crate::transport::LogTransport>(hardware, None, config)
    }

    fn init_inner<H, T>(
        hardware: &H,
        transport: Option<&T>,
        config: &ControllerConfig,
    ) -> Result<Self, DriverError>
    where
        H: RobotHardware + ?Sized,
        T: Transport,
    {
        let interface = hardware
            .state_interface()
            .ok_or_else(|| fail(DriverError::NoStateInterface))?;

        let arm_id = config.validated_arm_id().map_err(fail)?.to_string();

        if config.publish_rate.is_none() {
            info!(
                "StateController: Did not find publish_rate. Using default {} [Hz].",
                crate::config::DEFAULT_PUBLISH_RATE_HZ
            );
        }
        let trigger = config
            .publish_rate_hz()
            .and_then(RateTrigger::new)
            .map_err(fail)?;

        let joint_names = config.validated_joint_names().map_err(fail)?;

        let handle_name = format!("{arm_id}_robot");
        let handle = interface.handle(&handle_name).map_err(|source| {
            error!(
                "StateController: available state handles: {}",
                available_handles(interface)
            );
            fail(DriverError::StateHandle {
                name: handle_name.clone(),
                source,
            })
        })?;

        let frames = FrameIds::new(&arm_id);
        let robot_state = handle.robot_state();

        let franka_states =
            make_publisher(transport, TOPIC_ROBOT_STATES, marshal::initial_robot_state())?;
        let transforms =
            make_publisher(transport, TOPIC_TF, marshal::initial_transforms(&frames))?;
        let external_wrench = make_publisher(
            transport,
            TOPIC_EXTERNAL_WRENCH,
            marshal::initial_external_wrench(&frames),
        )?;
        let joint_states = make_publisher(
            transport,
            TOPIC_JOINT_STATES,
            marshal::initial_joint_state(joint_names.clone()),
        )?;

        info!(
            "StateController initialized: arm_id={}, publish_rate={} Hz, delivery={}",
            arm_id,
            trigger.frequency_hz(),
            if transport.is_some() { "threaded" } else { "manual" }
        );

        Ok(Self {
            arm_id,
            frames,
            joint_names,
            trigger,
            handle,
            robot_state,
            sequence_number: 0,
            franka_states,
            transforms,
            external_wrench,
            joint_states,
            metrics: ControllerMetrics::new(),
        })
    }

    /// 每个控制周期调用一次
    ///
    /// `now` 为宿主提供的单调时间，同时用作本周期所有消息的时间戳。
    pub fn update(&mut self, now: Duration) {
        self.metrics.ticks_total.fetch_add(1, Ordering::Relaxed);

        if !self.trigger.should_fire(now) {
            return;
        }

        self.robot_state = self.handle.robot_state();
        let seq = self.sequence_number;

        self.publish_franka_states(seq, now);
        self.publish_transforms(seq, now);
        self.publish_external_wrench(seq, now);
        self.publish_joint_states(seq, now);

        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.metrics.ticks_fired.fetch_add(1, Ordering::Relaxed);
    }

    fn publish_franka_states(&self, seq: u32, now: Duration) {
        if let Some(mut msg) = self.franka_states.try_lock() {
            marshal::fill_robot_state(&mut msg, &self.robot_state, seq, now);
            msg.unlock_and_publish();
        }
    }

    fn publish_transforms(&self, seq: u32, now: Duration) {
        if let Some(mut msg) = self.transforms.try_lock() {
            marshal::fill_transforms(&mut msg, &self.robot_state, seq, now);
            msg.unlock_and_publish();
        }
    }

    fn publish_external_wrench(&self, seq: u32, now: Duration) {
        if let Some(mut msg) = self.external_wrench.try_lock() {
            marshal::fill_external_wrench(&mut msg, &self.robot_state, seq, now);
            msg.unlock_and_publish();
        }
    }

    fn publish_joint_states(&self, seq: u32, now: Duration) {
        if let Some(mut msg) = self.joint_states.try_lock() {
            marshal::fill_joint_state(&mut msg, &self.robot_state, seq, now);
            msg.unlock_and_publish();
        }
    }

    /// 下一个触发周期将使用的序列号（等于已触发的周期数，按 u32 回绕）
    pub fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    pub fn arm_id(&self) -> &str {
        &self.arm_id
    }

    pub fn frames(&self) -> &FrameIds {
        &self.frames
    }

    pub fn joint_names(&self) -> &[String; NUM_JOINTS] {
        &self.joint_names
    }

    /// 生效的发布频率（Hz）
    pub fn publish_rate_hz(&self) -> f64 {
        self.trigger.frequency_hz()
    }

    /// 最近一次触发时复制的状态快照
    pub fn robot_state(&self) -> &RobotState {
        &self.robot_state
    }

    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    pub fn franka_states(&self) -> &RealtimePublisher<RobotStateMsg> {
        &self.franka_states
    }

    pub fn transforms(&self) -> &RealtimePublisher<TfMessage> {
        &self.transforms
    }

    pub fn external_wrench(&self) -> &RealtimePublisher<WrenchStamped> {
        &self.external_wrench
    }

    pub fn joint_states(&self) -> &RealtimePublisher<JointStateMsg> {
        &self.joint_states
    }

    /// 四个通道的消费者侧句柄（可移交给其他线程）
    pub fn channels(&self) -> ChannelHandles {
        ChannelHandles {
            franka_states: self.franka_states.handle(),
            transforms: self.transforms.handle(),
            external_wrench: self.external_wrench.handle(),
            joint_states: self.joint_states.handle(),
        }
    }
}

fn make_publisher<T: Transport, M: Message>(
    transport: Option<&T>,
    topic: &str,
    initial: M,
) -> Result<RealtimePublisher<M>, DriverError> {
    match transport {
        Some(transport) => {
            RealtimePublisher::spawn(topic, initial, transport.advertise::<M>(topic)).map_err(fail)
        },
        None => Ok(RealtimePublisher::new(topic, initial)),
    }
}

/// StateController Builder（链式构造）
///
/// # 示例
///
/// ```rust
/// use armstate_driver::{
///     HardwareError, RobotHardware, StateControllerBuilder, StateHandle, StateInterface,
/// };
/// use armstate_protocol::RobotState;
///
/// struct Arm;
///
/// impl StateInterface for Arm {
///     fn handle(&self, name: &str) -> Result<Box<dyn StateHandle>, HardwareError> {
///         match name {
///             "panda_robot" => Ok(Box::new(RobotState::default)),
///             _ => Err(HardwareError::UnknownHandle { name: name.to_string() }),
///         }
///     }
/// }
///
/// impl RobotHardware for Arm {
///     fn state_interface(&self) -> Option<&dyn StateInterface> {
///         Some(self)
///     }
/// }
///
/// let mut controller = StateControllerBuilder::new("panda")
///     .publish_rate(100.0)
///     .build_manual(&Arm)
///     .unwrap();
///
/// controller.update(std::time::Duration::ZERO);
/// assert_eq!(controller.sequence_number(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StateControllerBuilder {
    config: ControllerConfig,
}

impl StateControllerBuilder {
    /// 使用缺省关节名称 `<arm_id>_joint1..7`
    pub fn new(arm_id: impl Into<String>) -> Self {
        Self {
            config: ControllerConfig::new(arm_id),
        }
    }

    /// 从已有配置开始
    pub fn from_config(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub fn joint_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.joint_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn publish_rate(mut self, hz: f64) -> Self {
        self.config.publish_rate = Some(hz);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn build<H, T>(self, hardware: &H, transport: &T) -> Result<StateController, DriverError>
    where
        H: RobotHardware + ?Sized,
        T: Transport,
    {
        StateController::init(hardware, transport, &self.config)
    }

    pub fn build_manual<H>(self, hardware: &H) -> Result<StateController, DriverError>
    where
        H: RobotHardware + ?Sized,
    {
        StateController::init_manual(hardware, &self.config)
    }
}
