//! 驱动层错误类型定义
//!
//! 只有初始化阶段会返回错误；实时路径（`update`）没有返回值，
//! 通道争用属于预期行为，不是错误。

use thiserror::Error;

/// 硬件层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HardwareError {
    /// 硬件接口中不存在该名称的句柄
    #[error("Unknown state handle: {name}")]
    UnknownHandle { name: String },

    /// 硬件暂不可用
    #[error("Hardware unavailable: {0}")]
    Unavailable(String),
}

/// 驱动层错误类型（均为配置/初始化错误）
#[derive(Error, Debug)]
pub enum DriverError {
    /// 硬件未提供状态接口
    #[error("Could not get state interface from hardware")]
    NoStateInterface,

    /// 缺少 arm_id 参数
    #[error("Could not get parameter arm_id")]
    MissingArmId,

    /// joint_names 缺失或长度不为 7
    #[error("Invalid or no joint_names provided: expected {expected} names, got {actual}")]
    InvalidJointNames { expected: usize, actual: usize },

    /// 发布频率必须为正数
    #[error("Invalid publish_rate: {0} Hz (must be > 0)")]
    InvalidPublishRate(f64),

    /// 控制循环频率必须为正数
    #[error("Invalid loop frequency: {0} Hz (must be > 0)")]
    InvalidLoopFrequency(f64),

    /// 获取硬件状态句柄失败
    #[error("Exception getting state handle '{name}': {source}")]
    StateHandle {
        name: String,
        #[source]
        source: HardwareError,
    },

    /// 投递线程创建失败
    #[error("Failed to spawn delivery thread for topic '{topic}': {source}")]
    SpawnThread {
        topic: String,
        #[source]
        source: std::io::Error,
    },

    /// 配置文件读取失败
    #[error("Config file error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// 配置文件解析失败
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
