//! # 控制器配置
//!
//! 支持从 TOML 加载：
//!
//! ```toml
//! arm_id = "panda"
//! joint_names = [
//!     "panda_joint1", "panda_joint2", "panda_joint3", "panda_joint4",
//!     "panda_joint5", "panda_joint6", "panda_joint7",
//! ]
//! publish_rate = 30.0   # 可选，缺省为 30Hz
//! ```

use crate::error::DriverError;
use armstate_protocol::NUM_JOINTS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 缺省发布频率（Hz）
pub const DEFAULT_PUBLISH_RATE_HZ: f64 = 30.0;

/// 生成 `<arm_id>_joint1` .. `<arm_id>_joint7`
pub fn default_joint_names(arm_id: &str) -> Vec<String> {
    (1..=NUM_JOINTS).map(|i| format!("{arm_id}_joint{i}")).collect()
}

/// 状态发布控制器配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// 机械臂标识，用于派生坐标系名称和硬件句柄名称
    #[serde(default)]
    pub arm_id: String,

    /// 7 个关节名称（顺序即输出顺序）
    #[serde(default)]
    pub joint_names: Vec<String>,

    /// 发布频率（Hz），缺省为 [`DEFAULT_PUBLISH_RATE_HZ`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_rate: Option<f64>,
}

impl ControllerConfig {
    /// 使用缺省关节名称创建配置
    pub fn new(arm_id: impl Into<String>) -> Self {
        let arm_id = arm_id.into();
        Self {
            joint_names: default_joint_names(&arm_id),
            arm_id,
            publish_rate: None,
        }
    }

    /// 从 TOML 字符串解析（不做校验）
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        Ok(toml::from_str(content)?)
    }

    /// 从 TOML 文件加载（不做校验）
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 校验全部字段
    ///
    /// # 错误
    /// - `DriverError::MissingArmId`: arm_id 为空
    /// - `DriverError::InvalidPublishRate`: 频率 ≤ 0 或非有限值
    /// - `DriverError::InvalidJointNames`: 关节名称数量不为 7
    pub fn validate(&self) -> Result<(), DriverError> {
        self.validated_arm_id()?;
        self.publish_rate_hz()?;
        self.validated_joint_names()?;
        Ok(())
    }

    /// 去除首尾空白后的 arm_id
    pub fn validated_arm_id(&self) -> Result<&str, DriverError> {
        let arm_id = self.arm_id.trim();
        if arm_id.is_empty() {
            return Err(DriverError::MissingArmId);
        }
        Ok(arm_id)
    }

    /// 生效的发布频率（未配置时为缺省值）
    pub fn publish_rate_hz(&self) -> Result<f64, DriverError> {
        match self.publish_rate {
            None => Ok(DEFAULT_PUBLISH_RATE_HZ),
            Some(hz) if hz.is_finite() && hz > 0.0 => Ok(hz),
            Some(hz) => Err(DriverError::InvalidPublishRate(hz)),
        }
    }

    /// 关节名称（定长数组）
    pub fn validated_joint_names(&self) -> Result<[String; NUM_JOINTS], DriverError> {
        <[String; NUM_JOINTS]>::try_from(self.joint_names.clone()).map_err(|names| {
            DriverError::InvalidJointNames {
                expected: NUM_JOINTS,
                actual: names.len(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PANDA_TOML: &str = r#"
arm_id = "panda"
joint_names = [
    "panda_joint1", "panda_joint2", "panda_joint3", "panda_joint4",
    "panda_joint5", "panda_joint6", "panda_joint7",
]
publish_rate = 100.0
"#;

    #[test]
    fn test_default_joint_names() {
        let names = default_joint_names("fr3");
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "fr3_joint1");
        assert_eq!(names[6], "fr3_joint7");
    }

    #[test]
    fn test_parse_toml() {
        let config = ControllerConfig::from_toml_str(PANDA_TOML).unwrap();
        assert_eq!(config.arm_id, "panda");
        assert_eq!(config.joint_names, default_joint_names("panda"));
        assert_eq!(config.publish_rate, Some(100.0));
        assert!(config.validate().is_ok());
        assert_eq!(config.publish_rate_hz().unwrap(), 100.0);
    }

    #[test]
    fn test_publish_rate_fallback() {
        let config = ControllerConfig::new("panda");
        assert_eq!(config.publish_rate_hz().unwrap(), DEFAULT_PUBLISH_RATE_HZ);
    }

    #[test]
    fn test_invalid_publish_rate() {
        let mut config = ControllerConfig::new("panda");
        for bad in [0.0, -5.0, f64::NAN] {
            config.publish_rate = Some(bad);
            assert!(matches!(
                config.validate(),
                Err(DriverError::InvalidPublishRate(_))
            ));
        }
    }

    #[test]
    fn test_missing_arm_id() {
        let config = ControllerConfig::from_toml_str("publish_rate = 30.0").unwrap();
        assert!(matches!(config.validate(), Err(DriverError::MissingArmId)));

        let config = ControllerConfig {
            arm_id: "   ".to_string(),
            ..ControllerConfig::new("x")
        };
        assert!(matches!(config.validate(), Err(DriverError::MissingArmId)));
    }

    #[test]
    fn test_joint_names_length() {
        let mut config = ControllerConfig::new("panda");
        config.joint_names.pop();
        assert!(matches!(
            config.validate(),
            Err(DriverError::InvalidJointNames {
                expected: 7,
                actual: 6
            })
        ));

        config.joint_names = Vec::new();
        assert!(matches!(
            config.validated_joint_names(),
            Err(DriverError::InvalidJointNames { actual: 0, .. })
        ));

        config.joint_names = default_joint_names("panda");
        config.joint_names.push("extra".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_error() {
        let err = ControllerConfig::from_toml_str("arm_id = [").unwrap_err();
        assert!(matches!(err, DriverError::ConfigParse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PANDA_TOML.as_bytes()).unwrap();

        let config = ControllerConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.validated_arm_id().unwrap(), "panda");

        let missing = ControllerConfig::load_from_file("/nonexistent/armstate.toml");
        assert!(matches!(missing, Err(DriverError::ConfigIo(_))));
    }

    #[test]
    fn test_toml_round_trip_omits_missing_rate() {
        let config = ControllerConfig::new("panda");
        let text = config.to_toml_string().unwrap();
        assert!(!text.contains("publish_rate"));
        assert_eq!(ControllerConfig::from_toml_str(&text).unwrap(), config);
    }
}
