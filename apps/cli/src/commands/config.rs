//! 配置文件命令
//!
//! 检查控制器配置文件，或生成一份缺省配置

use anyhow::{Context, Result};
use armstate_sdk::ControllerConfig;
use armstate_sdk::driver::{
    FrameIds, TOPIC_EXTERNAL_WRENCH, TOPIC_JOINT_STATES, TOPIC_ROBOT_STATES, TOPIC_TF,
};
use clap::Subcommand;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 加载并校验配置文件，打印生效值
    Check {
        /// 配置文件路径（TOML）
        file: PathBuf,
    },

    /// 打印指定 arm_id 的缺省配置
    Default {
        /// 机械臂标识
        #[arg(default_value = "panda")]
        arm_id: String,
    },
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Check { file } => {
                let report = check_file(&file)?;
                print!("{}", report);
                Ok(())
            },
            ConfigCommand::Default { arm_id } => {
                let text = ControllerConfig::new(arm_id)
                    .to_toml_string()
                    .context("序列化配置失败")?;
                print!("{}", text);
                Ok(())
            },
        }
    }
}

/// 加载、校验并生成报告
fn check_file(file: &Path) -> Result<String> {
    let config = ControllerConfig::load_from_file(file)
        .with_context(|| format!("加载配置文件失败: {}", file.display()))?;
    config.validate().context("配置校验失败")?;
    describe(&config)
}

/// 生效配置的文字描述
pub fn describe(config: &ControllerConfig) -> Result<String> {
    let arm_id = config.validated_arm_id()?;
    let rate = config.publish_rate_hz()?;
    let frames = FrameIds::new(arm_id);

    let mut out = String::new();
    writeln!(out, "✅ 配置有效")?;
    writeln!(out, "  arm_id:        {}", arm_id)?;
    writeln!(
        out,
        "  publish_rate:  {} Hz{}",
        rate,
        if config.publish_rate.is_none() { " (default)" } else { "" }
    )?;
    writeln!(out, "  state handle:  {}_robot", arm_id)?;
    writeln!(out, "  joint_names:   {}", config.joint_names.join(", "))?;
    writeln!(
        out,
        "  frames:        {} -> {} -> {}",
        frames.flange, frames.end_effector, frames.stiffness
    )?;
    writeln!(
        out,
        "  topics:        {}, {}, {}, {}",
        TOPIC_ROBOT_STATES, TOPIC_JOINT_STATES, TOPIC_TF, TOPIC_EXTERNAL_WRENCH
    )?;
    Ok(out)
}
