//! run 命令
//!
//! 以固定频率运行模拟控制循环，通过进程内通道发布四个话题，结束后打印统计

use anyhow::{Context, Result, bail};
use armstate_protocol::{JointStateMsg, RobotStateMsg, TfMessage, WrenchStamped};
use armstate_sdk::driver::{
    LoopConfig, PublisherMetricsSnapshot, TOPIC_EXTERNAL_WRENCH, TOPIC_JOINT_STATES,
    TOPIC_ROBOT_STATES, TOPIC_TF, run_periodic,
};
use armstate_sdk::{ChannelTransport, ControllerConfig, StateController};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::sim::SimulatedArm;

/// 每个话题的接收通道容量
const TOPIC_CAPACITY: usize = 4096;

/// 模拟运行参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 控制器配置文件（TOML）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 机械臂标识（覆盖配置文件）
    #[arg(long)]
    pub arm_id: Option<String>,

    /// 发布频率 Hz（覆盖配置文件）
    #[arg(long)]
    pub publish_rate: Option<f64>,

    /// 控制循环频率 Hz
    #[arg(long, default_value_t = 1000.0)]
    pub loop_hz: f64,

    /// 运行时长（秒）
    #[arg(short, long, default_value_t = 3.0)]
    pub duration: f64,

    /// 以 JSON 输出每个话题的最后一条消息
    #[arg(long)]
    pub json: bool,

    /// 模拟噪声的随机种子
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// 控制循环线程使用实时优先级（需要 `realtime` feature）
    #[arg(long)]
    pub realtime: bool,
}

/// 单个话题的运行结果
struct TopicReport {
    topic: &'static str,
    received: usize,
    metrics: PublisherMetricsSnapshot,
    last: Option<serde_json::Value>,
}

impl RunCommand {
    pub fn execute(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            bail!("--duration must be > 0, got {}", self.duration);
        }

        let config = self.resolve_config()?;
        config.validate().context("配置校验失败")?;
        let arm_id = config.validated_arm_id()?.to_string();

        let mut arm = SimulatedArm::new(&arm_id, self.seed);
        let transport = ChannelTransport::new(TOPIC_CAPACITY);
        let franka_rx = transport
            .subscribe::<RobotStateMsg>(TOPIC_ROBOT_STATES)
            .context("订阅完整状态话题失败")?;
        let joints_rx = transport
            .subscribe::<JointStateMsg>(TOPIC_JOINT_STATES)
            .context("订阅关节状态话题失败")?;
        let tf_rx = transport
            .subscribe::<TfMessage>(TOPIC_TF)
            .context("订阅坐标系话题失败")?;
        let wrench_rx = transport
            .subscribe::<WrenchStamped>(TOPIC_EXTERNAL_WRENCH)
            .context("订阅外部力话题失败")?;

        let mut controller =
            StateController::init(&arm, &transport, &config).context("控制器初始化失败")?;

        let is_running = Arc::new(AtomicBool::new(true));
        let r = is_running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
            eprintln!("\n收到退出信号，正在停止...");
        })
        .context("注册 Ctrl-C 处理器失败")?;

        let loop_config = LoopConfig {
            frequency_hz: self.loop_hz,
            max_iterations: Some((self.duration * self.loop_hz).ceil() as u64),
            realtime_priority: self.realtime,
        };

        info!(
            "Running {} Hz control loop for {:.1} s (publish rate {} Hz)",
            self.loop_hz,
            self.duration,
            controller.publish_rate_hz()
        );

        let stats = run_periodic(&loop_config, &is_running, |now| {
            arm.step(now);
            controller.update(now);
        })?;

        if stats.overruns > 0 {
            warn!(
                "{} of {} control cycles missed their deadline (max tick {:?})",
                stats.overruns, stats.iterations, stats.max_tick
            );
        }

        let ticks = controller.metrics().snapshot();
        let metrics = [
            controller.franka_states().metrics().snapshot(),
            controller.joint_states().metrics().snapshot(),
            controller.transforms().metrics().snapshot(),
            controller.external_wrench().metrics().snapshot(),
        ];
        let sequence = controller.sequence_number();

        // 停止投递线程，确保已发布的消息都进入接收通道
        drop(controller);

        let reports = [
            collect(TOPIC_ROBOT_STATES, franka_rx.try_iter(), metrics[0])?,
            collect(TOPIC_JOINT_STATES, joints_rx.try_iter(), metrics[1])?,
            collect(TOPIC_TF, tf_rx.try_iter(), metrics[2])?,
            collect(TOPIC_EXTERNAL_WRENCH, wrench_rx.try_iter(), metrics[3])?,
        ];

        if self.json {
            let last: serde_json::Map<String, serde_json::Value> = reports
                .iter()
                .map(|r| {
                    (
                        r.topic.to_string(),
                        r.last.clone().unwrap_or(serde_json::Value::Null),
                    )
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&last)?);
            return Ok(());
        }

        println!("📊 运行结果:");
        println!(
            "  控制周期: {} (耗时 {:.2} 秒, 超时 {})",
            stats.iterations,
            stats.elapsed.as_secs_f64(),
            stats.overruns
        );
        println!(
            "  触发周期: {} / {} (下一个序列号 {})",
            ticks.ticks_fired, ticks.ticks_total, sequence
        );
        println!();
        println!(
            "  {:<16} {:>9} {:>9} {:>9} {:>9}",
            "topic", "received", "published", "skipped", "skip %"
        );
        for r in &reports {
            println!(
                "  {:<16} {:>9} {:>9} {:>9} {:>8.2}%",
                r.topic,
                r.received,
                r.metrics.published,
                r.metrics.skipped,
                r.metrics.skip_rate()
            );
        }

        Ok(())
    }

    /// 配置文件 + 命令行覆盖
    fn resolve_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => ControllerConfig::load_from_file(path)
                .with_context(|| format!("加载配置文件失败: {}", path.display()))?,
            None => ControllerConfig::new(self.arm_id.as_deref().unwrap_or("panda")),
        };

        if let Some(arm_id) = &self.arm_id {
            if self.config.is_some() && config.arm_id != *arm_id {
                info!("Overriding arm_id '{}' with '{}'", config.arm_id, arm_id);
            }
            config.arm_id = arm_id.clone();
        }
        if let Some(rate) = self.publish_rate {
            config.publish_rate = Some(rate);
        }

        Ok(config)
    }
}

fn collect<M: serde::Serialize>(
    topic: &'static str,
    messages: impl Iterator<Item = M>,
    metrics: PublisherMetricsSnapshot,
) -> Result<TopicReport> {
    let mut received = 0;
    let mut last = None;
    for msg in messages {
        received += 1;
        last = Some(msg);
    }

    let last = last.map(|m| serde_json::to_value(&m)).transpose()?;
    Ok(TopicReport {
        topic,
        received,
        metrics,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> RunCommand {
        RunCommand {
            config: None,
            arm_id: None,
            publish_rate: None,
            loop_hz: 1000.0,
            duration: 0.2,
            json: false,
            seed: 0,
            realtime: false,
        }
    }

    #[test]
    fn test_resolve_config_defaults() {
        let config = command().resolve_config().unwrap();
        assert_eq!(config.arm_id, "panda");
        assert_eq!(config.joint_names.len(), 7);
        assert_eq!(config.publish_rate, None);
    }

    #[test]
    fn test_resolve_config_overrides() {
        let cmd = RunCommand {
            arm_id: Some("fr3".to_string()),
            publish_rate: Some(50.0),
            ..command()
        };
        let config = cmd.resolve_config().unwrap();
        assert_eq!(config.arm_id, "fr3");
        assert_eq!(config.joint_names[0], "fr3_joint1");
        assert_eq!(config.publish_rate_hz().unwrap(), 50.0);
    }

    #[test]
    fn test_invalid_duration() {
        let cmd = RunCommand {
            duration: 0.0,
            ..command()
        };
        assert!(cmd.execute().is_err());
    }

    #[test]
    fn test_collect_keeps_last() {
        let report = collect("t", vec![1u32, 2, 3].into_iter(), Default::default()).unwrap();
        assert_eq!(report.received, 3);
        assert_eq!(report.last, Some(serde_json::json!(3)));
    }
}
