//! # Armstate CLI
//!
//! 在没有机器人的情况下演示与检查状态发布链路。
//!
//! ```bash
//! # 1kHz 模拟控制循环，30Hz 发布，运行 5 秒
//! armstate-cli run --arm-id panda --duration 5
//!
//! # 使用配置文件，并以 JSON 输出每个话题的最后一条消息
//! armstate-cli run --config panda.toml --json
//!
//! # 检查配置文件
//! armstate-cli config check panda.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod sim;

use commands::{ConfigCommand, RunCommand};

/// Armstate CLI - 机械臂状态发布工具
#[derive(Parser, Debug)]
#[command(name = "armstate-cli")]
#[command(about = "Simulate and check rate-gated robot arm state publication", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置文件管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 运行模拟控制循环并发布状态
    Run {
        #[command(flatten)]
        args: RunCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    armstate_sdk::init_logging_with_filter("armstate_cli=info,armstate_driver=info,warn")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(),
        Commands::Run { args } => args.execute(),
    }
}
