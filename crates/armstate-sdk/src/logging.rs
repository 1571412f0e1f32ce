//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 输出，并把 `log` crate 的记录桥接到 `tracing`。
//! 过滤规则优先读取 `RUST_LOG`，未设置时使用调用方给出的缺省规则。
//!
//! ```rust,no_run
//! armstate_sdk::logging::init_logging().unwrap();
//! tracing::info!("ready");
//! ```

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// 缺省过滤规则
pub const DEFAULT_FILTER: &str = "info";

/// 日志初始化错误
#[derive(Error, Debug)]
pub enum LoggingError {
    /// 过滤规则无法解析
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// 全局 subscriber 或 log 桥接已安装
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

/// 使用缺省规则初始化日志
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_filter(DEFAULT_FILTER)
}

/// 使用指定的缺省规则初始化日志（`RUST_LOG` 优先）
///
/// # 参数
///
/// - `default_directives`: 例如 `"armstate_driver=debug,info"`
pub fn init_logging_with_filter(default_directives: &str) -> Result<(), LoggingError> {
    let filter = build_filter(std::env::var("RUST_LOG").ok().as_deref(), default_directives)?;

    tracing_log::LogTracer::builder()
        .with_max_level(log::LevelFilter::Trace)
        .init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

fn build_filter(env: Option<&str>, default_directives: &str) -> Result<EnvFilter, LoggingError> {
    let directives = match env {
        Some(env) if !env.trim().is_empty() => env,
        _ => default_directives,
    };

    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter {
        filter: directives.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_default() {
        let filter = build_filter(Some("armstate_driver=trace"), "info").unwrap();
        assert!(filter.to_string().contains("armstate_driver=trace"));

        let filter = build_filter(Some("  "), "warn").unwrap();
        assert!(filter.to_string().contains("warn"));

        let filter = build_filter(None, "armstate_cli=info").unwrap();
        assert!(filter.to_string().contains("armstate_cli=info"));
    }

    #[test]
    fn test_invalid_filter() {
        let err = build_filter(None, "armstate=notalevel").unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
        assert!(err.to_string().contains("armstate=notalevel"));
    }

    #[test]
    fn test_second_init_fails() {
        // 同一进程内只能初始化一次
        let first = init_logging_with_filter("warn");
        let second = init_logging();
        assert!(first.is_ok() || matches!(first, Err(LoggingError::AlreadyInitialized(_))));
        assert!(matches!(second, Err(LoggingError::AlreadyInitialized(_))));
    }
}
