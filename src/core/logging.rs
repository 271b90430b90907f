//! 日志初始化
//!
//! 库内部统一使用 `tracing` 宏并按子系统标注 target
//! （`storm` / `bullet` / `task` / `emission` / `config`）。
//! 宿主程序可以自行安装订阅者，也可以调用 [`init_logging`]。

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// 安装全局 fmt 订阅者
///
/// `RUST_LOG` 存在时优先使用，否则使用配置中的过滤指令。
/// 已经安装过订阅者时静默忽略，可重复调用。
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_targets)
        .try_init();
    tracing::debug!(target: "config", level = ?config.level, "Logging initialized");
}
