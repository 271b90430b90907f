//! 统一配置系统
//!
//! 提供TOML/JSON配置文件、环境变量覆盖和校验

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub mod batch;
pub mod bullets;

pub use batch::BatchConfig;
pub use bullets::BulletDefaults;

use crate::impl_default;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 弹幕运行时主配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StormConfig {
    /// 批量更新配置
    #[serde(default)]
    pub batch: BatchConfig,

    /// 子弹默认值
    #[serde(default)]
    pub bullets: BulletDefaults,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StormConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("BULLET_STORM_PARALLEL") {
            self.batch.parallel_by_default =
                val.parse().unwrap_or(self.batch.parallel_by_default);
        }
        if let Ok(val) = env::var("BULLET_STORM_THREADS") {
            if let Ok(threads) = val.parse() {
                self.batch.num_threads = threads;
            }
        }
        if let Ok(val) = env::var("BULLET_STORM_LOG") {
            self.logging.filter = Some(val);
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.batch.validate()?;
        self.bullets.validate()?;
        Ok(())
    }

    /// 按顺序尝试 `bullet_storm.toml`、`bullet_storm.json`，都不存在时使用默认配置
    pub fn load_or_default() -> Self {
        let loaded = Self::from_toml_file("bullet_storm.toml")
            .or_else(|_| Self::from_json_file("bullet_storm.json"));
        let mut config = match loaded {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(target: "config", error = %e, "Using default configuration");
                Self::default()
            }
        };
        config.apply_env_overrides();
        if let Err(e) = config.validate() {
            tracing::warn!(target: "config", error = %e, "Invalid configuration, falling back to defaults");
            config = Self::default();
        }
        config
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 完整的 EnvFilter 指令，设置后覆盖 `level`
    pub filter: Option<String>,

    /// 是否输出 target
    pub show_targets: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    filter: None,
    show_targets: true,
});

impl LoggingConfig {
    /// 生成 EnvFilter 指令
    pub fn filter_directive(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => self.level.as_str().to_string(),
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
