//! 统一错误处理模块
//!
//! 运行时的可恢复问题（引用缺失、容量耗尽、非法状态转换）只记录日志并就地降级，
//! 不会以错误形式跨组件传播。这里的错误类型只用于构造期校验：
//!
//! - **形状错误** (`ShapeError`): 发射形状参数非法
//! - **风暴错误** (`StormError`): 非法的行为调度，或对已结束的风暴进行结构性修改
//!
//! 配置加载错误见 [`crate::config::ConfigError`]。

use thiserror::Error;

/// 发射形状校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("Shape parameter `{name}` must be finite, got {value}")]
    NonFinite { name: &'static str, value: f32 },

    #[error("Shape parameter `{name}` must not be negative, got {value}")]
    Negative { name: &'static str, value: f32 },

    #[error("Shape angle must be within 0..={max} degrees, got {angle}")]
    AngleOutOfRange { angle: f32, max: f32 },

    #[error("Custom shape needs at least one emit param")]
    EmptyCustom,
}

/// 风暴结构错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StormError {
    #[error("Storm already {0}, behaviors can no longer be added")]
    Closed(&'static str),

    #[error("Storm {0} is not managed by this runner")]
    UnknownStorm(u64),

    #[error("Invalid behavior schedule: {0}")]
    InvalidSchedule(String),
}

pub type ShapeResult<T> = Result<T, ShapeError>;
pub type StormResult<T> = Result<T, StormError>;
