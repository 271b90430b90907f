//! 核心基础设施
//!
//! - [`task`]: 由外部脉冲推进的协作式任务（调度原语）
//! - [`error`]: 构造期校验错误
//! - [`logging`]: tracing 订阅者初始化
//! - [`macros`]: 配置默认值宏

pub mod error;
pub mod logging;
pub mod macros;
pub mod task;

pub use error::{ShapeError, ShapeResult, StormError, StormResult};
pub use logging::init_logging;
pub use task::{CooperativeTask, Step, TaskBody, TaskOutcome, TaskStatus, WaitCondition};
