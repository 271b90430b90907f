use super::{ConfigError, ConfigResult};
use crate::impl_default;
use serde::{Deserialize, Serialize};

/// 批量粒子更新配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 子弹系统默认是否并行执行逐粒子变换
    pub parallel_by_default: bool,

    /// 粒子数低于该值时即使请求并行也按顺序执行
    pub min_parallel_len: usize,

    /// 每个工作线程最少处理的粒子数
    pub chunk_size: usize,

    /// 工作线程数（0 表示自动检测）
    pub num_threads: usize,
}

impl_default!(BatchConfig {
    parallel_by_default: true,
    min_parallel_len: 256,
    chunk_size: 128,
    num_threads: 0,
});

impl BatchConfig {
    /// 获取实际使用的线程数
    pub fn get_num_threads(&self) -> usize {
        if self.num_threads == 0 {
            num_cpus::get()
        } else {
            self.num_threads
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.num_threads > 1024 {
            return Err(ConfigError::ValidationError(format!(
                "batch.num_threads is unreasonably large: {}",
                self.num_threads
            )));
        }
        Ok(())
    }
}
