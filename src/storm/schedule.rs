//! 行为调度
//!
//! 描述一个发射行为何时开始、重复几次、周期间隔多长以及由哪个时钟推进。
//! 固定间隔的调度可以通过 [`ScheduleConfig`] 写进配置文件；
//! 采样间隔由外部的 [`DurationSampler`]（例如曲线求值）提供。

use crate::core::error::{StormError, StormResult};
use crate::core::task::WaitCondition;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 重复次数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    /// 发射指定周期数后结束
    Times(u32),
    /// 一直发射直到被取消
    Infinite,
}

/// 推进行为的时钟
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clock {
    /// 每帧脉冲
    #[default]
    Frame,
    /// 固定步长脉冲
    Fixed,
}

/// 间隔采样器
///
/// 参数为行为启动以来经过的秒数，返回下一次间隔（秒）。
pub trait DurationSampler {
    fn sample(&mut self, elapsed: f32) -> f32;
}

impl<F: FnMut(f32) -> f32> DurationSampler for F {
    fn sample(&mut self, elapsed: f32) -> f32 {
        self(elapsed)
    }
}

/// 周期间隔
pub enum Interval {
    /// 固定秒数
    Fixed(f32),
    /// 每个周期重新采样
    Sampled(Box<dyn DurationSampler>),
    /// 按所属时钟的脉冲次数计数，至少为 1
    Ticks(u32),
}

impl Interval {
    pub fn sampled(sampler: impl DurationSampler + 'static) -> Self {
        Self::Sampled(Box::new(sampler))
    }

    /// 下一次间隔对应的挂起条件；采样结果非法时钳制为 0 秒
    pub(crate) fn next(&mut self, elapsed: f32) -> WaitCondition {
        match self {
            Self::Fixed(secs) => WaitCondition::Seconds(*secs),
            Self::Sampled(sampler) => {
                let secs = sampler.sample(elapsed);
                if secs.is_finite() && secs >= 0.0 {
                    WaitCondition::Seconds(secs)
                } else {
                    tracing::warn!(target: "storm", value = secs, "Sampled interval out of range, using 0");
                    WaitCondition::Seconds(0.0)
                }
            }
            Self::Ticks(ticks) => WaitCondition::Ticks(*ticks),
        }
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(secs) => f.debug_tuple("Fixed").field(secs).finish(),
            Self::Sampled(_) => f.write_str("Sampled"),
            Self::Ticks(ticks) => f.debug_tuple("Ticks").field(ticks).finish(),
        }
    }
}

/// 发射行为的调度
#[derive(Debug)]
pub struct Schedule {
    /// 首次发射前的等待（秒）
    pub start_delay: f32,
    pub repeat: Repeat,
    pub interval: Interval,
    pub clock: Clock,
}

impl Schedule {
    /// 立即开始、固定间隔、按帧推进
    pub fn new(repeat: Repeat, interval: f32) -> Self {
        Self {
            start_delay: 0.0,
            repeat,
            interval: Interval::Fixed(interval),
            clock: Clock::Frame,
        }
    }

    pub fn with_start_delay(mut self, start_delay: f32) -> Self {
        self.start_delay = start_delay;
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// 校验时间参数
    pub fn validate(&self) -> StormResult<()> {
        check_seconds("start_delay", self.start_delay)?;
        match self.interval {
            Interval::Fixed(secs) => check_seconds("interval", secs),
            Interval::Ticks(0) => Err(StormError::InvalidSchedule(
                "interval must be at least one tick".to_string(),
            )),
            Interval::Ticks(_) | Interval::Sampled(_) => Ok(()),
        }
    }

    /// 可序列化形式，只有固定秒数间隔可以写入配置
    pub fn to_config(&self) -> Option<ScheduleConfig> {
        match self.interval {
            Interval::Fixed(interval) => Some(ScheduleConfig {
                start_delay: self.start_delay,
                repeat: self.repeat,
                interval,
                clock: self.clock,
            }),
            Interval::Sampled(_) | Interval::Ticks(_) => None,
        }
    }
}

fn check_seconds(name: &str, value: f32) -> StormResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(StormError::InvalidSchedule(format!(
            "{name} must be a finite, non-negative number of seconds, got {value}"
        )))
    }
}

/// 固定间隔调度的配置形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub start_delay: f32,
    pub repeat: Repeat,
    pub interval: f32,
    pub clock: Clock,
}

crate::impl_default!(ScheduleConfig {
    start_delay: 0.0,
    repeat: Repeat::Times(1),
    interval: 0.0,
    clock: Clock::Frame,
});

impl TryFrom<ScheduleConfig> for Schedule {
    type Error = StormError;

    fn try_from(config: ScheduleConfig) -> StormResult<Self> {
        let schedule = Schedule {
            start_delay: config.start_delay,
            repeat: config.repeat,
            interval: Interval::Fixed(config.interval),
            clock: config.clock,
        };
        schedule.validate()?;
        Ok(schedule)
    }
}
