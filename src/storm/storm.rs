//! 风暴
//!
//! 风暴按插入顺序拥有一组行为，把脉冲按时钟转发给对应的行为，
//! 并把暂停 / 恢复 / 取消广播给所有成员。风暴自身的状态由成员状态聚合得出：
//!
//! | 成员                     | 风暴      |
//! |--------------------------|-----------|
//! | 至少一个 Running         | Running   |
//! | 全部 Finished（或为空）  | Finished  |
//! | 其余情况中有 Paused      | Paused    |
//! | 被显式取消               | Cancelled |

use crate::core::error::{StormError, StormResult};
use crate::core::task::{TaskOutcome, TaskStatus};
use crate::storm::behavior::StormBehavior;
use crate::storm::schedule::Clock;
use std::fmt;

type StormCallback = Box<dyn FnOnce(TaskOutcome)>;

/// 风暴
pub struct Storm {
    name: String,
    behaviors: Vec<StormBehavior>,
    started: bool,
    cancelled: bool,
    /// 最近一次推进时的帧号，用于发射器的每帧同步
    frame: u64,
    on_complete: Option<StormCallback>,
}

impl Storm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviors: Vec::new(),
            started: false,
            cancelled: false,
            frame: 0,
            on_complete: None,
        }
    }

    /// 添加行为的构建器写法
    pub fn with_behavior(mut self, behavior: StormBehavior) -> StormResult<Self> {
        self.add_behavior(behavior)?;
        Ok(self)
    }

    /// 风暴结束（完成或取消）时调用一次
    pub fn on_complete(mut self, callback: impl FnOnce(TaskOutcome) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn behaviors(&self) -> &[StormBehavior] {
        &self.behaviors
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// 聚合状态
    pub fn status(&self) -> TaskStatus {
        if self.cancelled {
            return TaskStatus::Cancelled;
        }
        if !self.started {
            return TaskStatus::NotStarted;
        }
        let statuses = || self.behaviors.iter().map(StormBehavior::status);
        if statuses().any(|s| s == TaskStatus::Running) {
            TaskStatus::Running
        } else if statuses().any(|s| s == TaskStatus::Paused) {
            TaskStatus::Paused
        } else {
            TaskStatus::Finished
        }
    }

    /// 添加行为
    ///
    /// 风暴已运行时新行为立即启动，已暂停时随之暂停；风暴结束后返回错误。
    pub fn add_behavior(&mut self, mut behavior: StormBehavior) -> StormResult<()> {
        match self.status() {
            TaskStatus::Finished => return Err(StormError::Closed("finished")),
            TaskStatus::Cancelled => return Err(StormError::Closed("cancelled")),
            TaskStatus::NotStarted => {}
            TaskStatus::Running => {
                behavior.start();
            }
            TaskStatus::Paused => {
                behavior.start();
                behavior.pause();
            }
        }
        self.behaviors.push(behavior);
        Ok(())
    }

    /// 启动所有行为
    pub fn start(&mut self) -> bool {
        if self.started || self.cancelled {
            tracing::warn!(target: "storm", storm = %self.name, status = %self.status(), "Storm cannot be started again");
            return false;
        }
        self.started = true;
        for behavior in &mut self.behaviors {
            behavior.start();
        }
        tracing::debug!(target: "storm", storm = %self.name, behaviors = self.behaviors.len(), "Storm started");
        self.check_complete();
        true
    }

    /// 每帧脉冲，帧号取自风暴自己的计数
    ///
    /// 多个风暴共享发射器时应改用 [`Storm::tick_frame`]，由宿主提供统一的帧号，
    /// 否则各风暴的计数不同步，发射器会在同一宿主帧内被推进多次。
    pub fn tick(&mut self, dt: f32) -> TaskStatus {
        self.tick_frame(self.frame + 1, dt)
    }

    /// 以宿主帧号推进：同步发射器后推进帧时钟上的行为
    ///
    /// 同一帧号下发射器的瞄准协作者最多被推进一次。
    pub fn tick_frame(&mut self, frame: u64, dt: f32) -> TaskStatus {
        if !self.is_live() {
            return self.status();
        }
        self.frame = frame;
        for behavior in &self.behaviors {
            behavior.sync_emitter(frame, dt);
        }
        self.pulse(Clock::Frame, dt)
    }

    /// 固定步长脉冲
    pub fn fixed_tick(&mut self, dt: f32) -> TaskStatus {
        if !self.is_live() {
            return self.status();
        }
        self.pulse(Clock::Fixed, dt)
    }

    fn pulse(&mut self, clock: Clock, dt: f32) -> TaskStatus {
        for behavior in self.behaviors.iter_mut().filter(|b| b.clock() == clock) {
            behavior.tick(dt);
        }
        self.check_complete();
        self.status()
    }

    fn is_live(&self) -> bool {
        matches!(self.status(), TaskStatus::Running | TaskStatus::Paused)
    }

    /// 暂停所有运行中的行为
    pub fn pause(&mut self) -> bool {
        if self.status() != TaskStatus::Running {
            tracing::trace!(target: "storm", storm = %self.name, status = %self.status(), "Ignoring pause");
            return false;
        }
        for behavior in &mut self.behaviors {
            behavior.pause();
        }
        true
    }

    /// 恢复所有已暂停的行为
    pub fn resume(&mut self) -> bool {
        if self.status() != TaskStatus::Paused {
            tracing::trace!(target: "storm", storm = %self.name, status = %self.status(), "Ignoring resume");
            return false;
        }
        for behavior in &mut self.behaviors {
            behavior.resume();
        }
        true
    }

    /// 取消风暴：所有未结束的行为被强制取消，已发射的子弹保留
    pub fn cancel(&mut self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        for behavior in &mut self.behaviors {
            behavior.cancel();
        }
        self.cancelled = true;
        tracing::debug!(target: "storm", storm = %self.name, "Storm cancelled");
        if let Some(callback) = self.on_complete.take() {
            callback(TaskOutcome::Cancelled);
        }
        true
    }

    fn check_complete(&mut self) {
        if self.status() != TaskStatus::Finished {
            return;
        }
        if let Some(callback) = self.on_complete.take() {
            tracing::debug!(target: "storm", storm = %self.name, "Storm finished");
            callback(TaskOutcome::Completed);
        }
    }
}

impl fmt::Debug for Storm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storm")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("frame", &self.frame)
            .field("behaviors", &self.behaviors)
            .finish()
    }
}
