//! 可控协程（协作式任务）
//!
//! 由外部周期性脉冲（帧 / 固定帧）推进的可暂停、可取消的顺序工作单元。
//! 不是操作系统线程，也不依赖原生协程：挂起点被显式建模为 [`WaitCondition`]，
//! 任务体的状态保存在实现了 [`TaskBody`] 的结构体中，因此可以随时检查。
//!
//! ## 状态机
//!
//! ```text
//!  NotStarted ──start──► Running ◄──resume── Paused
//!                          │  └────pause────►  │
//!                          │                   │
//!                      (body done)          cancel
//!                          ▼                   ▼
//!                       Finished           Cancelled
//! ```
//!
//! Finished / Cancelled 是终止状态，任何操作都无法再回到 Running。

use std::fmt;

/// 等待条件的浮点容差，避免 1/60 秒累加误差导致多等一帧
const WAIT_EPSILON: f32 = 1e-5;

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    /// 尚未启动
    NotStarted,
    /// 运行中
    Running,
    /// 已暂停
    Paused,
    /// 已完成
    Finished,
    /// 已取消
    Cancelled,
}

impl TaskStatus {
    /// 是否为终止状态
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// 挂起点的恢复条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitCondition {
    /// 下一次脉冲立即恢复
    NextTick,
    /// 等待指定秒数（按脉冲的 dt 累减）
    Seconds(f32),
    /// 等待指定脉冲次数
    Ticks(u32),
}

impl WaitCondition {
    /// 消耗一次脉冲，返回剩余的等待；条件满足时返回 `None`
    fn advance(self, dt: f32) -> Option<Self> {
        match self {
            Self::NextTick => None,
            Self::Seconds(remaining) => {
                let remaining = remaining - dt.max(0.0);
                (remaining > WAIT_EPSILON).then_some(Self::Seconds(remaining))
            }
            Self::Ticks(remaining) => {
                let remaining = remaining.saturating_sub(1);
                (remaining > 0).then_some(Self::Ticks(remaining))
            }
        }
    }
}

/// 任务体单步执行的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// 在挂起点让出，满足条件后继续
    Yield(WaitCondition),
    /// 任务体执行完毕
    Complete,
}

/// 任务结束方式，传给完成回调
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// 正常完成
    Completed,
    /// 被取消
    Cancelled,
}

impl TaskOutcome {
    pub fn is_cancelled(self) -> bool {
        self == Self::Cancelled
    }
}

/// 协作式任务的任务体
///
/// 每次 [`TaskBody::step`] 从上一个挂起点运行到下一个挂起点，期间不会与其他任务交错。
pub trait TaskBody {
    /// 单步执行时需要借用的外部上下文
    type Context: ?Sized;

    /// 启动后第一次执行前的等待
    fn initial_wait(&self) -> WaitCondition {
        WaitCondition::NextTick
    }

    /// 执行到下一个挂起点
    fn step(&mut self, ctx: &mut Self::Context) -> Step;
}

type CompletionCallback = Box<dyn FnOnce(TaskOutcome)>;

/// 可控协程
///
/// 只能由唯一的所有者（风暴、行为或子弹系统）推进。
pub struct CooperativeTask<B: TaskBody> {
    body: B,
    status: TaskStatus,
    /// 挂起时的恢复条件
    pending: Option<WaitCondition>,
    /// 已执行的步数
    steps: u64,
    on_complete: Option<CompletionCallback>,
}

impl<B: TaskBody> CooperativeTask<B> {
    pub fn new(body: B) -> Self {
        Self {
            body,
            status: TaskStatus::NotStarted,
            pending: None,
            steps: 0,
            on_complete: None,
        }
    }

    /// 注册完成回调（正常完成或取消时各最多调用一次）
    pub fn with_completion(mut self, callback: impl FnOnce(TaskOutcome) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    /// 当前挂起点的剩余等待
    pub fn pending_wait(&self) -> Option<WaitCondition> {
        self.pending
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// NotStarted → Running
    ///
    /// 其他状态下调用只记录警告，返回 `false`。
    pub fn start(&mut self) -> bool {
        if self.status != TaskStatus::NotStarted {
            tracing::warn!(target: "task", status = %self.status, "Task cannot be started again");
            return false;
        }
        self.pending = Some(self.body.initial_wait());
        self.status = TaskStatus::Running;
        true
    }

    /// Running → Paused
    pub fn pause(&mut self) -> bool {
        if self.status != TaskStatus::Running {
            tracing::trace!(target: "task", status = %self.status, "Ignoring pause");
            return false;
        }
        self.status = TaskStatus::Paused;
        true
    }

    /// Paused → Running
    pub fn resume(&mut self) -> bool {
        if self.status != TaskStatus::Paused {
            tracing::trace!(target: "task", status = %self.status, "Ignoring resume");
            return false;
        }
        self.status = TaskStatus::Running;
        true
    }

    /// 任意非终止状态 → Cancelled
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.pending = None;
        self.conclude(TaskOutcome::Cancelled);
        true
    }

    /// 推进一次脉冲
    ///
    /// 仅在 Running 时生效：先消耗挂起条件，条件满足则执行一步。
    /// 每次脉冲最多执行一步，错过的脉冲不会补偿。
    pub fn tick(&mut self, dt: f32, ctx: &mut B::Context) -> TaskStatus {
        if self.status != TaskStatus::Running {
            return self.status;
        }

        let wait = self.pending.take().unwrap_or(WaitCondition::NextTick);
        if let Some(remaining) = wait.advance(dt) {
            self.pending = Some(remaining);
            return self.status;
        }

        self.steps += 1;
        match self.body.step(ctx) {
            Step::Yield(next) => self.pending = Some(next),
            Step::Complete => self.conclude(TaskOutcome::Completed),
        }
        self.status
    }

    fn conclude(&mut self, outcome: TaskOutcome) {
        self.status = match outcome {
            TaskOutcome::Completed => TaskStatus::Finished,
            TaskOutcome::Cancelled => TaskStatus::Cancelled,
        };
        if let Some(callback) = self.on_complete.take() {
            callback(outcome);
        }
    }
}

impl<B: TaskBody + fmt::Debug> fmt::Debug for CooperativeTask<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CooperativeTask")
            .field("body", &self.body)
            .field("status", &self.status)
            .field("pending", &self.pending)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// 每步计数一次，共执行 `total` 步，步间等待 `interval` 秒
    #[derive(Debug)]
    struct Countdown {
        total: u32,
        done: u32,
        interval: f32,
    }

    impl TaskBody for Countdown {
        type Context = Vec<u32>;

        fn step(&mut self, log: &mut Vec<u32>) -> Step {
            self.done += 1;
            log.push(self.done);
            if self.done >= self.total {
                Step::Complete
            } else {
                Step::Yield(WaitCondition::Seconds(self.interval))
            }
        }
    }

    fn countdown(total: u32, interval: f32) -> CooperativeTask<Countdown> {
        CooperativeTask::new(Countdown {
            total,
            done: 0,
            interval,
        })
    }

    #[test]
    fn test_not_started_ignores_ticks() {
        let mut task = countdown(3, 1.0);
        let mut log = Vec::new();
        assert_eq!(task.tick(1.0, &mut log), TaskStatus::NotStarted);
        assert!(log.is_empty());
    }

    #[test]
    fn test_runs_to_completion() {
        let mut task = countdown(3, 1.0);
        let mut log = Vec::new();
        assert!(task.start());
        task.tick(0.0, &mut log);
        task.tick(0.5, &mut log);
        assert_eq!(log, vec![1]);
        task.tick(0.5, &mut log);
        assert_eq!(log, vec![1, 2]);
        assert_eq!(task.tick(1.0, &mut log), TaskStatus::Finished);
        assert_eq!(log, vec![1, 2, 3]);
        assert_eq!(task.steps_taken(), 3);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut task = countdown(1, 0.0);
        assert!(task.start());
        assert!(!task.start());
        assert_eq!(task.status(), TaskStatus::Running);
    }

    #[test]
    fn test_pause_freezes_wait() {
        let mut task = countdown(2, 1.0);
        let mut log = Vec::new();
        task.start();
        task.tick(0.0, &mut log);
        task.tick(0.5, &mut log);
        assert!(task.pause());
        for _ in 0..10 {
            task.tick(1.0, &mut log);
        }
        assert_eq!(log, vec![1]);
        assert!(task.resume());
        assert_eq!(task.pending_wait(), Some(WaitCondition::Seconds(0.5)));
        task.tick(0.5, &mut log);
        assert_eq!(log, vec![1, 2]);
    }

    #[test]
    fn test_pause_resume_only_from_valid_states() {
        let mut task = countdown(1, 0.0);
        assert!(!task.pause());
        assert!(!task.resume());
        task.start();
        assert!(!task.resume());
        assert!(task.pause());
        assert!(!task.pause());
    }

    #[test]
    fn test_cancel_invokes_callback_once() {
        let outcome = Rc::new(Cell::new(None));
        let seen = Rc::clone(&outcome);
        let mut task = countdown(5, 1.0).with_completion(move |o| seen.set(Some(o)));
        task.start();
        assert!(task.cancel());
        assert!(!task.cancel());
        assert_eq!(task.status(), TaskStatus::Cancelled);
        assert_eq!(outcome.get(), Some(TaskOutcome::Cancelled));
    }

    #[test]
    fn test_completion_callback_on_finish() {
        let outcome = Rc::new(Cell::new(None));
        let seen = Rc::clone(&outcome);
        let mut task = countdown(1, 0.0).with_completion(move |o| seen.set(Some(o)));
        let mut log = Vec::new();
        task.start();
        task.tick(0.016, &mut log);
        assert_eq!(outcome.get(), Some(TaskOutcome::Completed));
        assert!(!outcome.get().unwrap().is_cancelled());
    }

    #[test]
    fn test_one_step_per_tick() {
        let mut task = countdown(10, 0.1);
        let mut log = Vec::new();
        task.start();
        task.tick(0.0, &mut log);
        // 一次超长脉冲不会补发多步
        task.tick(5.0, &mut log);
        assert_eq!(log, vec![1, 2]);
    }

    #[test]
    fn test_wait_ticks() {
        assert_eq!(WaitCondition::Ticks(3).advance(0.0), Some(WaitCondition::Ticks(2)));
        assert_eq!(WaitCondition::Ticks(1).advance(0.0), None);
        assert_eq!(WaitCondition::NextTick.advance(0.0), None);
        assert_eq!(WaitCondition::Seconds(0.0).advance(0.0), None);
    }

    #[test]
    fn test_sixty_hz_accumulates_to_one_second() {
        let mut wait = Some(WaitCondition::Seconds(1.0));
        let mut ticks = 0;
        while let Some(w) = wait {
            wait = w.advance(1.0 / 60.0);
            ticks += 1;
        }
        assert_eq!(ticks, 60);
    }
}
