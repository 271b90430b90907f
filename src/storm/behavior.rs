//! 风暴行为
//!
//! 一个行为 = 调度 + 发射形状 + 目标子弹系统 + 发射器。
//! 行为的执行体是一个 [`CooperativeTask`]：
//!
//! ```text
//!  Delay(start_delay) ──► emit ──► Interval ──► emit ──► ... ──► Done
//! ```
//!
//! 子弹系统与发射器都只以弱引用持有；任意一方已被释放时，
//! 当前周期记录警告后跳过，行为继续按调度推进。

use crate::bullet::{BulletSystem, SharedBulletSystem};
use crate::core::error::StormResult;
use crate::core::task::{CooperativeTask, Step, TaskBody, TaskStatus, WaitCondition};
use crate::emission::{EmissionShape, EmitParam};
use crate::emitter::{Emitter, SharedEmitter};
use crate::storm::schedule::{Clock, Repeat, Schedule};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// 行为所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorPhase {
    /// 尚未启动
    Idle,
    /// 等待首次发射
    Delay,
    /// 两次发射之间
    Interval,
    /// 已结束（完成或取消）
    Done,
}

/// 单步执行时的脉冲信息
struct EmissionPulse {
    /// 行为启动以来经过的秒数
    elapsed: f32,
}

/// 发射计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BehaviorStats {
    /// 已执行的周期数（含被跳过的周期）
    pub cycles: u32,
    /// 因引用失效被跳过的周期数
    pub skipped: u32,
    /// 子弹系统接受的发射数
    pub emitted: u64,
    /// 被子弹系统丢弃的发射数
    pub dropped: u64,
}

struct EmissionBody {
    schedule: Schedule,
    shape: EmissionShape,
    target: Weak<RefCell<BulletSystem>>,
    emitter: Weak<RefCell<Emitter>>,
    rng: Option<StdRng>,
    stats: BehaviorStats,
}

impl EmissionBody {
    fn emit_cycle(&mut self) {
        let (Some(target), Some(emitter)) = (self.target.upgrade(), self.emitter.upgrade()) else {
            self.stats.skipped += 1;
            tracing::warn!(
                target: "storm",
                cycle = self.stats.cycles,
                "Bullet system or emitter is gone, skipping emission"
            );
            return;
        };
        let transform = match emitter.try_borrow() {
            Ok(emitter) => emitter.emission_transform(),
            Err(_) => {
                self.stats.skipped += 1;
                tracing::warn!(target: "storm", "Emitter is busy, skipping emission");
                return;
            }
        };
        let Ok(mut target) = target.try_borrow_mut() else {
            self.stats.skipped += 1;
            tracing::warn!(target: "storm", "Bullet system is busy, skipping emission");
            return;
        };

        let count = self.shape.count();
        let params: Vec<EmitParam> = match self.rng.as_mut() {
            Some(rng) => self.shape.generate_with_rng(count, rng).collect(),
            None => self.shape.generate(count).collect(),
        };
        for param in params {
            if target.emit(param, &transform) {
                self.stats.emitted += 1;
            } else {
                self.stats.dropped += 1;
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        matches!(self.schedule.repeat, Repeat::Times(n) if self.stats.cycles >= n)
    }
}

impl TaskBody for EmissionBody {
    type Context = EmissionPulse;

    fn initial_wait(&self) -> WaitCondition {
        WaitCondition::Seconds(self.schedule.start_delay)
    }

    fn step(&mut self, pulse: &mut EmissionPulse) -> Step {
        if self.is_exhausted() {
            return Step::Complete;
        }

        self.emit_cycle();
        self.stats.cycles += 1;

        if self.is_exhausted() {
            Step::Complete
        } else {
            Step::Yield(self.schedule.interval.next(pulse.elapsed))
        }
    }
}

/// 风暴行为
pub struct StormBehavior {
    task: CooperativeTask<EmissionBody>,
    clock: Clock,
    emitter: Weak<RefCell<Emitter>>,
    elapsed: f32,
}

impl StormBehavior {
    /// 创建行为，调度非法时返回错误
    pub fn new(
        schedule: Schedule,
        shape: EmissionShape,
        target: &SharedBulletSystem,
        emitter: &SharedEmitter,
    ) -> StormResult<Self> {
        schedule.validate()?;
        let clock = schedule.clock;
        let body = EmissionBody {
            schedule,
            shape,
            target: Rc::downgrade(target),
            emitter: Rc::downgrade(emitter),
            rng: None,
            stats: BehaviorStats::default(),
        };
        Ok(Self {
            task: CooperativeTask::new(body),
            clock,
            emitter: Rc::downgrade(emitter),
            elapsed: 0.0,
        })
    }

    /// 使用注入的随机源施加形状扰动
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.task.body_mut().rng = Some(rng);
        self
    }

    /// 以固定种子创建随机源，便于复现
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn clock(&self) -> Clock {
        self.clock
    }

    pub fn status(&self) -> TaskStatus {
        self.task.status()
    }

    pub fn stats(&self) -> BehaviorStats {
        self.task.body().stats
    }

    /// 启动以来经过的秒数（暂停期间不计）
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn phase(&self) -> BehaviorPhase {
        match self.task.status() {
            TaskStatus::NotStarted => BehaviorPhase::Idle,
            TaskStatus::Finished | TaskStatus::Cancelled => BehaviorPhase::Done,
            TaskStatus::Running | TaskStatus::Paused => {
                if self.task.steps_taken() == 0 {
                    BehaviorPhase::Delay
                } else {
                    BehaviorPhase::Interval
                }
            }
        }
    }

    /// 启动行为，同时重置发射器瞄准
    pub fn start(&mut self) -> bool {
        if !self.task.start() {
            return false;
        }
        self.elapsed = 0.0;
        if let Some(emitter) = self.emitter.upgrade() {
            match emitter.try_borrow_mut() {
                Ok(mut emitter) => emitter.reset_aim(),
                Err(_) => tracing::warn!(target: "storm", "Emitter is busy, aim not reset"),
            }
        }
        true
    }

    pub fn pause(&mut self) -> bool {
        self.task.pause()
    }

    pub fn resume(&mut self) -> bool {
        self.task.resume()
    }

    pub fn cancel(&mut self) -> bool {
        self.task.cancel()
    }

    /// 推进一次脉冲
    pub fn tick(&mut self, dt: f32) -> TaskStatus {
        if self.task.status() != TaskStatus::Running {
            return self.task.status();
        }
        self.elapsed += dt.max(0.0);
        let mut pulse = EmissionPulse {
            elapsed: self.elapsed,
        };
        self.task.tick(dt, &mut pulse)
    }

    /// 运行中时同步发射器的瞄准协作者（每帧至多一次）
    pub fn sync_emitter(&self, frame: u64, dt: f32) {
        if self.task.status() != TaskStatus::Running {
            return;
        }
        if let Some(emitter) = self.emitter.upgrade() {
            if let Ok(mut emitter) = emitter.try_borrow_mut() {
                emitter.sync(frame, dt);
            }
        }
    }
}

impl fmt::Debug for StormBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StormBehavior")
            .field("clock", &self.clock)
            .field("status", &self.task.status())
            .field("phase", &self.phase())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bullet::BulletSettings;
    use crate::config::BatchConfig;
    use crate::emission::ShapeJitter;
    use crate::emitter::EmitterTransform;
    use crate::particles::{ParticleSubstrate, SimulatedSubstrate};
    use crate::storm::schedule::Interval;
    use std::cell::Cell;

    fn fixture(capacity: usize) -> (Rc<RefCell<SimulatedSubstrate>>, SharedBulletSystem, SharedEmitter) {
        let substrate = Rc::new(RefCell::new(SimulatedSubstrate::new(capacity)));
        let system = BulletSystem::origin(
            "behavior",
            Box::new(Rc::clone(&substrate)),
            BulletSettings::default(),
            BatchConfig::default(),
        )
        .into_shared();
        let emitter = Emitter::new(EmitterTransform::IDENTITY).into_shared();
        (substrate, system, emitter)
    }

    #[test]
    fn test_three_cycles_of_five() {
        let (substrate, system, emitter) = fixture(100);
        let shape = EmissionShape::ring(5, 1.0, 0.0).unwrap();
        let mut behavior =
            StormBehavior::new(Schedule::new(Repeat::Times(3), 1.0), shape, &system, &emitter).unwrap();

        assert_eq!(behavior.phase(), BehaviorPhase::Idle);
        assert!(behavior.start());
        assert_eq!(behavior.phase(), BehaviorPhase::Delay);

        assert_eq!(behavior.tick(0.0), TaskStatus::Running);
        assert_eq!(substrate.borrow().live_count(), 5);
        assert_eq!(behavior.phase(), BehaviorPhase::Interval);
        behavior.tick(1.0);
        assert_eq!(behavior.tick(1.0), TaskStatus::Finished);
        assert_eq!(substrate.borrow().live_count(), 15);
        assert_eq!(behavior.stats().emitted, 15);
        assert_eq!(behavior.phase(), BehaviorPhase::Done);
    }

    #[test]
    fn test_times_zero_emits_nothing() {
        let (substrate, system, emitter) = fixture(10);
        let shape = EmissionShape::point(1, 1.0).unwrap();
        let mut behavior =
            StormBehavior::new(Schedule::new(Repeat::Times(0), 1.0), shape, &system, &emitter).unwrap();
        behavior.start();
        assert_eq!(behavior.tick(0.0), TaskStatus::Finished);
        assert_eq!(substrate.borrow().live_count(), 0);
    }

    #[test]
    fn test_start_delay() {
        let (substrate, system, emitter) = fixture(10);
        let shape = EmissionShape::point(1, 1.0).unwrap();
        let schedule = Schedule::new(Repeat::Infinite, 1.0).with_start_delay(0.5);
        let mut behavior = StormBehavior::new(schedule, shape, &system, &emitter).unwrap();
        behavior.start();
        behavior.tick(0.25);
        assert_eq!(substrate.borrow().live_count(), 0);
        behavior.tick(0.25);
        assert_eq!(substrate.borrow().live_count(), 1);
    }

    #[test]
    fn test_dropped_target_skips_cycle() {
        let (_substrate, system, emitter) = fixture(10);
        let shape = EmissionShape::point(2, 1.0).unwrap();
        let mut behavior =
            StormBehavior::new(Schedule::new(Repeat::Times(2), 0.0), shape, &system, &emitter).unwrap();
        drop(system);

        behavior.start();
        behavior.tick(0.0);
        assert_eq!(behavior.tick(0.0), TaskStatus::Finished);
        let stats = behavior.stats();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.emitted, 0);
    }

    #[test]
    fn test_sampled_interval_sees_elapsed_time() {
        let (_substrate, system, emitter) = fixture(10);
        let seen = Rc::new(Cell::new(-1.0f32));
        let record = Rc::clone(&seen);
        let schedule = Schedule::new(Repeat::Infinite, 0.0).with_interval(Interval::sampled(move |elapsed: f32| {
            record.set(elapsed);
            0.5
        }));
        let shape = EmissionShape::point(1, 1.0).unwrap();
        let mut behavior = StormBehavior::new(schedule, shape, &system, &emitter).unwrap();
        behavior.start();
        behavior.tick(0.1);
        assert!((seen.get() - 0.1).abs() < 1e-6);
        behavior.tick(0.5);
        assert!((seen.get() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_tick_interval_counts_pulses() {
        let (substrate, system, emitter) = fixture(10);
        let schedule = Schedule::new(Repeat::Times(3), 0.0).with_interval(Interval::Ticks(2));
        let shape = EmissionShape::point(1, 1.0).unwrap();
        let mut behavior = StormBehavior::new(schedule, shape, &system, &emitter).unwrap();
        behavior.start();

        // 间隔与 dt 无关，只数脉冲
        let mut counts = Vec::new();
        for _ in 0..5 {
            behavior.tick(10.0);
            counts.push(substrate.borrow().live_count());
        }
        assert_eq!(counts, vec![1, 1, 2, 2, 3]);
        assert_eq!(behavior.status(), TaskStatus::Finished);
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let run = || {
            let (substrate, system, emitter) = fixture(10);
            let shape = EmissionShape::fan(4, 2.0, 90.0, 0.0)
                .unwrap()
                .with_jitter(ShapeJitter { speed: 0.5, angle: 10.0 });
            let mut behavior = StormBehavior::new(Schedule::new(Repeat::Times(1), 0.0), shape, &system, &emitter)
                .unwrap()
                .with_seed(42);
            behavior.start();
            behavior.tick(0.0);
            let velocities: Vec<_> = substrate.borrow().particles().iter().map(|p| p.velocity).collect();
            velocities
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let (_substrate, system, emitter) = fixture(1);
        let shape = EmissionShape::point(1, 1.0).unwrap();
        let schedule = Schedule::new(Repeat::Infinite, f32::NAN);
        assert!(StormBehavior::new(schedule, shape, &system, &emitter).is_err());
    }
}
