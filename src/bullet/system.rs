//! 子弹系统
//!
//! 包装一个宿主粒子基底：接受发射请求、在每次脉冲中运行更新事件，
//! 并在销毁时等待存活子弹全部消失后才释放基底。
//!
//! 每个预制对应一个原点系统；挂在具体发射器上的基底实例通过
//! [`BulletSystem::instantiate_copy`] 创建副本，副本共享原点的事件与默认值。

use crate::bullet::events::{CollisionRecord, EventRegistries, ObjectId, UpdatePhase};
use crate::bullet::modules::{BulletPrefab, BulletSettings};
use crate::config::{BatchConfig, StormConfig};
use crate::core::task::{CooperativeTask, Step, TaskBody, TaskStatus, WaitCondition};
use crate::emission::EmitParam;
use crate::emitter::EmitterTransform;
use crate::particles::{
    BatchStats, BatchUpdateEngine, BufferState, ParticleRecord, ParticleSubstrate, SimulationSpace,
};
use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// 风暴行为持有的子弹系统共享句柄
pub type SharedBulletSystem = Rc<RefCell<BulletSystem>>;

/// 子弹系统生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulletSystemState {
    /// 正常工作
    Active,
    /// 已请求销毁，等待存活子弹归零
    Draining,
    /// 基底已释放
    Destroyed,
}

/// 发射统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    /// 成功发射数
    pub emitted: u64,
    /// 因容量或生命周期被丢弃的发射数
    pub dropped: u64,
}

/// 销毁等待：每次脉冲检查一次存活数量
#[derive(Debug, Default)]
struct DrainWatch;

impl TaskBody for DrainWatch {
    type Context = dyn ParticleSubstrate;

    fn step(&mut self, substrate: &mut Self::Context) -> Step {
        if substrate.live_count() == 0 {
            Step::Complete
        } else {
            Step::Yield(WaitCondition::NextTick)
        }
    }
}

enum Lifecycle {
    Active,
    Draining(CooperativeTask<DrainWatch>),
    Destroyed,
}

/// 子弹系统
pub struct BulletSystem {
    name: String,
    is_origin: bool,
    substrate: Box<dyn ParticleSubstrate>,
    engine: BatchUpdateEngine,
    settings: BulletSettings,
    lifecycle: Lifecycle,
    /// 未显式指定时变换是否并行
    parallel_by_default: bool,
    stats: EmitStats,
}

impl BulletSystem {
    /// 创建原点系统
    pub fn origin(
        name: impl Into<String>,
        mut substrate: Box<dyn ParticleSubstrate>,
        settings: BulletSettings,
        batch: BatchConfig,
    ) -> Self {
        let name = name.into();
        substrate.configure(&settings.substrate);
        tracing::debug!(
            target: "bullet",
            %name,
            capacity = substrate.capacity(),
            "Created origin bullet system"
        );
        Self {
            name,
            is_origin: true,
            substrate,
            parallel_by_default: batch.parallel_by_default,
            engine: BatchUpdateEngine::new(batch),
            settings,
            lifecycle: Lifecycle::Active,
            stats: EmitStats::default(),
        }
    }

    /// 由预制创建原点系统
    pub fn from_prefab(
        prefab: &BulletPrefab,
        substrate: Box<dyn ParticleSubstrate>,
        config: &StormConfig,
        registries: &EventRegistries,
    ) -> Self {
        let settings = prefab.build(BulletSettings::from_config(config), registries);
        Self::origin(prefab.name.clone(), substrate, settings, config.batch.clone())
    }

    /// 绑定到新基底实例的副本，共享事件与默认值
    pub fn instantiate_copy(&self, mut substrate: Box<dyn ParticleSubstrate>) -> Self {
        substrate.configure(&self.settings.substrate);
        Self {
            name: self.name.clone(),
            is_origin: false,
            substrate,
            engine: self.engine.fork(),
            settings: self.settings.clone(),
            lifecycle: Lifecycle::Active,
            parallel_by_default: self.parallel_by_default,
            stats: EmitStats::default(),
        }
    }

    pub fn into_shared(self) -> SharedBulletSystem {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_origin(&self) -> bool {
        self.is_origin
    }

    pub fn settings(&self) -> &BulletSettings {
        &self.settings
    }

    pub fn state(&self) -> BulletSystemState {
        match self.lifecycle {
            Lifecycle::Active => BulletSystemState::Active,
            Lifecycle::Draining(_) => BulletSystemState::Draining,
            Lifecycle::Destroyed => BulletSystemState::Destroyed,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Destroyed)
    }

    pub fn live_count(&self) -> usize {
        self.substrate.live_count()
    }

    pub fn capacity(&self) -> usize {
        self.substrate.capacity()
    }

    pub fn emit_stats(&self) -> EmitStats {
        self.stats
    }

    pub fn batch_stats(&self) -> BatchStats {
        self.engine.stats()
    }

    pub fn substrate(&self) -> &dyn ParticleSubstrate {
        self.substrate.as_ref()
    }

    /// 本脉冲的存活粒子快照
    pub fn snapshot(&mut self) -> &[ParticleRecord] {
        self.engine.snapshot(self.substrate.as_ref())
    }

    // ========================================================================
    // 发射
    // ========================================================================

    /// 发射一个子弹
    ///
    /// 参数位于发射器局部空间；基底处于世界空间时先转换到世界坐标。
    /// 达到容量上限、正在销毁或已销毁时丢弃并返回 `false`。
    pub fn emit(&mut self, param: EmitParam, emitter: &EmitterTransform) -> bool {
        if !matches!(self.lifecycle, Lifecycle::Active) {
            self.stats.dropped += 1;
            tracing::trace!(target: "bullet", name = %self.name, state = ?self.state(), "Refusing emission");
            return false;
        }
        if self.substrate.live_count() >= self.substrate.capacity() {
            self.stats.dropped += 1;
            tracing::trace!(target: "bullet", name = %self.name, "Bullet system full, emission dropped");
            return false;
        }

        // 新粒子不在当前快照中，先结束快照以免回写覆盖
        if self.engine.buffer().state() != BufferState::Stale {
            self.engine.end_tick(self.substrate.as_mut());
        }

        let spawn = param.resolve(&self.settings.defaults);
        let spawn = match self.substrate.simulation_space() {
            SimulationSpace::World => spawn.relative_to(emitter),
            SimulationSpace::Local => spawn,
        };
        if !self.substrate.spawn(&spawn) {
            self.stats.dropped += 1;
            tracing::trace!(target: "bullet", name = %self.name, "Substrate rejected emission");
            return false;
        }

        self.stats.emitted += 1;
        if let Some(event) = &self.settings.emission_event {
            event.fire(emitter, &param);
        }
        true
    }

    // ========================================================================
    // 状态更新
    // ========================================================================

    /// 对所有存活粒子应用变换，返回处理的粒子数
    ///
    /// 在脉冲之外调用，宿主随时可能推进基底，因此结果立即回写一次。
    /// 同一脉冲内多个更新事件的修改由 [`BulletSystem::tick`] 合并回写。
    pub fn update_particles<F>(&mut self, transform: F, parallel: bool) -> usize
    where
        F: Fn(ParticleRecord) -> ParticleRecord + Send + Sync,
    {
        let count = self.engine.update(self.substrate.as_ref(), transform, parallel);
        self.engine.end_tick(self.substrate.as_mut());
        count
    }

    /// 以 `(position, velocity) -> velocity` 改写速度
    ///
    /// 开启旋转对齐时，同时按新旧速度之间的弧度旋转粒子。
    pub fn change_velocity<F>(&mut self, velocity: F) -> usize
    where
        F: Fn(Vec3, Vec3) -> Vec3 + Send + Sync,
    {
        let align = self.settings.defaults.align_rotation_to_velocity;
        let parallel = self.parallel_by_default;
        self.update_particles(
            move |mut record| {
                let old = record.velocity;
                record.velocity = velocity(record.position, old);
                if align {
                    record.rotation = realign(record.rotation, old, record.velocity);
                }
                record
            },
            parallel,
        )
    }

    /// 以 `(position, velocity) -> position` 改写位置
    pub fn change_position<F>(&mut self, position: F) -> usize
    where
        F: Fn(Vec3, Vec3) -> Vec3 + Send + Sync,
    {
        let parallel = self.parallel_by_default;
        self.update_particles(
            move |mut record| {
                record.position = position(record.position, record.velocity);
                record
            },
            parallel,
        )
    }

    // ========================================================================
    // 脉冲
    // ========================================================================

    /// 每帧脉冲：依次运行 Update、LateUpdate 事件，然后回写一次
    pub fn tick(&mut self, dt: f32) {
        if self.is_destroyed() {
            return;
        }
        self.begin_pulse();
        self.run_phase(UpdatePhase::Update);
        self.run_phase(UpdatePhase::LateUpdate);
        self.finish_pulse(dt);
    }

    /// 固定步长脉冲：运行 FixedUpdate 事件，然后回写一次
    pub fn fixed_tick(&mut self, dt: f32) {
        if self.is_destroyed() {
            return;
        }
        self.begin_pulse();
        self.run_phase(UpdatePhase::FixedUpdate);
        self.finish_pulse(dt);
    }

    /// 脉冲之间读取的快照可能已被宿主推进，脉冲开始时重新拉取
    fn begin_pulse(&mut self) {
        self.engine.end_tick(self.substrate.as_mut());
    }

    fn run_phase(&mut self, phase: UpdatePhase) {
        let Some((handler, parallel)) = self
            .settings
            .update_event
            .as_ref()
            .and_then(|event| event.handler(phase))
            .map(|(handler, parallel)| (Arc::clone(handler), parallel))
        else {
            return;
        };
        self.engine
            .update(self.substrate.as_ref(), move |record| handler(record), parallel);
    }

    fn finish_pulse(&mut self, dt: f32) {
        self.engine.end_tick(self.substrate.as_mut());

        let drained = match &mut self.lifecycle {
            Lifecycle::Draining(watch) => watch.tick(dt, self.substrate.as_mut()) == TaskStatus::Finished,
            _ => false,
        };
        if drained {
            self.substrate.teardown();
            self.lifecycle = Lifecycle::Destroyed;
            tracing::debug!(target: "bullet", name = %self.name, "Bullet system destroyed");
        }
    }

    // ========================================================================
    // 碰撞与销毁
    // ========================================================================

    /// 宿主报告碰撞，原样转发给碰撞事件
    pub fn report_collisions(&self, other: ObjectId, records: &[CollisionRecord]) {
        match &self.settings.collision_event {
            Some(event) => event.fire(other, records),
            None => tracing::trace!(target: "bullet", name = %self.name, "No collision event bound"),
        }
    }

    /// 请求销毁：停止接受发射，等存活子弹全部消失后释放基底
    ///
    /// 重复调用无效果。
    pub fn destroy(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Active) {
            tracing::trace!(target: "bullet", name = %self.name, "Bullet system already destroying");
            return;
        }
        let mut watch = CooperativeTask::new(DrainWatch);
        watch.start();
        self.lifecycle = Lifecycle::Draining(watch);
        tracing::debug!(
            target: "bullet",
            name = %self.name,
            live = self.substrate.live_count(),
            "Draining bullet system"
        );
    }
}

/// 把 `rotation` 按 `from` 到 `to` 的弧度旋转，零向量视为正前方
fn realign(rotation: Quat, from: Vec3, to: Vec3) -> Quat {
    let from = from.try_normalize().unwrap_or(Vec3::Z);
    let to = to.try_normalize().unwrap_or(Vec3::Z);
    (Quat::from_rotation_arc(from, to) * rotation).normalize()
}

impl fmt::Debug for BulletSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulletSystem")
            .field("name", &self.name)
            .field("is_origin", &self.is_origin)
            .field("state", &self.state())
            .field("live", &self.substrate.live_count())
            .field("capacity", &self.substrate.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::particles::SimulatedSubstrate;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn drain_never_completes_while_alive(
            live in 1usize..20,
            ticks in 1usize..30,
        ) {
            let substrate = Rc::new(RefCell::new(SimulatedSubstrate::new(32)));
            let mut bullets = BulletSystem::origin(
                "drain",
                Box::new(Rc::clone(&substrate)),
                BulletSettings::default(),
                BatchConfig::default(),
            );
            for _ in 0..live {
                bullets.emit(EmitParam::new(), &EmitterTransform::IDENTITY);
            }
            bullets.destroy();
            for _ in 0..ticks {
                bullets.tick(0.016);
                prop_assert!(!bullets.is_destroyed());
            }
            substrate.borrow_mut().clear();
            bullets.tick(0.016);
            prop_assert!(bullets.is_destroyed());
        }
    }
}
