//! 具名事件
//!
//! 设计者通过字符串为子弹系统挂接更新 / 碰撞 / 发射回调。
//! 注册表只是一个简单的名称映射；查找失败是可恢复的配置问题：
//! 记录警告并禁用对应功能，绝不中断运行。

use crate::emission::EmitParam;
use crate::emitter::EmitterTransform;
use crate::particles::ParticleRecord;
use glam::Vec3;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 逐粒子纯变换
///
/// 并行执行时会在多个工作线程上同时调用，不得产生跨粒子的副作用。
pub type ParticleUpdateFn = Arc<dyn Fn(ParticleRecord) -> ParticleRecord + Send + Sync>;

/// 碰撞回调：对方对象与本次脉冲内的碰撞记录
pub type CollisionFn = Arc<dyn Fn(ObjectId, &[CollisionRecord]) + Send + Sync>;

/// 发射回调：发射器变换与发射参数（发射器局部空间）
pub type EmissionFn = Arc<dyn Fn(&EmitterTransform, &EmitParam) + Send + Sync>;

/// 宿主对象标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(pub u64);

/// 宿主报告的单条碰撞记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRecord {
    pub intersection: Vec3,
    pub normal: Vec3,
    pub velocity: Vec3,
}

/// 更新回调挂载的脉冲阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdatePhase {
    /// 每帧
    Update,
    /// 固定步长
    FixedUpdate,
    /// 每帧末尾（回写之前）
    LateUpdate,
}

#[derive(Clone, Default)]
struct PhaseHandler {
    handler: Option<ParticleUpdateFn>,
    parallel: bool,
}

/// 粒子更新事件
#[derive(Clone, Default)]
pub struct UpdateEvent {
    update: PhaseHandler,
    fixed_update: PhaseHandler,
    late_update: PhaseHandler,
}

impl UpdateEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定阶段挂接变换
    pub fn on<F>(mut self, phase: UpdatePhase, parallel: bool, handler: F) -> Self
    where
        F: Fn(ParticleRecord) -> ParticleRecord + Send + Sync + 'static,
    {
        *self.slot_mut(phase) = PhaseHandler {
            handler: Some(Arc::new(handler)),
            parallel,
        };
        self
    }

    /// 每帧变换的便捷写法（并行）
    pub fn on_update<F>(self, handler: F) -> Self
    where
        F: Fn(ParticleRecord) -> ParticleRecord + Send + Sync + 'static,
    {
        self.on(UpdatePhase::Update, true, handler)
    }

    /// 指定阶段的变换及其是否并行
    pub fn handler(&self, phase: UpdatePhase) -> Option<(&ParticleUpdateFn, bool)> {
        let slot = self.slot(phase);
        slot.handler.as_ref().map(|handler| (handler, slot.parallel))
    }

    fn slot(&self, phase: UpdatePhase) -> &PhaseHandler {
        match phase {
            UpdatePhase::Update => &self.update,
            UpdatePhase::FixedUpdate => &self.fixed_update,
            UpdatePhase::LateUpdate => &self.late_update,
        }
    }

    fn slot_mut(&mut self, phase: UpdatePhase) -> &mut PhaseHandler {
        match phase {
            UpdatePhase::Update => &mut self.update,
            UpdatePhase::FixedUpdate => &mut self.fixed_update,
            UpdatePhase::LateUpdate => &mut self.late_update,
        }
    }
}

impl fmt::Debug for UpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateEvent")
            .field("update", &self.update.handler.is_some())
            .field("fixed_update", &self.fixed_update.handler.is_some())
            .field("late_update", &self.late_update.handler.is_some())
            .finish()
    }
}

/// 碰撞事件
#[derive(Clone)]
pub struct CollisionEvent {
    handler: CollisionFn,
}

impl CollisionEvent {
    pub fn new(handler: impl Fn(ObjectId, &[CollisionRecord]) + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// 原样转发宿主报告
    pub fn fire(&self, other: ObjectId, records: &[CollisionRecord]) {
        (self.handler)(other, records);
    }
}

impl fmt::Debug for CollisionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CollisionEvent")
    }
}

/// 发射事件（用于播放枪口特效等）
#[derive(Clone)]
pub struct EmissionEvent {
    handler: EmissionFn,
}

impl EmissionEvent {
    pub fn new(handler: impl Fn(&EmitterTransform, &EmitParam) + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    pub fn fire(&self, emitter: &EmitterTransform, param: &EmitParam) {
        (self.handler)(emitter, param);
    }
}

impl fmt::Debug for EmissionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EmissionEvent")
    }
}

/// 按名称查找事件的注册表
#[derive(Debug)]
pub struct EventRegistry<T> {
    kind: &'static str,
    events: HashMap<String, T>,
}

impl<T: Clone> EventRegistry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            events: HashMap::new(),
        }
    }

    /// 注册事件，同名事件被替换时返回旧值
    pub fn register(&mut self, name: impl Into<String>, event: T) -> Option<T> {
        let name = name.into();
        let previous = self.events.insert(name.clone(), event);
        if previous.is_some() {
            tracing::debug!(target: "bullet", kind = self.kind, %name, "Replaced named event");
        }
        previous
    }

    /// 查找事件；不存在时记录警告并返回 `None`
    pub fn lookup(&self, name: &str) -> Option<T> {
        let event = self.events.get(name).cloned();
        if event.is_none() {
            tracing::warn!(target: "bullet", kind = self.kind, name, "No event registered under this name");
        }
        event
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        self.events.remove(name)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// 三类具名事件的注册表集合
#[derive(Debug)]
pub struct EventRegistries {
    pub update: EventRegistry<UpdateEvent>,
    pub collision: EventRegistry<CollisionEvent>,
    pub emission: EventRegistry<EmissionEvent>,
}

impl EventRegistries {
    pub fn new() -> Self {
        Self {
            update: EventRegistry::new("update"),
            collision: EventRegistry::new("collision"),
            emission: EventRegistry::new("emission"),
        }
    }
}

impl Default for EventRegistries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_registry_lookup() {
        let mut registry = EventRegistry::new("update");
        assert!(registry.lookup("turn").is_none());

        let event = UpdateEvent::new().on_update(|mut r| {
            r.velocity *= 2.0;
            r
        });
        assert!(registry.register("turn", event.clone()).is_none());
        assert!(registry.register("turn", event).is_some());
        assert_eq!(registry.len(), 1);

        let found = registry.lookup("turn").unwrap();
        let (handler, parallel) = found.handler(UpdatePhase::Update).unwrap();
        assert!(parallel);
        let record = handler(ParticleRecord {
            velocity: Vec3::X,
            ..Default::default()
        });
        assert_eq!(record.velocity, Vec3::X * 2.0);
        assert!(found.handler(UpdatePhase::FixedUpdate).is_none());
    }

    #[test]
    fn test_collision_event_forwards_verbatim() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let event = CollisionEvent::new(move |other, records| {
            assert_eq!(other, ObjectId(7));
            seen.fetch_add(records.len(), Ordering::SeqCst);
        });
        let record = CollisionRecord {
            intersection: Vec3::ZERO,
            normal: Vec3::Y,
            velocity: Vec3::Z,
        };
        event.fire(ObjectId(7), &[record, record]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
