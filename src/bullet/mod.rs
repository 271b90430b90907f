//! 子弹系统
//!
//! - [`system`]: 包装宿主粒子基底的 [`BulletSystem`]
//! - [`events`]: 更新 / 碰撞 / 发射具名事件与注册表
//! - [`modules`]: 配置模块与子弹预制

pub mod events;
pub mod modules;
pub mod system;

pub use events::{
    CollisionEvent, CollisionRecord, EmissionEvent, EventRegistries, EventRegistry, ObjectId,
    ParticleUpdateFn, UpdateEvent, UpdatePhase,
};
pub use modules::{
    BulletModule, BulletPrefab, BulletSettings, CollisionModule, ColorOverLifetimeModule,
    DefaultsModule, EmissionModule, ModuleConfig, UpdateModule,
};
pub use system::{BulletSystem, BulletSystemState, EmitStats, SharedBulletSystem};
