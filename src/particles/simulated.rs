//! 内存中的参考粒子基底
//!
//! 在 CPU 上完成最简单的积分（位置 += 速度 × dt，年龄递增，超过生命周期即移除），
//! 用于测试、基准和无头演示。真实项目中由宿主引擎的粒子系统实现 [`ParticleSubstrate`]。

use crate::emission::SpawnParams;
use crate::particles::record::ParticleRecord;
use crate::particles::substrate::{ParticleSubstrate, SimulationSpace, SubstrateSettings};

/// 模拟基底
#[derive(Debug, Clone)]
pub struct SimulatedSubstrate {
    particles: Vec<ParticleRecord>,
    capacity: usize,
    space: SimulationSpace,
    settings: SubstrateSettings,
    /// 累计成功发射数
    spawned: u64,
    /// 累计被容量拒绝的发射数
    rejected: u64,
    /// 累计回写次数
    writes: u64,
    torn_down: bool,
}

impl SimulatedSubstrate {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            capacity,
            space: SimulationSpace::World,
            settings: SubstrateSettings::default(),
            spawned: 0,
            rejected: 0,
            writes: 0,
            torn_down: false,
        }
    }

    pub fn with_space(mut self, space: SimulationSpace) -> Self {
        self.space = space;
        self
    }

    /// 直接插入一个粒子（不计入发射统计），容量已满时返回 `false`
    pub fn insert(&mut self, record: ParticleRecord) -> bool {
        if self.particles.len() >= self.capacity {
            return false;
        }
        self.particles.push(record);
        true
    }

    pub fn particles(&self) -> &[ParticleRecord] {
        &self.particles
    }

    pub fn settings(&self) -> &SubstrateSettings {
        &self.settings
    }

    pub fn spawn_count(&self) -> u64 {
        self.spawned
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// 推进模拟
    pub fn advance(&mut self, dt: f32) {
        let gradient = self.settings.color_over_lifetime.as_ref();
        for particle in &mut self.particles {
            particle.age += dt;
            particle.position += particle.velocity * dt;
            particle.delta_time = dt;
            if let Some(gradient) = gradient {
                particle.color = gradient.sample(particle.normalized_age());
            }
        }
        self.particles.retain(|p| !p.is_expired());
    }

    /// 报告第 `index` 个粒子发生碰撞，按碰撞设置决定是否销毁；返回是否被销毁
    pub fn collide(&mut self, index: usize) -> bool {
        let collision = self.settings.collision;
        if !collision.enabled || !collision.kill_on_collision || index >= self.particles.len() {
            return false;
        }
        self.particles.swap_remove(index);
        true
    }

    /// 移除所有粒子
    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

impl ParticleSubstrate for SimulatedSubstrate {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn live_count(&self) -> usize {
        self.particles.len()
    }

    fn simulation_space(&self) -> SimulationSpace {
        self.space
    }

    fn read_live(&self, out: &mut [ParticleRecord]) -> usize {
        let count = self.particles.len().min(out.len());
        out[..count].copy_from_slice(&self.particles[..count]);
        count
    }

    fn write_back(&mut self, records: &[ParticleRecord]) {
        let count = records.len().min(self.capacity);
        self.particles.clear();
        self.particles.extend_from_slice(&records[..count]);
        self.writes += 1;
    }

    fn spawn(&mut self, params: &SpawnParams) -> bool {
        if self.torn_down || self.particles.len() >= self.capacity {
            self.rejected += 1;
            return false;
        }
        self.particles.push(ParticleRecord {
            position: params.position,
            velocity: params.velocity,
            rotation: params.rotation,
            color: params.color,
            size: params.size,
            age: 0.0,
            lifetime: params.lifetime,
            delta_time: 0.0,
        });
        self.spawned += 1;
        true
    }

    fn configure(&mut self, settings: &SubstrateSettings) {
        self.settings = settings.clone();
    }

    fn teardown(&mut self) {
        self.particles.clear();
        self.torn_down = true;
    }
}
