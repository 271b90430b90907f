//! 粒子记录与宿主基底交换的数据结构

use glam::{Quat, Vec3, Vec4};

/// 单个存活粒子的状态
///
/// `age` 始终非负；`delta_time` 是该记录最近一次被基底推进时的步长。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleRecord {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    /// RGBA
    pub color: Vec4,
    pub size: Vec3,
    /// 已存活时间（秒）
    pub age: f32,
    /// 总生命周期（秒）
    pub lifetime: f32,
    pub delta_time: f32,
}

impl Default for ParticleRecord {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            color: Vec4::ONE,
            size: Vec3::ONE,
            age: 0.0,
            lifetime: 1.0,
            delta_time: 0.0,
        }
    }
}

impl ParticleRecord {
    /// 剩余生命比例（0 = 刚发射，1 = 即将消亡）
    pub fn normalized_age(&self) -> f32 {
        if self.lifetime <= 0.0 {
            return 1.0;
        }
        (self.age / self.lifetime).clamp(0.0, 1.0)
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.lifetime
    }
}
