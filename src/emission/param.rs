//! 发射参数
//!
//! [`EmitParam`] 是形状生成的声明式参数，每个字段都可以留空表示"使用系统默认值"；
//! [`SpawnParams`] 是合并默认值之后交给宿主基底的完整参数。

use crate::config::BulletDefaults;
use crate::emitter::EmitterTransform;
use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// 单个子弹的发射参数（发射器局部空间）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitParam {
    pub position: Option<Vec3>,
    pub velocity: Option<Vec3>,
    pub rotation: Option<Quat>,
    /// RGBA
    pub color: Option<Vec4>,
    pub size: Option<Vec3>,
}

impl EmitParam {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_size(mut self, size: Vec3) -> Self {
        self.size = Some(size);
        self
    }

    /// 未设置的字段用 `other` 补齐
    pub fn or(self, other: EmitParam) -> Self {
        Self {
            position: self.position.or(other.position),
            velocity: self.velocity.or(other.velocity),
            rotation: self.rotation.or(other.rotation),
            color: self.color.or(other.color),
            size: self.size.or(other.size),
        }
    }

    /// 合并系统默认值
    ///
    /// 开启 `align_rotation_to_velocity` 时，旋转先对齐到速度方向再叠加参数中的旋转。
    pub fn resolve(&self, defaults: &BulletDefaults) -> SpawnParams {
        let velocity = self.velocity.unwrap_or(defaults.velocity);
        let rotation = self.rotation.unwrap_or(Quat::IDENTITY);
        let rotation = if defaults.align_rotation_to_velocity {
            look_rotation(velocity) * rotation
        } else {
            rotation
        };

        SpawnParams {
            position: self.position.unwrap_or(Vec3::ZERO),
            velocity,
            rotation,
            color: self.color.unwrap_or(defaults.color),
            size: self.size.unwrap_or(defaults.size),
            lifetime: defaults.lifetime,
        }
    }
}

/// 朝向 `direction` 的旋转，零向量视为正前方
pub(crate) fn look_rotation(direction: Vec3) -> Quat {
    direction
        .try_normalize()
        .map_or(Quat::IDENTITY, |dir| Quat::from_rotation_arc(Vec3::Z, dir))
}

/// 合并默认值后的完整发射参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnParams {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub color: Vec4,
    pub size: Vec3,
    pub lifetime: f32,
}

impl SpawnParams {
    /// 从发射器局部空间转换到世界空间
    pub fn relative_to(&self, emitter: &EmitterTransform) -> Self {
        Self {
            position: emitter.transform_point(self.position),
            velocity: emitter.transform_vector(self.velocity),
            rotation: (emitter.rotation * self.rotation).normalize(),
            ..*self
        }
    }
}
