use super::{ConfigError, ConfigResult};
use crate::impl_default;
use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// 子弹系统级默认值
///
/// 发射参数中未设置的字段使用这里的值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletDefaults {
    /// 默认颜色（RGBA）
    pub color: Vec4,

    /// 默认尺寸
    pub size: Vec3,

    /// 默认速度（发射器局部空间）
    pub velocity: Vec3,

    /// 粒子生命周期（秒）
    pub lifetime: f32,

    /// 速度改变时同步旋转朝向（网格子弹）
    pub align_rotation_to_velocity: bool,
}

impl_default!(BulletDefaults {
    color: Vec4::ONE,
    size: Vec3::ONE,
    velocity: Vec3::Z,
    lifetime: 5.0,
    align_rotation_to_velocity: false,
});

impl BulletDefaults {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.lifetime.is_finite() && self.lifetime > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "bullets.lifetime must be positive, got {}",
                self.lifetime
            )));
        }
        if !self.size.is_finite() || !self.color.is_finite() || !self.velocity.is_finite() {
            return Err(ConfigError::ValidationError(
                "bullets defaults must be finite".to_string(),
            ));
        }
        Ok(())
    }
}
