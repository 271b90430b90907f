//! 子弹配置模块
//!
//! 每个模块都是纯函数 `(module, settings) -> settings`，仅在 `enabled` 时生效；
//! [`BulletPrefab`] 按声明顺序依次应用模块，得到子弹系统的最终设置。
//! 具名事件在应用时解析，找不到的名称只记录警告并禁用对应功能。

use crate::bullet::events::{CollisionEvent, EmissionEvent, EventRegistries, UpdateEvent};
use crate::config::{BulletDefaults, StormConfig};
use crate::particles::{CollisionSettings, ColorGradient, SubstrateSettings};
use serde::{Deserialize, Serialize};

/// 模块应用后的子弹系统设置
#[derive(Debug, Clone, Default)]
pub struct BulletSettings {
    /// 发射参数缺省时使用的默认值
    pub defaults: BulletDefaults,
    /// 下发给宿主基底的设置
    pub substrate: SubstrateSettings,
    pub update_event: Option<UpdateEvent>,
    pub collision_event: Option<CollisionEvent>,
    pub emission_event: Option<EmissionEvent>,
}

impl BulletSettings {
    /// 以全局配置中的子弹默认值为起点
    pub fn from_config(config: &StormConfig) -> Self {
        Self {
            defaults: config.bullets.clone(),
            ..Default::default()
        }
    }
}

/// 配置模块
pub trait BulletModule {
    fn enabled(&self) -> bool;

    /// 启用时的变换
    fn apply_enabled(&self, settings: BulletSettings, registries: &EventRegistries) -> BulletSettings;

    /// 禁用时的变换，默认保持不变
    fn apply_disabled(&self, settings: BulletSettings) -> BulletSettings {
        settings
    }

    fn apply(&self, settings: BulletSettings, registries: &EventRegistries) -> BulletSettings {
        if self.enabled() {
            self.apply_enabled(settings, registries)
        } else {
            self.apply_disabled(settings)
        }
    }
}

/// 覆盖发射默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsModule {
    pub enabled: bool,
    pub defaults: BulletDefaults,
}

crate::impl_default!(DefaultsModule {
    enabled: true,
    defaults: BulletDefaults::default(),
});

impl BulletModule for DefaultsModule {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply_enabled(&self, mut settings: BulletSettings, _registries: &EventRegistries) -> BulletSettings {
        settings.defaults = self.defaults.clone();
        settings
    }
}

/// 碰撞模块
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionModule {
    pub enabled: bool,
    /// 碰撞后销毁粒子
    pub kill: bool,
    /// 碰撞事件名称
    pub collision_event: String,
}

impl BulletModule for CollisionModule {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply_enabled(&self, mut settings: BulletSettings, registries: &EventRegistries) -> BulletSettings {
        settings.substrate.collision = CollisionSettings {
            enabled: true,
            kill_on_collision: self.kill,
        };
        settings.collision_event = registries.collision.lookup(&self.collision_event);
        settings
    }

    fn apply_disabled(&self, mut settings: BulletSettings) -> BulletSettings {
        settings.substrate.collision = CollisionSettings::default();
        settings.collision_event = None;
        settings
    }
}

/// 生命周期颜色模块
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorOverLifetimeModule {
    pub enabled: bool,
    pub gradient: ColorGradient,
}

impl BulletModule for ColorOverLifetimeModule {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply_enabled(&self, mut settings: BulletSettings, _registries: &EventRegistries) -> BulletSettings {
        settings.substrate.color_over_lifetime = Some(self.gradient.clone());
        settings
    }

    fn apply_disabled(&self, mut settings: BulletSettings) -> BulletSettings {
        settings.substrate.color_over_lifetime = None;
        settings
    }
}

/// 更新事件模块
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateModule {
    pub enabled: bool,
    pub update_event: String,
}

impl BulletModule for UpdateModule {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply_enabled(&self, mut settings: BulletSettings, registries: &EventRegistries) -> BulletSettings {
        settings.update_event = registries.update.lookup(&self.update_event);
        settings
    }

    fn apply_disabled(&self, mut settings: BulletSettings) -> BulletSettings {
        settings.update_event = None;
        settings
    }
}

/// 发射事件模块
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmissionModule {
    pub enabled: bool,
    pub emission_event: String,
}

impl BulletModule for EmissionModule {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn apply_enabled(&self, mut settings: BulletSettings, registries: &EventRegistries) -> BulletSettings {
        settings.emission_event = registries.emission.lookup(&self.emission_event);
        settings
    }

    fn apply_disabled(&self, mut settings: BulletSettings) -> BulletSettings {
        settings.emission_event = None;
        settings
    }
}

/// 可序列化的模块配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum ModuleConfig {
    Defaults(DefaultsModule),
    Collision(CollisionModule),
    ColorOverLifetime(ColorOverLifetimeModule),
    Update(UpdateModule),
    Emission(EmissionModule),
}

impl ModuleConfig {
    fn as_module(&self) -> &dyn BulletModule {
        match self {
            ModuleConfig::Defaults(m) => m,
            ModuleConfig::Collision(m) => m,
            ModuleConfig::ColorOverLifetime(m) => m,
            ModuleConfig::Update(m) => m,
            ModuleConfig::Emission(m) => m,
        }
    }
}

impl BulletModule for ModuleConfig {
    fn enabled(&self) -> bool {
        self.as_module().enabled()
    }

    fn apply_enabled(&self, settings: BulletSettings, registries: &EventRegistries) -> BulletSettings {
        self.as_module().apply_enabled(settings, registries)
    }

    fn apply_disabled(&self, settings: BulletSettings) -> BulletSettings {
        self.as_module().apply_disabled(settings)
    }
}

/// 子弹预制：名称 + 有序模块列表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletPrefab {
    pub name: String,
    pub modules: Vec<ModuleConfig>,
}

impl BulletPrefab {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
        }
    }

    pub fn with_module(mut self, module: ModuleConfig) -> Self {
        self.modules.push(module);
        self
    }

    /// 从 `base` 开始依次应用所有模块
    pub fn build(&self, base: BulletSettings, registries: &EventRegistries) -> BulletSettings {
        self.modules
            .iter()
            .fold(base, |settings, module| module.apply(settings, registries))
    }
}
