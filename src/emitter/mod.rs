//! 发射器
//!
//! 发射器是发射参数的空间锚点（位置 + 朝向），由承载它的游戏对象拥有；
//! 风暴和行为只持有弱引用。自动瞄准与瞄准偏移属于外部协作者，
//! 通过 [`AutoAim`] / [`AimOffset`] 接入，每帧最多被询问一次。

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// 发射器变换
///
/// 局部前方为 +Z，上方为 +Y。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmitterTransform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for EmitterTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl EmitterTransform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// 位于 `position` 并朝向 `target`；两点重合时保持默认朝向
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let rotation = (target - position)
            .try_normalize()
            .map_or(Quat::IDENTITY, |dir| Quat::from_rotation_arc(Vec3::Z, dir));
        Self { position, rotation }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// 局部坐标点 → 世界坐标
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.rotation * point
    }

    /// 局部方向 → 世界方向
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// 在局部空间叠加一个旋转偏移
    pub fn with_local_rotation(&self, offset: Quat) -> Self {
        Self {
            position: self.position,
            rotation: (self.rotation * offset).normalize(),
        }
    }
}

/// 自动瞄准（外部协作者）
pub trait AutoAim {
    /// 发射开始时立即对准的朝向
    fn aim_on_start(&mut self, _transform: &EmitterTransform) -> Option<Quat> {
        None
    }

    /// 发射过程中每帧跟随目标的新朝向，`None` 表示保持不变
    fn follow(&mut self, transform: &EmitterTransform, dt: f32) -> Option<Quat>;
}

/// 瞄准偏移（外部协作者）
///
/// 返回值是叠加在发射器朝向上的局部旋转。
pub trait AimOffset {
    /// 发射开始时重置，返回初始偏移
    fn reset(&mut self) -> Quat;

    /// 推进 `dt` 秒后的偏移
    fn advance(&mut self, dt: f32) -> Quat;
}

/// 风暴持有的发射器共享句柄
pub type SharedEmitter = Rc<RefCell<Emitter>>;

/// 发射器
pub struct Emitter {
    transform: EmitterTransform,
    auto_aim: Option<Box<dyn AutoAim>>,
    aim_offset: Option<Box<dyn AimOffset>>,
    /// 当前瞄准偏移
    offset: Quat,
    /// 上一次同步的帧号，保证每帧只询问一次协作者
    last_synced_frame: Option<u64>,
}

impl Emitter {
    pub fn new(transform: EmitterTransform) -> Self {
        Self {
            transform,
            auto_aim: None,
            aim_offset: None,
            offset: Quat::IDENTITY,
            last_synced_frame: None,
        }
    }

    pub fn with_auto_aim(mut self, auto_aim: impl AutoAim + 'static) -> Self {
        self.auto_aim = Some(Box::new(auto_aim));
        self
    }

    pub fn with_aim_offset(mut self, aim_offset: impl AimOffset + 'static) -> Self {
        self.aim_offset = Some(Box::new(aim_offset));
        self
    }

    /// 包装为共享句柄
    pub fn into_shared(self) -> SharedEmitter {
        Rc::new(RefCell::new(self))
    }

    pub fn transform(&self) -> EmitterTransform {
        self.transform
    }

    pub fn set_transform(&mut self, transform: EmitterTransform) {
        self.transform = transform;
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    pub fn aim_offset(&self) -> Quat {
        self.offset
    }

    /// 实际用于发射的变换：基础变换叠加瞄准偏移
    pub fn emission_transform(&self) -> EmitterTransform {
        self.transform.with_local_rotation(self.offset)
    }

    /// 发射开始：重置瞄准偏移，并按需立即对准目标
    pub fn reset_aim(&mut self) {
        self.offset = self
            .aim_offset
            .as_mut()
            .map_or(Quat::IDENTITY, |offset| offset.reset());
        if let Some(auto_aim) = self.auto_aim.as_mut() {
            if let Some(rotation) = auto_aim.aim_on_start(&self.transform) {
                self.transform.rotation = rotation;
            }
        }
        self.last_synced_frame = None;
    }

    /// 每帧同步一次协作者，同一帧重复调用返回 `false`
    pub fn sync(&mut self, frame: u64, dt: f32) -> bool {
        if self.last_synced_frame == Some(frame) {
            return false;
        }
        self.last_synced_frame = Some(frame);

        if let Some(auto_aim) = self.auto_aim.as_mut() {
            if let Some(rotation) = auto_aim.follow(&self.transform, dt) {
                self.transform.rotation = rotation;
            }
        }
        if let Some(aim_offset) = self.aim_offset.as_mut() {
            self.offset = aim_offset.advance(dt);
        }
        true
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(EmitterTransform::IDENTITY)
    }
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("transform", &self.transform)
            .field("auto_aim", &self.auto_aim.is_some())
            .field("aim_offset", &self.aim_offset.is_some())
            .field("offset", &self.offset)
            .finish()
    }
}
