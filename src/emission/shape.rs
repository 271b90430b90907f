//! 发射形状
//!
//! 纯几何生成器：给定形状参数和数量，惰性地产生一组 [`EmitParam`]。
//! 相同输入总是得到相同序列；需要随机扰动时由调用方注入随机源
//! （[`EmissionShape::generate_with_rng`]），不使用任何全局随机状态。
//!
//! 坐标约定：发射器局部空间，正前方 +Z，上方 +Y。

use crate::core::error::{ShapeError, ShapeResult};
use crate::emission::param::EmitParam;
use glam::{EulerRot, Quat, Vec3, Vec4};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

/// 黄金角（弧度），用于球面均匀分布
const GOLDEN_ANGLE: f32 = 2.399_963_1;

/// 形状图案
///
/// 所有角度以度为单位。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeKind {
    /// 全部从原点沿正前方发射
    Point { speed: f32 },
    /// 水平扇形：在 XZ 平面内以正前方为中心展开 `angle` 度，出生点距原点 `radius`
    Fan { angle: f32, speed: f32, radius: f32 },
    /// 圆锥：方向均匀分布在顶角为 `angle` 度（至多 180）的锥面上，出生点位于半径 `radius` 的底圆
    Cone { angle: f32, speed: f32, radius: f32 },
    /// 圆环：出生点位于垂直于正前方、半径为 `radius` 的圆上，沿径向飞出
    Ring { radius: f32, speed: f32 },
    /// 球面：方向按 Fibonacci 球面均匀分布
    Sphere { radius: f32, speed: f32 },
    /// 直线：沿局部 X 轴排成长度为 `length` 的一排，向正前方发射
    Line { length: f32, speed: f32 },
    /// 自定义参数列表，数量超过列表长度时循环
    Custom { params: Vec<EmitParam> },
}

impl ShapeKind {
    fn validate(&self) -> ShapeResult<()> {
        match self {
            Self::Point { speed } => non_negative("speed", *speed),
            Self::Fan { angle, speed, radius } => {
                angle_in_range(*angle, 360.0)?;
                non_negative("speed", *speed)?;
                non_negative("radius", *radius)
            }
            // 顶角超过 180 度时锥面会翻转朝后
            Self::Cone { angle, speed, radius } => {
                angle_in_range(*angle, 180.0)?;
                non_negative("speed", *speed)?;
                non_negative("radius", *radius)
            }
            Self::Ring { radius, speed } | Self::Sphere { radius, speed } => {
                non_negative("radius", *radius)?;
                non_negative("speed", *speed)
            }
            Self::Line { length, speed } => {
                non_negative("length", *length)?;
                non_negative("speed", *speed)
            }
            Self::Custom { params } if params.is_empty() => Err(ShapeError::EmptyCustom),
            Self::Custom { .. } => Ok(()),
        }
    }

    /// 第 `index` 个（共 `count` 个）参数
    fn param_at(&self, index: usize, count: usize) -> EmitParam {
        let i = index as f32;
        let n = count.max(1) as f32;

        let (position, direction, speed) = match *self {
            Self::Point { speed } => (Vec3::ZERO, Vec3::Z, speed),
            Self::Fan { angle, speed, radius } => {
                let yaw = if count <= 1 || angle == 0.0 {
                    0.0
                } else if angle >= 360.0 {
                    TAU * i / n
                } else {
                    let spread = angle.to_radians();
                    -spread * 0.5 + spread * i / (n - 1.0)
                };
                let dir = Vec3::new(yaw.sin(), 0.0, yaw.cos());
                (dir * radius, dir, speed)
            }
            Self::Cone { angle, speed, radius } => {
                let half = angle.to_radians() * 0.5;
                let azimuth = TAU * i / n;
                let (sin_az, cos_az) = azimuth.sin_cos();
                let dir = Vec3::new(half.sin() * cos_az, half.sin() * sin_az, half.cos());
                (Vec3::new(cos_az, sin_az, 0.0) * radius, dir, speed)
            }
            Self::Ring { radius, speed } => {
                if radius <= 0.0 {
                    (Vec3::ZERO, Vec3::Z, speed)
                } else {
                    let (sin_az, cos_az) = (TAU * i / n).sin_cos();
                    let outward = Vec3::new(cos_az, sin_az, 0.0);
                    (outward * radius, outward, speed)
                }
            }
            Self::Sphere { radius, speed } => {
                let dir = if count <= 1 {
                    Vec3::Z
                } else {
                    let z = 1.0 - 2.0 * (i + 0.5) / n;
                    let ring = (1.0 - z * z).max(0.0).sqrt();
                    let (sin_t, cos_t) = (GOLDEN_ANGLE * i).sin_cos();
                    Vec3::new(ring * cos_t, ring * sin_t, z)
                };
                (dir * radius, dir, speed)
            }
            Self::Line { length, speed } => {
                let x = if count <= 1 {
                    0.0
                } else {
                    -length * 0.5 + length * i / (n - 1.0)
                };
                (Vec3::new(x, 0.0, 0.0), Vec3::Z, speed)
            }
            Self::Custom { ref params } => return params[index % params.len()],
        };

        EmitParam::new()
            .with_position(position)
            .with_velocity(direction * speed)
    }
}

fn non_negative(name: &'static str, value: f32) -> ShapeResult<()> {
    if !value.is_finite() {
        return Err(ShapeError::NonFinite { name, value });
    }
    if value < 0.0 {
        return Err(ShapeError::Negative { name, value });
    }
    Ok(())
}

fn angle_in_range(angle: f32, max: f32) -> ShapeResult<()> {
    if !angle.is_finite() {
        return Err(ShapeError::NonFinite {
            name: "angle",
            value: angle,
        });
    }
    if !(0.0..=max).contains(&angle) {
        return Err(ShapeError::AngleOutOfRange { angle, max });
    }
    Ok(())
}

/// 随机扰动
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeJitter {
    /// 速度相对抖动幅度（0.1 表示 ±10%）
    pub speed: f32,
    /// 方向抖动角度（度）
    pub angle: f32,
}

impl ShapeJitter {
    pub fn is_zero(&self) -> bool {
        self.speed <= 0.0 && self.angle <= 0.0
    }

    fn apply<R: Rng + ?Sized>(&self, param: EmitParam, rng: &mut R) -> EmitParam {
        let Some(mut velocity) = param.velocity else {
            return param;
        };
        if self.angle > 0.0 {
            let max = self.angle.to_radians();
            let yaw = rng.gen_range(-max..=max);
            let pitch = rng.gen_range(-max..=max);
            velocity = Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0) * velocity;
        }
        if self.speed > 0.0 {
            velocity *= 1.0 + rng.gen_range(-self.speed..=self.speed);
        }
        param.with_velocity(velocity)
    }
}

/// 发射形状
///
/// 构造时完成参数校验，之后的生成过程不会失败。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ShapeDef")]
pub struct EmissionShape {
    pattern: ShapeKind,
    /// 每个发射周期默认生成的数量
    count: usize,
    color: Option<Vec4>,
    size: Option<Vec3>,
    jitter: ShapeJitter,
}

/// 反序列化的中间表示，经校验后转换为 [`EmissionShape`]
#[derive(Deserialize)]
struct ShapeDef {
    pattern: ShapeKind,
    count: usize,
    #[serde(default)]
    color: Option<Vec4>,
    #[serde(default)]
    size: Option<Vec3>,
    #[serde(default)]
    jitter: ShapeJitter,
}

impl TryFrom<ShapeDef> for EmissionShape {
    type Error = ShapeError;

    fn try_from(def: ShapeDef) -> ShapeResult<Self> {
        let shape = Self::new(def.pattern, def.count)?;
        Ok(Self {
            color: def.color,
            size: def.size,
            jitter: clamp_jitter(def.jitter),
            ..shape
        })
    }
}

fn clamp_jitter(jitter: ShapeJitter) -> ShapeJitter {
    ShapeJitter {
        speed: jitter.speed.max(0.0),
        angle: jitter.angle.clamp(0.0, 180.0),
    }
}

impl EmissionShape {
    pub fn new(pattern: ShapeKind, count: usize) -> ShapeResult<Self> {
        pattern.validate()?;
        Ok(Self {
            pattern,
            count,
            color: None,
            size: None,
            jitter: ShapeJitter::default(),
        })
    }

    pub fn point(count: usize, speed: f32) -> ShapeResult<Self> {
        Self::new(ShapeKind::Point { speed }, count)
    }

    pub fn fan(count: usize, speed: f32, angle: f32, radius: f32) -> ShapeResult<Self> {
        Self::new(ShapeKind::Fan { angle, speed, radius }, count)
    }

    pub fn cone(count: usize, speed: f32, angle: f32, radius: f32) -> ShapeResult<Self> {
        Self::new(ShapeKind::Cone { angle, speed, radius }, count)
    }

    pub fn ring(count: usize, speed: f32, radius: f32) -> ShapeResult<Self> {
        Self::new(ShapeKind::Ring { radius, speed }, count)
    }

    pub fn sphere(count: usize, speed: f32, radius: f32) -> ShapeResult<Self> {
        Self::new(ShapeKind::Sphere { radius, speed }, count)
    }

    pub fn line(count: usize, speed: f32, length: f32) -> ShapeResult<Self> {
        Self::new(ShapeKind::Line { length, speed }, count)
    }

    /// 自定义列表，默认数量为列表长度
    pub fn custom(params: Vec<EmitParam>) -> ShapeResult<Self> {
        let count = params.len();
        Self::new(ShapeKind::Custom { params }, count)
    }

    /// 为未指定颜色的参数设置颜色
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = Some(color);
        self
    }

    /// 为未指定尺寸的参数设置尺寸
    pub fn with_size(mut self, size: Vec3) -> Self {
        self.size = Some(size);
        self
    }

    /// 负值视为 0，角度上限 180 度
    pub fn with_jitter(mut self, jitter: ShapeJitter) -> Self {
        self.jitter = clamp_jitter(jitter);
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn pattern(&self) -> &ShapeKind {
        &self.pattern
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn jitter(&self) -> ShapeJitter {
        self.jitter
    }

    /// 确定性地生成 `count` 个参数（忽略随机扰动）
    pub fn generate(&self, count: usize) -> ShapeIter<'_> {
        ShapeIter {
            shape: self,
            index: 0,
            count,
        }
    }

    /// 生成一个周期的默认数量
    pub fn batch(&self) -> ShapeIter<'_> {
        self.generate(self.count)
    }

    /// 生成 `count` 个参数，并用注入的随机源施加扰动
    pub fn generate_with_rng<'a, R: Rng + ?Sized>(
        &'a self,
        count: usize,
        rng: &'a mut R,
    ) -> impl Iterator<Item = EmitParam> + 'a {
        let jitter = self.jitter;
        self.generate(count).map(move |param| {
            if jitter.is_zero() {
                param
            } else {
                jitter.apply(param, rng)
            }
        })
    }

    fn decorate(&self, param: EmitParam) -> EmitParam {
        param.or(EmitParam {
            color: self.color,
            size: self.size,
            ..EmitParam::default()
        })
    }
}

/// 惰性参数序列
#[derive(Debug, Clone)]
pub struct ShapeIter<'a> {
    shape: &'a EmissionShape,
    index: usize,
    count: usize,
}

impl Iterator for ShapeIter<'_> {
    type Item = EmitParam;

    fn next(&mut self) -> Option<EmitParam> {
        if self.index >= self.count {
            return None;
        }
        let param = self.shape.pattern.param_at(self.index, self.count);
        self.index += 1;
        Some(self.shape.decorate(param))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ShapeIter<'_> {}
