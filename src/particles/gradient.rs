//! 颜色渐变

use glam::Vec4;
use serde::{Deserialize, Serialize};

/// 颜色停止点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// 时间点（0-1）
    pub time: f32,
    /// 颜色
    pub color: Vec4,
}

/// 颜色渐变（随生命周期变色）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorGradient {
    /// 颜色停止点（按时间排序）
    stops: Vec<ColorStop>,
}

impl ColorGradient {
    pub fn new() -> Self {
        Self { stops: Vec::new() }
    }

    pub fn add_stop(mut self, time: f32, color: Vec4) -> Self {
        self.stops.push(ColorStop {
            time: time.clamp(0.0, 1.0),
            color,
        });
        self.stops.sort_by(|a, b| a.time.total_cmp(&b.time));
        self
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// 采样颜色
    pub fn sample(&self, t: f32) -> Vec4 {
        let (first, last) = match (self.stops.first(), self.stops.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Vec4::ONE,
        };

        let t = t.clamp(0.0, 1.0);
        if t <= first.time {
            return first.color;
        }

        for pair in self.stops.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if t >= a.time && t <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.color;
                }
                return a.color.lerp(b.color, (t - a.time) / span);
            }
        }

        last.color
    }
}

impl Default for ColorGradient {
    fn default() -> Self {
        Self::new()
            .add_stop(0.0, Vec4::new(1.0, 1.0, 1.0, 1.0))
            .add_stop(1.0, Vec4::new(1.0, 1.0, 1.0, 0.0))
    }
}
