//! 宿主粒子基底接口
//!
//! 真正推进粒子物理并负责绘制的是宿主（引擎的粒子系统、GPU 模拟等）。
//! 核心只通过 [`ParticleSubstrate`] 读取 / 回写存活粒子、发射新粒子，
//! 容量与模拟空间均由基底报告，核心不自行计算。

use crate::emission::SpawnParams;
use crate::particles::gradient::ColorGradient;
use crate::particles::record::ParticleRecord;
use std::cell::RefCell;
use std::rc::Rc;

/// 粒子模拟空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulationSpace {
    /// 粒子发射后不再跟随发射器移动
    #[default]
    World,
    /// 粒子坐标相对基底自身
    Local,
}

/// 碰撞设置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionSettings {
    pub enabled: bool,
    /// 碰撞后立即销毁粒子
    pub kill_on_collision: bool,
}

/// 由配置模块生成、下发给基底的设置
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubstrateSettings {
    pub collision: CollisionSettings,
    pub color_over_lifetime: Option<ColorGradient>,
}

/// 宿主粒子基底
pub trait ParticleSubstrate {
    /// 基底报告的最大粒子数
    fn capacity(&self) -> usize;

    /// 当前存活粒子数
    fn live_count(&self) -> usize;

    /// 模拟空间
    fn simulation_space(&self) -> SimulationSpace {
        SimulationSpace::World
    }

    /// 把存活粒子复制到 `out`，返回复制的数量（不超过 `out.len()`）
    fn read_live(&self, out: &mut [ParticleRecord]) -> usize;

    /// 用 `records` 覆盖存活粒子
    fn write_back(&mut self, records: &[ParticleRecord]);

    /// 发射一个粒子，容量已满时返回 `false`
    fn spawn(&mut self, params: &SpawnParams) -> bool;

    /// 应用配置模块产生的设置
    fn configure(&mut self, _settings: &SubstrateSettings) {}

    /// 子弹系统销毁时释放宿主资源
    fn teardown(&mut self) {}
}

/// 宿主同时持有基底句柄时使用（例如由宿主自行推进模拟）
impl<S: ParticleSubstrate + ?Sized> ParticleSubstrate for Rc<RefCell<S>> {
    fn capacity(&self) -> usize {
        self.borrow().capacity()
    }

    fn live_count(&self) -> usize {
        self.borrow().live_count()
    }

    fn simulation_space(&self) -> SimulationSpace {
        self.borrow().simulation_space()
    }

    fn read_live(&self, out: &mut [ParticleRecord]) -> usize {
        self.borrow().read_live(out)
    }

    fn write_back(&mut self, records: &[ParticleRecord]) {
        self.borrow_mut().write_back(records);
    }

    fn spawn(&mut self, params: &SpawnParams) -> bool {
        self.borrow_mut().spawn(params)
    }

    fn configure(&mut self, settings: &SubstrateSettings) {
        self.borrow_mut().configure(settings);
    }

    fn teardown(&mut self) {
        self.borrow_mut().teardown();
    }
}
