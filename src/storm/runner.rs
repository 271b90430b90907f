//! 风暴驱动器
//!
//! 宿主帧循环只需持有一个 [`StormRunner`]：每次脉冲先推进所有风暴（发射），
//! 再推进所有登记的子弹系统（更新事件 + 回写 + 销毁检查），
//! 最后清理已结束的风暴与已销毁的子弹系统。

use crate::bullet::SharedBulletSystem;
use crate::core::error::{StormError, StormResult};
use crate::core::task::TaskStatus;
use crate::storm::storm::Storm;
use std::collections::BTreeMap;
use std::fmt;

/// 风暴句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StormId(u64);

impl StormId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 风暴驱动器
#[derive(Default)]
pub struct StormRunner {
    next_id: u64,
    /// 宿主帧号，所有风暴共用
    frame: u64,
    /// 按创建顺序排列
    storms: BTreeMap<StormId, Storm>,
    systems: Vec<SharedBulletSystem>,
}

impl StormRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 托管一个风暴（不启动）
    pub fn add_storm(&mut self, storm: Storm) -> StormId {
        self.next_id += 1;
        let id = StormId(self.next_id);
        self.storms.insert(id, storm);
        id
    }

    /// 托管并立即启动
    pub fn launch(&mut self, mut storm: Storm) -> StormId {
        storm.start();
        self.add_storm(storm)
    }

    /// 登记子弹系统，由驱动器负责推进其脉冲
    pub fn register_system(&mut self, system: SharedBulletSystem) {
        if !self.systems.iter().any(|s| std::rc::Rc::ptr_eq(s, &system)) {
            self.systems.push(system);
        }
    }

    pub fn storm(&self, id: StormId) -> Option<&Storm> {
        self.storms.get(&id)
    }

    pub fn storm_mut(&mut self, id: StormId) -> Option<&mut Storm> {
        self.storms.get_mut(&id)
    }

    /// 已推进的帧脉冲次数
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn storm_count(&self) -> usize {
        self.storms.len()
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// 没有任何风暴和子弹系统
    pub fn is_idle(&self) -> bool {
        self.storms.is_empty() && self.systems.is_empty()
    }

    pub fn start(&mut self, id: StormId) -> StormResult<bool> {
        Ok(self.get_mut(id)?.start())
    }

    pub fn pause(&mut self, id: StormId) -> StormResult<bool> {
        Ok(self.get_mut(id)?.pause())
    }

    pub fn resume(&mut self, id: StormId) -> StormResult<bool> {
        Ok(self.get_mut(id)?.resume())
    }

    /// 取消风暴，随后的脉冲会将其清理
    pub fn cancel(&mut self, id: StormId) -> StormResult<bool> {
        Ok(self.get_mut(id)?.cancel())
    }

    fn get_mut(&mut self, id: StormId) -> StormResult<&mut Storm> {
        self.storms.get_mut(&id).ok_or(StormError::UnknownStorm(id.raw()))
    }

    /// 每帧脉冲
    pub fn tick(&mut self, dt: f32) {
        self.frame += 1;
        for storm in self.storms.values_mut() {
            storm.tick_frame(self.frame, dt);
        }
        for system in &self.systems {
            match system.try_borrow_mut() {
                Ok(mut system) => system.tick(dt),
                Err(_) => tracing::warn!(target: "storm", "Bullet system is busy, skipping tick"),
            }
        }
        self.prune();
    }

    /// 固定步长脉冲
    pub fn fixed_tick(&mut self, dt: f32) {
        for storm in self.storms.values_mut() {
            storm.fixed_tick(dt);
        }
        for system in &self.systems {
            match system.try_borrow_mut() {
                Ok(mut system) => system.fixed_tick(dt),
                Err(_) => tracing::warn!(target: "storm", "Bullet system is busy, skipping fixed tick"),
            }
        }
        self.prune();
    }

    fn prune(&mut self) {
        self.storms.retain(|id, storm| {
            let done = matches!(storm.status(), TaskStatus::Finished | TaskStatus::Cancelled);
            if done {
                tracing::debug!(target: "storm", %id, storm = storm.name(), status = %storm.status(), "Removing storm");
            }
            !done
        });
        self.systems.retain(|system| {
            system
                .try_borrow()
                .map_or(true, |system| !system.is_destroyed())
        });
    }
}

impl fmt::Debug for StormRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StormRunner")
            .field("frame", &self.frame)
            .field("storms", &self.storms)
            .field("systems", &self.systems.len())
            .finish()
    }
}
