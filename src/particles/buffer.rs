//! 粒子缓冲区
//!
//! 缓存宿主基底的存活粒子快照。快照只在一次脉冲内有效：
//! 第一次读取时从基底拉取（之后同一脉冲内复用），修改后标记为脏，
//! 脉冲结束时统一回写一次并失效。

use crate::particles::record::ParticleRecord;
use crate::particles::substrate::ParticleSubstrate;

/// 快照状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// 没有本脉冲的快照
    Stale,
    /// 快照与基底一致
    Fresh,
    /// 快照已被修改，等待回写
    Dirty,
}

/// 与宿主基底同步的定长粒子数组
#[derive(Debug)]
pub struct ParticleBuffer {
    /// 长度即当前容量，只有前 `live` 个有效
    records: Vec<ParticleRecord>,
    live: usize,
    state: BufferState,
}

impl ParticleBuffer {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            live: 0,
            state: BufferState::Stale,
        }
    }

    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn is_dirty(&self) -> bool {
        self.state == BufferState::Dirty
    }

    /// 确保持有本脉冲的快照，返回存活数
    ///
    /// 容量按基底报告的最大值增长，运行期间不收缩。
    pub fn pull(&mut self, substrate: &dyn ParticleSubstrate) -> usize {
        if self.state != BufferState::Stale {
            return self.live;
        }

        let capacity = substrate.capacity();
        if self.records.len() < capacity {
            self.records.resize(capacity, ParticleRecord::default());
        }
        self.live = substrate.read_live(&mut self.records).min(self.records.len());
        self.state = BufferState::Fresh;
        self.live
    }

    /// 本脉冲快照（未拉取时为 `None`）
    pub fn snapshot(&self) -> Option<&[ParticleRecord]> {
        match self.state {
            BufferState::Stale => None,
            BufferState::Fresh | BufferState::Dirty => Some(&self.records[..self.live]),
        }
    }

    /// 可写的存活切片，调用即标记为脏
    ///
    /// 必须先 [`pull`](Self::pull)；未拉取时返回空切片。
    pub fn live_mut(&mut self) -> &mut [ParticleRecord] {
        if self.state == BufferState::Stale {
            return &mut [];
        }
        self.state = BufferState::Dirty;
        &mut self.records[..self.live]
    }

    /// 如有修改则回写基底，返回是否发生了回写
    pub fn flush(&mut self, substrate: &mut dyn ParticleSubstrate) -> bool {
        if self.state != BufferState::Dirty {
            return false;
        }
        substrate.write_back(&self.records[..self.live]);
        self.state = BufferState::Fresh;
        true
    }

    /// 脉冲边界：丢弃快照
    pub fn invalidate(&mut self) {
        self.state = BufferState::Stale;
        self.live = 0;
    }
}

impl Default for ParticleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
