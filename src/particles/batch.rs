//! 批量粒子状态更新引擎
//!
//! 对存活粒子逐个应用纯函数 `record -> record'`，可顺序执行，也可在多个工作线程上
//! 对互不重叠的切片并行执行。并行模式要求变换函数没有跨粒子的副作用；
//! 违反这一约定属于调用方的未定义行为，引擎不做检测。
//!
//! 同一脉冲内的多次更新共享一次拉取、一次回写：
//!
//! ```text
//!  pull (memoized) ──► update ──► update ──► end_tick: flush + invalidate
//! ```

use crate::config::BatchConfig;
use crate::particles::buffer::ParticleBuffer;
use crate::particles::record::ParticleRecord;
use crate::particles::substrate::ParticleSubstrate;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// 批量处理统计信息
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchStats {
    /// 最近一次更新处理的粒子数
    pub elements_processed: usize,
    /// 最近一次更新耗时（微秒）
    pub processing_time_us: u64,
    /// 最近一次更新是否并行执行
    pub parallel: bool,
    /// 累计回写次数
    pub write_backs: u64,
}

impl BatchStats {
    /// 计算吞吐量（粒子/秒）
    pub fn throughput(&self) -> f64 {
        if self.processing_time_us == 0 {
            return 0.0;
        }
        (self.elements_processed as f64) / (self.processing_time_us as f64 / 1_000_000.0)
    }
}

/// 批量更新引擎
pub struct BatchUpdateEngine {
    buffer: ParticleBuffer,
    config: BatchConfig,
    /// 配置了固定线程数时使用的专用线程池，否则使用 rayon 全局池
    pool: Option<Arc<rayon::ThreadPool>>,
    stats: BatchStats,
}

impl BatchUpdateEngine {
    pub fn new(config: BatchConfig) -> Self {
        let pool = if config.num_threads == 0 {
            None
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(config.get_num_threads())
                .build()
            {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    tracing::warn!(target: "bullet", error = %e, "Falling back to the global rayon pool");
                    None
                }
            }
        };

        Self {
            buffer: ParticleBuffer::new(),
            config,
            pool,
            stats: BatchStats::default(),
        }
    }

    /// 为副本系统创建引擎：共享线程池，缓冲区独立
    pub fn fork(&self) -> Self {
        Self {
            buffer: ParticleBuffer::new(),
            config: self.config.clone(),
            pool: self.pool.clone(),
            stats: BatchStats::default(),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    pub fn buffer(&self) -> &ParticleBuffer {
        &self.buffer
    }

    /// 本脉冲的只读快照（必要时从基底拉取）
    pub fn snapshot(&mut self, substrate: &dyn ParticleSubstrate) -> &[ParticleRecord] {
        self.buffer.pull(substrate);
        self.buffer.snapshot().unwrap_or(&[])
    }

    /// 对每个存活粒子应用 `transform`，返回处理的粒子数
    ///
    /// `parallel` 为真且粒子数达到 `min_parallel_len` 时并行执行，
    /// 结果与顺序执行相同（前提是 `transform` 为纯函数）。
    pub fn update<F>(
        &mut self,
        substrate: &dyn ParticleSubstrate,
        transform: F,
        parallel: bool,
    ) -> usize
    where
        F: Fn(ParticleRecord) -> ParticleRecord + Send + Sync,
    {
        let start = Instant::now();
        self.buffer.pull(substrate);

        let min_len = self.config.chunk_size.max(1);
        let use_parallel = parallel && self.buffer.snapshot().map_or(0, <[_]>::len) >= self.config.min_parallel_len;
        let records = self.buffer.live_mut();
        let count = records.len();

        if use_parallel {
            let run = |records: &mut [ParticleRecord]| {
                records
                    .par_iter_mut()
                    .with_min_len(min_len)
                    .for_each(|record| *record = transform(*record));
            };
            match &self.pool {
                Some(pool) => pool.install(|| run(records)),
                None => run(records),
            }
        } else {
            for record in records.iter_mut() {
                *record = transform(*record);
            }
        }

        self.stats.elements_processed = count;
        self.stats.processing_time_us = start.elapsed().as_micros() as u64;
        self.stats.parallel = use_parallel;
        count
    }

    /// 脉冲结束：如有修改则回写一次，然后失效快照
    pub fn end_tick(&mut self, substrate: &mut dyn ParticleSubstrate) -> bool {
        let flushed = self.buffer.flush(substrate);
        if flushed {
            self.stats.write_backs += 1;
            tracing::trace!(
                target: "bullet",
                particles = self.stats.elements_processed,
                "Flushed particle buffer"
            );
        }
        self.buffer.invalidate();
        flushed
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::particles::simulated::SimulatedSubstrate;
    use glam::Vec3;
    use proptest::prelude::*;

    fn swirl(mut r: ParticleRecord) -> ParticleRecord {
        r.velocity = Vec3::new(-r.velocity.z, r.velocity.y * 0.5, r.velocity.x) + r.position * 0.1;
        r.position += r.velocity * 0.016;
        r.age += 0.016;
        r
    }

    proptest! {
        #[test]
        fn parallel_matches_sequential(
            seeds in prop::collection::vec((-100.0f32..100.0, -10.0f32..10.0), 0..300)
        ) {
            let mut substrate = SimulatedSubstrate::new(seeds.len().max(1));
            for (p, v) in &seeds {
                substrate.insert(ParticleRecord {
                    position: Vec3::new(*p, -*p, *v),
                    velocity: Vec3::new(*v, *p * 0.5, -*v),
                    ..Default::default()
                });
            }
            let config = BatchConfig { min_parallel_len: 0, chunk_size: 7, ..Default::default() };

            let mut sequential = BatchUpdateEngine::new(config.clone());
            sequential.update(&substrate, swirl, false);
            let expected = sequential.snapshot(&substrate).to_vec();

            let mut parallel = BatchUpdateEngine::new(config);
            parallel.update(&substrate, swirl, true);
            let actual = parallel.snapshot(&substrate).to_vec();

            prop_assert_eq!(expected, actual);
        }
    }
}
