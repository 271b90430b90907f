//! 粒子状态层
//!
//! ## 架构设计
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BatchUpdateEngine                     │
//! │   update(fn, parallel)  ──►  ParticleBuffer (snapshot)   │
//! │                               │ pull (1x/tick)  ▲ flush  │
//! ├───────────────────────────────┼─────────────────┼────────┤
//! │                   ParticleSubstrate (host)                │
//! │   read_live / write_back / spawn / live_count            │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod batch;
pub mod buffer;
pub mod gradient;
pub mod record;
pub mod simulated;
pub mod substrate;

pub use batch::{BatchStats, BatchUpdateEngine};
pub use buffer::{BufferState, ParticleBuffer};
pub use gradient::{ColorGradient, ColorStop};
pub use record::ParticleRecord;
pub use simulated::SimulatedSubstrate;
pub use substrate::{CollisionSettings, ParticleSubstrate, SimulationSpace, SubstrateSettings};
