//! 风暴：定时发射行为的组合
//!
//! ```text
//!  StormRunner ──tick──► Storm ──(按时钟)──► StormBehavior ──emit──► BulletSystem
//!       │                                                              ▲
//!       └──────────────────────────tick───────────────────────────────┘
//! ```

pub mod behavior;
pub mod runner;
pub mod schedule;
#[allow(clippy::module_inception)]
pub mod storm;

pub use behavior::{BehaviorPhase, BehaviorStats, StormBehavior};
pub use runner::{StormId, StormRunner};
pub use schedule::{Clock, DurationSampler, Interval, Repeat, Schedule, ScheduleConfig};
pub use storm::Storm;
