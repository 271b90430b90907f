//! 发射形状与参数管线
//!
//! ```text
//!  EmissionShape ──generate(n)──► EmitParam* ──resolve(defaults)──► SpawnParams
//!                                                   │
//!                                       relative_to(emitter) (world space)
//!                                                   ▼
//!                                       ParticleSubstrate::spawn
//! ```

pub mod param;
pub mod shape;

pub use param::{EmitParam, SpawnParams};
pub use shape::{EmissionShape, ShapeIter, ShapeJitter, ShapeKind};
