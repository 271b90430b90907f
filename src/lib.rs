//! # Bullet Storm
//!
//! Compose "bullet-hell" projectile patterns: emitters fire geometrically shaped
//! bursts of particles, update events reshape their trajectories every frame, and
//! timed sequences ("storms") run concurrently with start / pause / cancel control.
//!
//! ## Architecture
//!
//! The crate drives a host particle substrate (an engine particle system, a GPU
//! simulation, ...) through the [`particles::ParticleSubstrate`] trait and never
//! renders or integrates physics itself.
//!
//! - **Scheduler**: [`core::task::CooperativeTask`] is an explicit, inspectable state
//!   machine advanced by host pulses; [`storm::StormBehavior`] builds on it.
//! - **Batch update**: [`particles::BatchUpdateEngine`] exposes the live population as a
//!   mutable buffer, applies pure per-particle transforms (optionally with rayon) and
//!   coalesces the write-back into one per pulse.
//! - **Emission**: [`emission::EmissionShape`] turns a declarative pattern into
//!   [`emission::EmitParam`]s, resolved relative to an [`emitter::Emitter`].
//!
//! ### Example
//!
//! ```rust
//! use bullet_storm::bullet::{BulletSettings, BulletSystem};
//! use bullet_storm::config::BatchConfig;
//! use bullet_storm::emission::EmissionShape;
//! use bullet_storm::emitter::{Emitter, EmitterTransform};
//! use bullet_storm::particles::SimulatedSubstrate;
//! use bullet_storm::storm::{Repeat, Schedule, Storm, StormBehavior, StormRunner};
//!
//! let bullets = BulletSystem::origin(
//!     "needle",
//!     Box::new(SimulatedSubstrate::new(256)),
//!     BulletSettings::default(),
//!     BatchConfig::default(),
//! )
//! .into_shared();
//! let emitter = Emitter::new(EmitterTransform::IDENTITY).into_shared();
//!
//! let ring = StormBehavior::new(
//!     Schedule::new(Repeat::Times(3), 1.0),
//!     EmissionShape::ring(5, 4.0, 0.5).unwrap(),
//!     &bullets,
//!     &emitter,
//! )
//! .unwrap();
//!
//! let mut runner = StormRunner::new();
//! runner.register_system(bullets.clone());
//! runner.launch(Storm::new("rings").with_behavior(ring).unwrap());
//! for dt in [0.0, 1.0, 1.0] {
//!     runner.tick(dt);
//! }
//! assert_eq!(bullets.borrow().live_count(), 15);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: cooperative tasks, errors, logging
//! - [`config`]: configuration loading
//! - [`particles`]: substrate contract, particle buffer, batch update engine
//! - [`emission`]: emission shapes and parameters
//! - [`emitter`]: emitter transform and aim collaborators
//! - [`bullet`]: bullet systems, named events, config modules
//! - [`storm`]: behaviors, storms, runner

/// Cooperative tasks, error types and logging setup
pub mod core;
/// Configuration system
pub mod config;
/// Host substrate contract and batched particle updates
pub mod particles;
/// Emission shapes and per-bullet parameters
pub mod emission;
/// Emitter transform and aim collaborators
pub mod emitter;
/// Bullet systems, named events and config modules
pub mod bullet;
/// Timed emission behaviors and storms
pub mod storm;
