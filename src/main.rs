//! 无头演示：在模拟基底上运行一个锥形 + 环形风暴，按 60 Hz 推进并输出存活子弹数量。

use bullet_storm::bullet::{
    BulletPrefab, BulletSystem, ColorOverLifetimeModule, EventRegistries, ModuleConfig, UpdateEvent, UpdateModule,
};
use bullet_storm::config::StormConfig;
use bullet_storm::core::init_logging;
use bullet_storm::emission::EmissionShape;
use bullet_storm::emitter::{AimOffset, Emitter, EmitterTransform};
use bullet_storm::particles::{ColorGradient, SimulatedSubstrate};
use bullet_storm::storm::{Clock, Interval, Repeat, Schedule, Storm, StormBehavior, StormRunner};
use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

const FRAME: f32 = 1.0 / 60.0;
const SECONDS: u32 = 6;

/// 匀速自转的瞄准偏移
struct Spin {
    angle: f32,
    rate: f32,
}

impl AimOffset for Spin {
    fn reset(&mut self) -> Quat {
        self.angle = 0.0;
        Quat::IDENTITY
    }

    fn advance(&mut self, dt: f32) -> Quat {
        self.angle += self.rate * dt;
        Quat::from_rotation_y(self.angle)
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = StormConfig::load_or_default();
    init_logging(&config.logging);

    let mut registries = EventRegistries::new();
    registries.update.register(
        "curl",
        UpdateEvent::new().on_update(|mut record| {
            // 绕 Y 轴缓慢偏转
            record.velocity = Quat::from_rotation_y(0.5 * record.delta_time) * record.velocity;
            record
        }),
    );

    let prefab = BulletPrefab::new("petal")
        .with_module(ModuleConfig::Update(UpdateModule {
            enabled: true,
            update_event: "curl".to_string(),
        }))
        .with_module(ModuleConfig::ColorOverLifetime(ColorOverLifetimeModule {
            enabled: true,
            gradient: ColorGradient::default(),
        }));

    let substrate = Rc::new(RefCell::new(SimulatedSubstrate::new(4096)));
    let bullets =
        BulletSystem::from_prefab(&prefab, Box::new(Rc::clone(&substrate)), &config, &registries).into_shared();
    let emitter = Emitter::new(EmitterTransform::from_position(Vec3::new(0.0, 1.0, 0.0)))
        .with_aim_offset(Spin {
            angle: 0.0,
            rate: std::f32::consts::FRAC_PI_4,
        })
        .into_shared();

    let cone = StormBehavior::new(
        Schedule::new(Repeat::Times(12), 0.25),
        EmissionShape::cone(16, 6.0, 30.0, 0.2)?,
        &bullets,
        &emitter,
    )?
    .with_seed(7);
    let ring = StormBehavior::new(
        Schedule::new(Repeat::Infinite, 0.0)
            .with_start_delay(1.0)
            .with_clock(Clock::Fixed)
            .with_interval(Interval::sampled(|elapsed: f32| (0.6 - elapsed * 0.05).max(0.2))),
        EmissionShape::ring(24, 3.0, 0.5)?,
        &bullets,
        &emitter,
    )?;

    let mut runner = StormRunner::new();
    runner.register_system(Rc::clone(&bullets));
    let storm = Storm::new("bloom")
        .with_behavior(cone)?
        .with_behavior(ring)?
        .on_complete(|outcome| tracing::info!(target: "storm", ?outcome, "Storm over"));
    let id = runner.launch(storm);

    for frame in 1..=(SECONDS * 60) {
        runner.fixed_tick(FRAME);
        runner.tick(FRAME);
        substrate.borrow_mut().advance(FRAME);

        if frame % 60 == 0 {
            let bullets = bullets.borrow();
            tracing::info!(
                target: "storm",
                second = frame / 60,
                live = bullets.live_count(),
                emitted = bullets.emit_stats().emitted,
                dropped = bullets.emit_stats().dropped,
                "Population"
            );
        }
        if frame == (SECONDS - 1) * 60 {
            runner.cancel(id)?;
        }
    }

    bullets.borrow_mut().destroy();
    for _ in 0..(config.bullets.lifetime / FRAME).ceil() as u32 + 2 {
        if bullets.borrow().is_destroyed() {
            break;
        }
        runner.tick(FRAME);
        substrate.borrow_mut().advance(FRAME);
    }
    tracing::info!(
        target: "storm",
        destroyed = bullets.borrow().is_destroyed(),
        idle = runner.is_idle(),
        "Bullet system drained"
    );
    Ok(())
}
