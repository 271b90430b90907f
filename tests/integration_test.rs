use bullet_storm::bullet::{
    BulletPrefab, BulletSettings, BulletSystem, CollisionEvent, CollisionRecord, EventRegistries, ObjectId,
    SharedBulletSystem, UpdateEvent,
};
use bullet_storm::config::{BatchConfig, StormConfig};
use bullet_storm::core::{TaskOutcome, TaskStatus};
use bullet_storm::emission::{EmissionShape, EmitParam};
use bullet_storm::emitter::{Emitter, EmitterTransform, SharedEmitter};
use bullet_storm::particles::{ParticleRecord, ParticleSubstrate, SimulatedSubstrate};
use bullet_storm::storm::{Repeat, Schedule, Storm, StormBehavior, StormRunner};
use glam::{Quat, Vec3};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Scene {
    substrate: Rc<RefCell<SimulatedSubstrate>>,
    bullets: SharedBulletSystem,
    emitter: SharedEmitter,
}

fn scene(capacity: usize) -> Scene {
    let substrate = Rc::new(RefCell::new(SimulatedSubstrate::new(capacity)));
    let bullets = BulletSystem::origin(
        "scene",
        Box::new(Rc::clone(&substrate)),
        BulletSettings::default(),
        BatchConfig::default(),
    )
    .into_shared();
    let emitter = Emitter::new(EmitterTransform::IDENTITY).into_shared();
    Scene {
        substrate,
        bullets,
        emitter,
    }
}

fn behavior(scene: &Scene, schedule: Schedule, count: usize) -> StormBehavior {
    StormBehavior::new(
        schedule,
        EmissionShape::ring(count, 2.0, 0.0).unwrap(),
        &scene.bullets,
        &scene.emitter,
    )
    .unwrap()
}

#[test]
fn test_three_cycles_of_five_emit_fifteen() {
    let scene = scene(100);
    let finished = Rc::new(Cell::new(None));
    let seen = Rc::clone(&finished);
    let mut storm = Storm::new("rings")
        .with_behavior(behavior(&scene, Schedule::new(Repeat::Times(3), 1.0), 5))
        .unwrap()
        .on_complete(move |outcome| seen.set(Some(outcome)));

    storm.start();
    storm.tick(0.0);
    storm.tick(1.0);
    let status = storm.tick(1.0);

    assert_eq!(scene.bullets.borrow().live_count(), 15);
    assert_eq!(status, TaskStatus::Finished);
    assert_eq!(finished.get(), Some(TaskOutcome::Completed));
}

#[test]
fn test_pause_does_not_catch_up() {
    let scene = scene(100);
    let mut storm = Storm::new("steady")
        .with_behavior(behavior(&scene, Schedule::new(Repeat::Infinite, 1.0), 1))
        .unwrap();
    storm.start();
    storm.tick(0.0);
    assert_eq!(scene.bullets.borrow().live_count(), 1);

    assert!(storm.pause());
    for _ in 0..5 {
        assert_eq!(storm.tick(1.0), TaskStatus::Paused);
    }
    assert_eq!(scene.bullets.borrow().live_count(), 1);

    assert!(storm.resume());
    storm.tick(0.5);
    assert_eq!(scene.bullets.borrow().live_count(), 1);
    storm.tick(0.5);
    assert_eq!(scene.bullets.borrow().live_count(), 2);
}

#[test]
fn test_cancel_stops_both_behaviors() {
    let scene = scene(100);
    let mut storm = Storm::new("pair")
        .with_behavior(behavior(&scene, Schedule::new(Repeat::Infinite, 0.5), 2))
        .unwrap()
        .with_behavior(behavior(&scene, Schedule::new(Repeat::Infinite, 0.25), 3))
        .unwrap();
    storm.start();
    storm.tick(0.0);
    storm.tick(0.25);
    let emitted = scene.bullets.borrow().live_count();
    assert_eq!(emitted, 2 + 3 + 3);

    assert!(storm.cancel());
    assert!(storm
        .behaviors()
        .iter()
        .all(|b| b.status() == TaskStatus::Cancelled));
    for _ in 0..4 {
        storm.tick(0.5);
    }
    // 已发射的子弹不会被撤回
    assert_eq!(scene.bullets.borrow().live_count(), emitted);
    assert_eq!(storm.status(), TaskStatus::Cancelled);
}

#[test]
fn test_emit_at_capacity_drops_silently() {
    let scene = scene(10);
    let mut storm = Storm::new("flood")
        .with_behavior(behavior(&scene, Schedule::new(Repeat::Times(3), 0.0), 4))
        .unwrap();
    storm.start();
    for _ in 0..3 {
        storm.tick(0.016);
    }

    let bullets = scene.bullets.borrow();
    assert_eq!(bullets.live_count(), 10);
    assert_eq!(bullets.emit_stats().emitted, 10);
    assert_eq!(bullets.emit_stats().dropped, 2);
    assert_eq!(storm.behaviors()[0].stats().dropped, 2);
    drop(bullets);

    assert!(!scene
        .bullets
        .borrow_mut()
        .emit(EmitParam::new(), &EmitterTransform::IDENTITY));
}

#[test]
fn test_drain_waits_for_population() {
    let scene = scene(32);
    let mut runner = StormRunner::new();
    runner.register_system(Rc::clone(&scene.bullets));
    {
        let mut bullets = scene.bullets.borrow_mut();
        for lifetime_hint in 0..4 {
            bullets.emit(
                EmitParam::new().with_velocity(Vec3::Z * lifetime_hint as f32),
                &EmitterTransform::IDENTITY,
            );
        }
        bullets.destroy();
    }

    // 默认生命周期 5 秒，在此之前系统一直处于等待状态
    let mut elapsed = 0.0;
    while scene.substrate.borrow().live_count() > 0 {
        runner.tick(0.1);
        assert!(!scene.bullets.borrow().is_destroyed());
        scene.substrate.borrow_mut().advance(0.1);
        elapsed += 0.1;
        assert!(elapsed < 10.0, "bullets never expired");
    }

    runner.tick(0.1);
    assert!(scene.bullets.borrow().is_destroyed());
    assert!(scene.substrate.borrow().is_torn_down());
    assert_eq!(runner.system_count(), 0);
}

#[test]
fn test_update_event_reshapes_trajectories() {
    let mut registries = EventRegistries::new();
    registries.update.register(
        "stop",
        UpdateEvent::new().on_update(|mut record: ParticleRecord| {
            record.velocity = Vec3::ZERO;
            record
        }),
    );
    let prefab: BulletPrefab = toml::from_str(
        r#"
        name = "stopper"

        [[modules]]
        module = "update"
        enabled = true
        update_event = "stop"
        "#,
    )
    .unwrap();

    let substrate = Rc::new(RefCell::new(SimulatedSubstrate::new(600)));
    let config = StormConfig {
        batch: BatchConfig {
            min_parallel_len: 1,
            chunk_size: 16,
            ..Default::default()
        },
        ..Default::default()
    };
    let bullets =
        BulletSystem::from_prefab(&prefab, Box::new(Rc::clone(&substrate)), &config, &registries).into_shared();
    let emitter = Emitter::new(EmitterTransform::new(Vec3::ONE, Quat::from_rotation_y(1.0))).into_shared();

    let sphere = StormBehavior::new(
        Schedule::new(Repeat::Times(1), 0.0),
        EmissionShape::sphere(500, 3.0, 0.0).unwrap(),
        &bullets,
        &emitter,
    )
    .unwrap();
    let mut runner = StormRunner::new();
    runner.register_system(Rc::clone(&bullets));
    runner.launch(Storm::new("burst").with_behavior(sphere).unwrap());
    runner.tick(0.016);

    let substrate = substrate.borrow();
    assert_eq!(substrate.live_count(), 500);
    assert_eq!(substrate.write_count(), 1);
    assert!(substrate.particles().iter().all(|p| p.velocity == Vec3::ZERO));
    assert!(substrate.particles().iter().all(|p| p.position == Vec3::ONE));
}

#[test]
fn test_collision_reports_are_forwarded() {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let mut registries = EventRegistries::new();
    registries.collision.register(
        "hit",
        CollisionEvent::new(move |other, records| {
            assert_eq!(other, ObjectId(99));
            seen.fetch_add(records.len(), Ordering::SeqCst);
        }),
    );
    let prefab: BulletPrefab = toml::from_str(
        r#"
        name = "fragile"

        [[modules]]
        module = "collision"
        enabled = true
        kill = true
        collision_event = "hit"
        "#,
    )
    .unwrap();

    let substrate = Rc::new(RefCell::new(SimulatedSubstrate::new(8)));
    let mut bullets = BulletSystem::from_prefab(
        &prefab,
        Box::new(Rc::clone(&substrate)),
        &StormConfig::default(),
        &registries,
    );
    bullets.emit(EmitParam::new(), &EmitterTransform::IDENTITY);

    assert!(substrate.borrow_mut().collide(0));
    bullets.report_collisions(
        ObjectId(99),
        &[CollisionRecord {
            intersection: Vec3::ZERO,
            normal: Vec3::Y,
            velocity: Vec3::Z,
        }],
    );
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(bullets.live_count(), 0);
}

#[test]
fn test_config_file_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bullet_storm.toml");

    let mut config = StormConfig::default();
    config.batch.min_parallel_len = 64;
    config.bullets.lifetime = 2.5;
    config.save_toml(&path)?;

    let loaded = StormConfig::from_toml_file(&path)?;
    assert_eq!(loaded, config);
    loaded.validate()?;
    Ok(())
}
