//! Performance benchmarks for critical game systems

use server::config::GameConfig;
use server::game::GameLogic;
use shared::protocol::{decode, encode, Packet};
use shared::{PhysicsSystem, ProjectileType, Vector, World, MAP_SEED, WALL_COUNT, WORLD_HEIGHT, WORLD_WIDTH};
use std::time::{Duration, Instant};

/// Benchmarks projectile advancement with a crowded map
#[test]
fn benchmark_physics_update() {
    let mut world = World::generate(200, 200, 2000, 3);
    let directions = [Vector::new(1, 0), Vector::new(0, 1), Vector::new(-1, 1), Vector::new(1, -1)];

    let mut spawned = 0;
    for y in (2..198).step_by(4) {
        for x in (2..198).step_by(4) {
            let direction = directions[(x + y) as usize % directions.len()];
            if world
                .spawn_projectile(0, Vector::new(x, y), direction, ProjectileType::Electric)
                .is_ok()
            {
                spawned += 1;
            }
        }
    }

    let mut physics = PhysicsSystem::new();
    let iterations = 120;
    let start = Instant::now();

    for _ in 0..iterations {
        physics.update(&mut world, 1.0 / 60.0);
    }

    let duration = start.elapsed();
    println!(
        "Physics: {} projectiles, {} updates in {:?} ({:.2} µs/update)",
        spawned,
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    assert!(world.grids_consistent());
    // Should complete in under 2s even in debug builds
    assert!(duration < Duration::from_secs(2));
}

/// Benchmarks world churn: spawning, moving and removing players
#[test]
fn benchmark_world_churn() {
    let mut world = World::new(100, 100);
    let mut rng = rand::thread_rng();
    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let Ok(position) = world.random_empty_location(&mut rng) else {
            continue;
        };
        let Ok(id) = world.spawn_player("bench", position) else {
            continue;
        };
        if let Ok(target) = world.random_empty_location(&mut rng) {
            let _ = world.move_entity(id, target);
        }
        world.remove(id);
    }

    let duration = start.elapsed();
    println!(
        "World churn: {} iterations in {:?} ({:.2} ns/iter)",
        iterations,
        duration,
        duration.as_nanos() as f64 / iterations as f64
    );

    assert!(world.is_empty());
    assert!(duration < Duration::from_secs(1));
}

/// Benchmarks encoding and decoding the full arena snapshot
#[test]
fn benchmark_world_state_codec() {
    let mut world = World::generate(WORLD_WIDTH, WORLD_HEIGHT, WALL_COUNT, MAP_SEED);
    let mut rng = rand::thread_rng();
    for _ in 0..16 {
        if let Ok(position) = world.random_empty_location(&mut rng) {
            let _ = world.spawn_player("bench", position);
        }
    }

    let iterations = 200;
    let start = Instant::now();
    let mut total_bytes = 0;

    for _ in 0..iterations {
        let bytes = encode(&Packet::world_state(&world)).unwrap();
        total_bytes += bytes.len();
        let _ = decode(&bytes).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "World state codec: {} iterations, {} bytes each, in {:?}",
        iterations,
        total_bytes / iterations,
        duration
    );

    assert!(duration < Duration::from_secs(3));
}

/// Stress test: a full lobby playing a long round of simulated ticks
#[test]
fn stress_test_full_round_ticks() {
    let world = World::generate(WORLD_WIDTH, WORLD_HEIGHT, WALL_COUNT, MAP_SEED);
    let config = GameConfig::default();
    let step = config.playing_tick;
    let mut game = GameLogic::with_seed(world, config, 1);

    let ids: Vec<u32> = (0..16).map(|_| game.handle_connect().unwrap()).collect();
    let mut now = Instant::now();
    for &id in &ids {
        game.handle_packet(id, Packet::PlayerReady { player_id: id, is_ready: true }, now);
    }
    game.tick(now, step);

    let ticks = 600;
    let start = Instant::now();
    for tick in 0..ticks {
        now += step;
        for (i, &id) in ids.iter().enumerate() {
            let direction = Vector::new(if (tick + i) % 2 == 0 { 1 } else { -1 }, (i % 3) as i32 - 1);
            let ability = ProjectileType::ALL[i % ProjectileType::ALL.len()];
            game.handle_packet(id, Packet::Action { ability_type: ability, player_id: id, direction }, now);
        }
        game.tick(now, step);
        game.drain_outbox();
    }

    let duration = start.elapsed();
    println!("Round simulation: {} ticks for 16 players in {:?}", ticks, duration);

    assert!(game.world().grids_consistent());
    assert!(duration < Duration::from_secs(5));
}
