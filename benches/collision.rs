//! Collision benchmarks: spatial grid against brute force, and a full
//! combat resolution pass, at arcade-scale entity counts.
//!
//! Run with: cargo bench --bench collision

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use zombie_blaster_core::game::constants::spatial::CELL_SIZE;
use zombie_blaster_core::game::entity::{Combatant, EntityKind, Player, Projectile};
use zombie_blaster_core::game::spatial::SpatialGrid;
use zombie_blaster_core::game::systems::combat;
use zombie_blaster_core::game::world::{Arena, World};
use zombie_blaster_core::util::vec2::Vec2;

const ARENA: Arena = Arena {
    width: 3200.0,
    height: 800.0,
    ground_y: Some(600.0),
};

/// World with `count` hostiles spread over the arena and count/10 projectiles in flight
fn populated_world(count: usize) -> World {
    let mut rng = StdRng::seed_from_u64(7);
    let mut world = World::new(Player::new(Vec2::new(80.0, 580.0), 10), ARENA);

    for _ in 0..count {
        let id = world.next_id();
        let position = Vec2::new(rng.gen_range(0.0..ARENA.width), rng.gen_range(100.0..580.0));
        world.combatants.push(Combatant::new(id, EntityKind::Hostile, None, position));
    }
    for _ in 0..count / 10 {
        let id = world.next_id();
        let position = Vec2::new(rng.gen_range(0.0..ARENA.width), rng.gen_range(100.0..580.0));
        world
            .projectiles
            .push(Projectile::new(id, position, Vec2::RIGHT, 700.0, 1, 1.5));
    }
    world
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("projectile_queries");
    group.sample_size(50);

    for count in [100, 250, 500] {
        let world = populated_world(count);
        let mut grid = SpatialGrid::new(CELL_SIZE);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("spatial_grid", count), &count, |b, _| {
            b.iter(|| {
                grid.rebuild(&world.combatants);
                let mut hits = 0usize;
                for p in &world.projectiles {
                    let bounds = p.bounds();
                    hits += grid
                        .query_neighbors(p.position)
                        .filter(|e| world.combatants[e.slot].bounds().overlaps(&bounds))
                        .count();
                }
                black_box(hits)
            })
        });

        group.bench_with_input(BenchmarkId::new("brute_force", count), &count, |b, _| {
            b.iter(|| {
                let mut hits = 0usize;
                for p in &world.projectiles {
                    let bounds = p.bounds();
                    hits += world
                        .combatants
                        .iter()
                        .filter(|c| c.bounds().overlaps(&bounds))
                        .count();
                }
                black_box(hits)
            })
        });
    }
    group.finish();
}

/// A full resolver pass. Health and projectiles are reset every iteration so
/// each pass sees the same world.
fn bench_resolve_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_tick");
    group.sample_size(50);

    for count in [100, 250, 500] {
        let mut world = populated_world(count);
        let mut grid = SpatialGrid::new(CELL_SIZE);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("combat", count), &count, |b, _| {
            b.iter(|| {
                for p in world.projectiles.iter_mut() {
                    p.spent = false;
                }
                for c in world.combatants.iter_mut() {
                    c.health = c.max_health;
                    c.alive = true;
                    c.is_pending_removal = false;
                }
                black_box(combat::resolve_tick(&mut world, &mut grid, 1, 90))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries, bench_resolve_tick);
criterion_main!(benches);
