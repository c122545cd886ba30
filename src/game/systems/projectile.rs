//! Player projectiles: firing with a cooldown, flight, and despawn
//!
//! Projectiles despawn on their first hit (handled by the combat resolver),
//! when they leave the arena, when they strike the ground, or when their
//! lifetime runs out.

use crate::config::GameConfig;
use crate::game::entity::{EntityId, Projectile, Tick};
use crate::game::world::{Arena, World};

/// Fire a projectile from the player along their facing direction.
/// Returns None while the cooldown is running or the player is dead.
pub fn fire(world: &mut World, config: &GameConfig, now: Tick) -> Option<EntityId> {
    let player = &world.player;
    if !player.alive || now < player.fire_ready_at {
        return None;
    }

    let direction = player.facing;
    let origin = player.position() + direction * (player.body.size.x * 0.5);

    let id = world.next_id();
    world.projectiles.push(Projectile::new(
        id,
        origin,
        direction,
        config.combat.projectile_speed,
        config.combat.projectile_damage,
        config.combat.projectile_lifetime_secs,
    ));
    world.player.fire_ready_at = now + config.fire_cooldown_ticks();

    Some(id)
}

/// Move live projectiles and mark the ones that left play as spent.
/// Returns the number newly spent.
pub fn update(projectiles: &mut [Projectile], dt: f32, arena: &Arena) -> usize {
    let bounds = arena.bounds();
    let mut spent = 0;

    for projectile in projectiles.iter_mut().filter(|p| !p.spent) {
        projectile.position += projectile.direction * projectile.speed * dt;
        projectile.lifetime -= dt;

        let off_screen = !bounds.contains(projectile.position);
        let hit_ground = arena.ground_y.is_some_and(|g| projectile.position.y >= g);

        if off_screen || hit_ground || projectile.is_expired() {
            projectile.spent = true;
            spent += 1;
        }
    }

    spent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::Player;
    use crate::util::vec2::Vec2;

    fn world() -> World {
        World::new(
            Player::new(Vec2::new(100.0, 580.0), 10),
            Arena {
                width: 1000.0,
                height: 800.0,
                ground_y: Some(600.0),
            },
        )
    }

    #[test]
    fn test_fire_respects_cooldown() {
        let config = GameConfig::default();
        let mut world = world();

        assert!(fire(&mut world, &config, 0).is_some());
        assert!(fire(&mut world, &config, 1).is_none());
        let ready = config.fire_cooldown_ticks();
        assert!(fire(&mut world, &config, ready).is_some());
        assert_eq!(world.projectiles.len(), 2);
    }

    #[test]
    fn test_fire_uses_facing() {
        let config = GameConfig::default();
        let mut world = world();
        world.player.facing = Vec2::LEFT;
        fire(&mut world, &config, 0);
        assert_eq!(world.projectiles[0].direction, Vec2::LEFT);
        assert!(world.projectiles[0].position.x < 100.0);
    }

    #[test]
    fn test_projectile_leaves_arena() {
        let arena = world().arena;
        let mut list = vec![Projectile::new(1, Vec2::new(990.0, 500.0), Vec2::RIGHT, 700.0, 1, 5.0)];
        assert_eq!(update(&mut list, 1.0 / 60.0, &arena), 1);
        assert!(list[0].spent);
        // Already spent: not counted again
        assert_eq!(update(&mut list, 1.0 / 60.0, &arena), 0);
    }

    #[test]
    fn test_projectile_expires() {
        let arena = world().arena;
        let mut list = vec![Projectile::new(1, Vec2::new(100.0, 500.0), Vec2::RIGHT, 10.0, 1, 0.04)];
        for _ in 0..2 {
            update(&mut list, 1.0 / 60.0, &arena);
        }
        assert!(!list[0].spent);
        update(&mut list, 1.0 / 60.0, &arena);
        assert!(list[0].spent);
    }
}
