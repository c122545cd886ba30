use rayon::prelude::*;

use crate::game::constants::physics::{GRAVITY, JUMP_SPEED, MAX_FALL_SPEED};
use crate::game::entity::{AttackPattern, Body, Combatant, EntityKind, PhysicsMode, Player};
use crate::game::world::Arena;
use crate::util::vec2::Vec2;

/// Movement the player asked for this tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MoveIntent {
    /// Held direction; only `x` matters in platform physics
    pub direction: Vec2,
    pub jump: bool,
}

/// Advance the player under whichever physics policy is active
pub fn update_player(player: &mut Player, intent: MoveIntent, run_speed: f32, walk_speed: f32, dt: f32, arena: &Arena) {
    if !player.alive {
        return;
    }

    if intent.direction.x.abs() > 0.01 {
        player.facing = if intent.direction.x > 0.0 { Vec2::RIGHT } else { Vec2::LEFT };
    }

    match player.mode_physics {
        PhysicsMode::Exploration => {
            step_top_down(&mut player.body, intent.direction, walk_speed, dt, arena);
        }
        PhysicsMode::Platform => {
            step_platform(&mut player.body, intent.direction.x, run_speed, intent.jump, dt, arena);
        }
    }
}

/// Top-down movement: no gravity, clamped to the map
pub fn step_top_down(body: &mut Body, direction: Vec2, speed: f32, dt: f32, arena: &Arena) {
    body.velocity = direction.clamp_length(1.0) * speed;
    body.position += body.velocity * dt;
    clamp_to_arena(body, arena);
}

/// Side-scrolling movement with gravity and a single jump from the ground
pub fn step_platform(body: &mut Body, move_x: f32, speed: f32, jump: bool, dt: f32, arena: &Arena) {
    body.velocity.x = move_x.clamp(-1.0, 1.0) * speed;

    if jump && body.on_ground {
        body.velocity.y = -JUMP_SPEED;
        body.on_ground = false;
    }

    apply_gravity(body, dt);
    body.position += body.velocity * dt;
    land_on_ground(body, arena);
    clamp_to_arena(body, arena);
}

#[inline]
pub fn apply_gravity(body: &mut Body, dt: f32) {
    body.velocity.y = (body.velocity.y + GRAVITY * dt).min(MAX_FALL_SPEED);
}

/// Snap a falling body onto the ground surface
pub fn land_on_ground(body: &mut Body, arena: &Arena) {
    let Some(ground_y) = arena.ground_y else {
        return;
    };

    let half_h = body.size.y * 0.5;
    if body.position.y + half_h >= ground_y {
        body.position.y = ground_y - half_h;
        if body.velocity.y > 0.0 {
            body.velocity.y = 0.0;
        }
        body.on_ground = true;
    } else {
        body.on_ground = false;
    }
}

pub fn clamp_to_arena(body: &mut Body, arena: &Arena) {
    let half = body.size * 0.5;
    body.position.x = body.position.x.clamp(half.x, (arena.width - half.x).max(half.x));
    body.position.y = body.position.y.clamp(half.y, (arena.height - half.y).max(half.y));
}

/// Whether a combatant falls in platform areas
fn uses_gravity(kind: EntityKind) -> bool {
    !matches!(kind, EntityKind::Boss(AttackPattern::Sentinel))
}

/// Integrate combatant velocities set by the AI pass.
/// Pending-removal and hidden entities stay where they are.
pub fn update_combatants(combatants: &mut [Combatant], dt: f32, arena: &Arena) {
    combatants.par_iter_mut().for_each(|c| {
        if !c.is_collidable() {
            return;
        }

        if arena.ground_y.is_some() && uses_gravity(c.kind) {
            apply_gravity(&mut c.body, dt);
        }
        c.body.position += c.body.velocity * dt;
        land_on_ground(&mut c.body, arena);
        clamp_to_arena(&mut c.body, arena);
    });
}
