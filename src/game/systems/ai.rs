//! Movement decisions for combatants and quest adversaries
//!
//! The AI pass only sets velocities (and the sentinel's hover height);
//! `physics::update_combatants` integrates them afterwards.

use rayon::prelude::*;

use crate::game::constants::{boss, hostile};
use crate::game::entity::{Adversary, AttackPattern, Combatant, EntityKind};
use crate::util::vec2::Vec2;

#[inline]
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Decide velocities for every live combatant
pub fn update_combatants(combatants: &mut [Combatant], player_pos: Vec2, ground_y: Option<f32>, dt: f32) {
    combatants.par_iter_mut().for_each(|c| {
        if !c.is_collidable() {
            return;
        }
        match c.kind {
            EntityKind::Hostile => hostile_step(c, player_pos),
            // Access grants stand still
            EntityKind::ThirdParty => c.body.velocity.x = 0.0,
            EntityKind::Boss(AttackPattern::Charger) => charger_step(c, player_pos, dt),
            EntityKind::Boss(AttackPattern::Sentinel) => sentinel_step(c, player_pos, ground_y, dt),
        }
    });
}

/// Chase inside the aggro radius, otherwise patrol around the spawn point
fn hostile_step(c: &mut Combatant, player_pos: Vec2) {
    let dx = player_pos.x - c.body.position.x;

    if dx.abs() <= hostile::AGGRO_RADIUS {
        c.body.velocity.x = sign(dx) * hostile::CHASE_SPEED;
        return;
    }

    let offset = c.body.position.x - c.spawn_point.x;
    if offset >= hostile::PATROL_RANGE {
        c.ai.patrol_dir = -1.0;
    } else if offset <= -hostile::PATROL_RANGE {
        c.ai.patrol_dir = 1.0;
    }
    c.body.velocity.x = c.ai.patrol_dir * hostile::PATROL_SPEED;
}

/// Pace toward the player, dashing at them on a fixed cadence
fn charger_step(c: &mut Combatant, player_pos: Vec2, dt: f32) {
    c.ai.timer += dt;
    let dx = player_pos.x - c.body.position.x;

    if c.ai.dashing {
        c.body.velocity.x = c.ai.dash_dir * boss::DASH_SPEED;
        if c.ai.timer >= boss::DASH_DURATION_SECS {
            c.ai.dashing = false;
            c.ai.timer = 0.0;
        }
    } else {
        c.body.velocity.x = sign(dx) * boss::PACE_SPEED;
        if c.ai.timer >= boss::DASH_INTERVAL_SECS {
            c.ai.dashing = true;
            c.ai.dash_dir = if dx < 0.0 { -1.0 } else { 1.0 };
            c.ai.timer = 0.0;
        }
    }
}

/// Hover at a fixed height and track the player horizontally
fn sentinel_step(c: &mut Combatant, player_pos: Vec2, ground_y: Option<f32>, dt: f32) {
    if let Some(ground) = ground_y {
        let hover_y = ground - boss::HOVER_HEIGHT;
        let max_rise = boss::TRACK_SPEED * dt;
        c.body.position.y += (hover_y - c.body.position.y).clamp(-max_rise, max_rise);
    }
    c.body.velocity.y = 0.0;

    let dx = player_pos.x - c.body.position.x;
    let max_step = boss::TRACK_SPEED * dt;
    // Never overshoot the player's column
    c.body.velocity.x = if dt > 0.0 { dx.clamp(-max_step, max_step) / dt } else { 0.0 };
}

/// Walk a quest adversary toward its next target. Returns its new position.
pub fn advance_adversary(adversary: &mut Adversary, objective: Vec2, dt: f32) -> Vec2 {
    let start = adversary.body.position;
    let mut remaining = adversary.speed * dt;

    // Waypoints reached mid-tick don't eat the rest of the step
    while remaining > 0.0 {
        let target = adversary.next_target(objective);
        let distance = adversary.body.position.distance_to(target);
        if distance > remaining {
            adversary.body.position = adversary.body.position.move_towards(target, remaining);
            break;
        }

        adversary.body.position = target;
        remaining -= distance;
        if target == objective {
            break;
        }
        adversary.waypoint_index += 1;
    }

    adversary.body.velocity = if dt > 0.0 {
        (adversary.body.position - start) * (1.0 / dt)
    } else {
        Vec2::ZERO
    };
    adversary.body.position
}
