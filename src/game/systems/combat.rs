//! Collision and combat resolution
//!
//! One pass per tick, in this order:
//! 1. rebuild the spatial grid from collidable combatants
//! 2. projectiles against their grid neighbors (single target, first in scan order)
//! 3. the player against their grid neighbors, honoring the invincibility window
//!
//! The resolver never despawns anything. It flags eliminated combatants as
//! pending removal and reports events; the game loop owns every reaction.

use crate::game::entity::{DamageOutcome, PlayerHit, Tick};
use crate::game::events::{EliminationCause, EliminationEvent, PlayerDeathEvent};
use crate::game::spatial::SpatialGrid;
use crate::game::world::World;

/// Damage a single contact deals to the player
pub const CONTACT_DAMAGE: i32 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatReport {
    pub eliminations: Vec<EliminationEvent>,
    /// Projectile hits that landed, including non-lethal ones
    pub hits: u32,
    pub player_hits: u32,
    pub player_death: Option<PlayerDeathEvent>,
    /// Renderer side channel; not stored anywhere
    pub damage_flash: bool,
    pub projectiles_spent: u32,
}

pub fn resolve_tick(world: &mut World, grid: &mut SpatialGrid, now: Tick, invincibility_ticks: Tick) -> CombatReport {
    let mut report = CombatReport::default();

    // Split borrows: the grid holds slots into `combatants`
    let World {
        player,
        combatants,
        projectiles,
        ..
    } = world;

    grid.rebuild(combatants);

    for projectile in projectiles.iter_mut().filter(|p| !p.spent) {
        let bounds = projectile.bounds();

        let target = grid
            .query_neighbors(projectile.position)
            .find(|entry| {
                let c = &combatants[entry.slot];
                c.is_collidable() && !c.is_protected && c.bounds().overlaps(&bounds)
            })
            .map(|entry| entry.slot);

        let Some(slot) = target else {
            continue;
        };

        projectile.spent = true;
        report.projectiles_spent += 1;

        let combatant = &mut combatants[slot];
        match combatant.take_damage(projectile.damage, now) {
            DamageOutcome::Eliminated => {
                report.hits += 1;
                tracing::debug!("Entity {} ({:?}) eliminated at tick {}", combatant.id, combatant.kind, now);
                report.eliminations.push(EliminationEvent {
                    target: combatant.id,
                    kind: combatant.kind,
                    identity: combatant.identity.clone(),
                    cause: EliminationCause::Projectile,
                    tick: now,
                });
            }
            DamageOutcome::Wounded { .. } => report.hits += 1,
            DamageOutcome::Blocked => {
                invariant!(false, "projectile {} matched unhittable entity {}", projectile.id, combatant.id);
            }
        }
    }

    if player.alive && !player.is_invincible(now) {
        let bounds = player.bounds();
        let attacker = grid
            .query_neighbors(player.position())
            .find(|entry| {
                let c = &combatants[entry.slot];
                c.is_collidable() && c.can_damage_player() && c.bounds().overlaps(&bounds)
            })
            .map(|entry| entry.id);

        if let Some(attacker) = attacker {
            match player.apply_hit(CONTACT_DAMAGE, now, invincibility_ticks) {
                PlayerHit::Ignored => {}
                PlayerHit::Damaged { remaining } => {
                    report.player_hits += 1;
                    report.damage_flash = true;
                    tracing::debug!("Player hit by {}, health {}", attacker, remaining);
                }
                PlayerHit::Killed => {
                    report.player_hits += 1;
                    report.damage_flash = true;
                    report.player_death = Some(PlayerDeathEvent {
                        tick: now,
                        killer: attacker,
                    });
                    tracing::info!("Player killed by entity {} at tick {}", attacker, now);
                }
            }
        }
    }

    report
}
