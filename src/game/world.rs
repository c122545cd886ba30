//! The entity collection for whatever area the player is currently in
//!
//! `World` owns every entity. Only the game loop spawns and despawns; the
//! combat resolver mutates health and removal flags in place.

use serde::{Deserialize, Serialize};

use crate::game::entity::{
    Adversary, AdversaryBehavior, Combatant, EntityId, EntityKind, Identity, PhysicsMode, Player, Projectile, Tick,
};
use crate::game::level::{ExemptionList, ExplorationMap, LevelTemplate};
use crate::util::vec2::{Rect, Vec2};

/// Playfield geometry for the current area
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    /// Ground surface in platform areas; None for top-down exploration
    pub ground_y: Option<f32>,
}

impl Arena {
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct World {
    pub player: Player,
    pub combatants: Vec<Combatant>,
    pub projectiles: Vec<Projectile>,
    pub adversaries: Vec<Adversary>,
    pub arena: Arena,
    /// Level combatants parked while an arcade session owns the playfield
    stashed: Option<Vec<Combatant>>,
    next_entity_id: EntityId,
}

impl World {
    pub fn new(player: Player, arena: Arena) -> Self {
        Self {
            player,
            combatants: Vec::new(),
            projectiles: Vec::new(),
            adversaries: Vec::new(),
            arena,
            stashed: None,
            next_entity_id: 1,
        }
    }

    /// Allocate a fresh entity id
    pub fn next_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn spawn_combatant(&mut self, kind: EntityKind, identity: Option<Identity>, position: Vec2) -> EntityId {
        let id = self.next_id();
        self.combatants.push(Combatant::new(id, kind, identity, position));
        id
    }

    pub fn spawn_adversary(&mut self, position: Vec2, speed: f32, behavior: AdversaryBehavior) -> EntityId {
        let id = self.next_id();
        self.adversaries.push(Adversary::new(id, position, speed, behavior));
        id
    }

    pub fn despawn_adversary(&mut self, id: EntityId) -> bool {
        let before = self.adversaries.len();
        self.adversaries.retain(|a| a.id != id);
        self.adversaries.len() != before
    }

    pub fn adversary(&self, id: EntityId) -> Option<&Adversary> {
        self.adversaries.iter().find(|a| a.id == id)
    }

    pub fn combatant(&self, id: EntityId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: EntityId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }

    /// Drop every area-local entity
    pub fn clear_area(&mut self) {
        self.combatants.clear();
        self.projectiles.clear();
        self.adversaries.clear();
        self.stashed = None;
    }

    /// Replace the area with the top-down exploration hub
    pub fn load_exploration(&mut self, map: &ExplorationMap, player_position: Vec2) {
        self.clear_area();
        self.arena = Arena {
            width: map.width,
            height: map.height,
            ground_y: None,
        };
        let health = self.player.health;
        self.player.respawn_at(player_position, PhysicsMode::Exploration);
        self.player.set_health(health);
    }

    /// Replace the area with a level's initial entity set. Identities on the
    /// exemption list spawn protected.
    pub fn load_level(&mut self, level: &LevelTemplate, exemptions: &ExemptionList) {
        self.clear_area();
        self.arena = Arena {
            width: level.width,
            height: level.height,
            ground_y: Some(level.ground_y),
        };
        self.player.respawn_at(level.entry, PhysicsMode::Platform);

        for spawn in &level.spawns {
            let id = self.next_id();
            let mut combatant = Combatant::new(id, spawn.kind, Some(spawn.identity.clone()), spawn.position);
            combatant.is_protected = exemptions.contains(&spawn.identity.target_id);
            self.combatants.push(combatant);
        }
    }

    /// Remove combatants whose elimination was processed on an earlier tick,
    /// and spent projectiles. Returns how many combatants were removed.
    pub fn reap(&mut self, now: Tick) -> usize {
        let before = self.combatants.len();
        self.combatants
            .retain(|c| !(c.is_pending_removal && c.removal_tick < now));
        self.projectiles.retain(|p| !p.spent);
        before - self.combatants.len()
    }

    /// Park the level's combatants so an arcade session can use the playfield
    pub fn stash_combatants(&mut self) {
        let level = std::mem::take(&mut self.combatants);
        self.stashed = Some(level);
        self.projectiles.clear();
    }

    /// Bring back whatever `stash_combatants` parked, dropping arcade spawns
    pub fn restore_stashed(&mut self) -> bool {
        match self.stashed.take() {
            Some(level) => {
                self.combatants = level;
                self.projectiles.clear();
                true
            }
            None => false,
        }
    }

    pub fn has_stash(&self) -> bool {
        self.stashed.is_some()
    }

    /// Parked level combatants, empty outside an arcade session
    pub fn stashed_mut(&mut self) -> impl Iterator<Item = &mut Combatant> {
        self.stashed.iter_mut().flatten()
    }

    /// Drop parked combatants carrying `target_id` so the identity is not
    /// eliminated a second time once the level comes back
    pub fn consume_stashed(&mut self, target_id: &str) -> usize {
        let Some(stashed) = self.stashed.as_mut() else {
            return 0;
        };
        let before = stashed.len();
        stashed.retain(|c| c.identity.as_ref().map_or(true, |i| i.target_id != target_id));
        before - stashed.len()
    }

    /// Live (not pending, not hidden) combatants of a kind
    pub fn live_count(&self, kind: EntityKind) -> usize {
        self.combatants
            .iter()
            .filter(|c| c.kind == kind && c.is_collidable())
            .count()
    }

    /// Non-boss combatants the player still has to eliminate to clear the area
    pub fn remaining_targets(&self) -> usize {
        self.combatants
            .iter()
            .filter(|c| !c.kind.is_boss() && !c.is_protected && c.alive && !c.is_pending_removal)
            .count()
    }

    pub fn boss(&self) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.kind.is_boss())
    }

    /// Total entity count, used for frame-budget reporting
    pub fn entity_count(&self) -> usize {
        1 + self.combatants.len() + self.projectiles.len() + self.adversaries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::LevelCatalog;

    fn level_world() -> (World, LevelTemplate) {
        let catalog = LevelCatalog::generate(42, 2);
        let level = catalog.level(1).cloned().unwrap();
        let mut world = World::new(Player::new(Vec2::ZERO, 10), Arena {
            width: 100.0,
            height: 100.0,
            ground_y: None,
        });
        world.load_level(&level, &ExemptionList::default());
        (world, level)
    }

    #[test]
    fn test_load_level_spawns_everything() {
        let (world, level) = level_world();
        assert_eq!(world.combatants.len(), level.spawns.len());
        assert_eq!(world.player.position(), level.entry);
        assert_eq!(world.player.mode_physics, PhysicsMode::Platform);
        assert!(world.combatants.iter().all(|c| !c.is_protected));
    }

    #[test]
    fn test_exempt_identities_spawn_protected() {
        let catalog = LevelCatalog::generate(42, 1);
        let level = catalog.level(1).cloned().unwrap();
        let exempt_id = level.spawns[0].identity.target_id.clone();
        let exemptions = ExemptionList::from_ids([exempt_id.clone()]);

        let mut world = World::new(Player::new(Vec2::ZERO, 10), level.arena());
        world.load_level(&level, &exemptions);

        let protected: Vec<_> = world.combatants.iter().filter(|c| c.is_protected).collect();
        assert_eq!(protected.len(), 1);
        assert_eq!(protected[0].identity.as_ref().map(|i| i.target_id.as_str()), Some(exempt_id.as_str()));
    }

    #[test]
    fn test_reap_waits_one_tick() {
        let (mut world, _) = level_world();
        let id = world.combatants[0].id;
        world.combatants[0].take_damage(100, 10);

        assert_eq!(world.reap(10), 0);
        assert!(world.combatant(id).is_some());
        assert_eq!(world.reap(11), 1);
        assert!(world.combatant(id).is_none());
    }

    #[test]
    fn test_stash_and_restore() {
        let (mut world, level) = level_world();
        world.stash_combatants();
        assert!(world.combatants.is_empty());
        world.spawn_combatant(EntityKind::Hostile, None, Vec2::new(500.0, 500.0));

        assert!(world.restore_stashed());
        assert_eq!(world.combatants.len(), level.spawns.len());
        assert!(!world.restore_stashed());
    }

    #[test]
    fn test_consume_stashed_identity() {
        let (mut world, level) = level_world();
        let target = level.spawns[0].identity.target_id.clone();
        assert_eq!(world.consume_stashed(&target), 0);

        world.stash_combatants();
        world.stashed_mut().for_each(|c| c.is_protected = true);
        assert_eq!(world.consume_stashed(&target), 1);
        assert_eq!(world.consume_stashed(&target), 0);

        assert!(world.restore_stashed());
        assert_eq!(world.combatants.len(), level.spawns.len() - 1);
        assert!(world.combatants.iter().all(|c| c.is_protected));
        assert!(world
            .combatants
            .iter()
            .all(|c| c.identity.as_ref().map(|i| i.target_id.as_str()) != Some(target.as_str())));
    }

    #[test]
    fn test_ids_are_unique() {
        let (mut world, _) = level_world();
        let a = world.spawn_combatant(EntityKind::Hostile, None, Vec2::ZERO);
        let b = world.spawn_adversary(Vec2::ZERO, 10.0, AdversaryBehavior::Racer);
        assert_ne!(a, b);
        assert!(world.despawn_adversary(b));
        assert!(!world.despawn_adversary(b));
    }
}
