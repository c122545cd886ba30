//! Entity records: player, combatants (hostile / third party / boss),
//! projectiles and quest adversaries.

use serde::{Deserialize, Serialize};

use crate::game::constants::{boss, hostile, player, projectile, third_party};
use crate::remediation::RemediationKind;
use crate::util::vec2::{Rect, Vec2};

/// Entity identifier, unique within a `World`
pub type EntityId = u64;

/// Monotonic simulation tick
pub type Tick = u64;

/// Physics policy applied to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicsMode {
    /// Top-down movement, no gravity
    Exploration,
    /// Side-scrolling with gravity and jumping
    Platform,
}

/// Kinematic state shared by everything that moves. `position` is the box center.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub on_ground: bool,
}

impl Body {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            size,
            on_ground: false,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::centered(self.position, self.size)
    }
}

/// Result of a damage attempt against the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerHit {
    /// Invincibility window still open, nothing happened
    Ignored,
    Damaged { remaining: i32 },
    Killed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub body: Body,
    pub health: i32,
    pub max_health: i32,
    /// Incoming damage is ignored while `now < invincible_until`
    pub invincible_until: Tick,
    pub mode_physics: PhysicsMode,
    /// Horizontal facing, used as the firing direction
    pub facing: Vec2,
    /// Earliest tick the next shot may be fired
    pub fire_ready_at: Tick,
    pub alive: bool,
}

impl Player {
    pub fn new(position: Vec2, max_health: i32) -> Self {
        Self {
            body: Body::new(position, Vec2::new(player::WIDTH, player::HEIGHT)),
            health: max_health,
            max_health,
            invincible_until: 0,
            mode_physics: PhysicsMode::Exploration,
            facing: Vec2::RIGHT,
            fire_ready_at: 0,
            alive: true,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.body.bounds()
    }

    #[inline]
    pub fn is_invincible(&self, now: Tick) -> bool {
        now < self.invincible_until
    }

    /// Apply damage unless the invincibility window is open. A landed hit
    /// re-opens the window for `window` ticks.
    pub fn apply_hit(&mut self, damage: i32, now: Tick, window: Tick) -> PlayerHit {
        if !self.alive || self.is_invincible(now) {
            return PlayerHit::Ignored;
        }

        self.health = (self.health - damage).max(0);
        self.invincible_until = now + window;

        if self.health == 0 {
            self.alive = false;
            PlayerHit::Killed
        } else {
            PlayerHit::Damaged {
                remaining: self.health,
            }
        }
    }

    /// Set health, never exceeding the configured maximum
    pub fn set_health(&mut self, health: i32) {
        self.health = health.clamp(0, self.max_health);
        self.alive = self.health > 0;
    }

    /// Full heal and reposition, used by level entry and level reset
    pub fn respawn_at(&mut self, position: Vec2, mode: PhysicsMode) {
        self.body = Body::new(position, self.body.size);
        self.health = self.max_health;
        self.alive = true;
        self.invincible_until = 0;
        self.fire_ready_at = 0;
        self.mode_physics = mode;
        self.facing = Vec2::RIGHT;
    }
}

/// Cloud identity a combatant stands in for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub target_id: String,
    pub scope: String,
}

impl Identity {
    pub fn new(target_id: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            target_id: target_id.into(),
            scope: scope.into(),
        }
    }
}

/// Boss behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackPattern {
    /// Paces on the ground, periodically dashes at the player
    Charger,
    /// Hovers above the ground and tracks the player horizontally
    Sentinel,
}

/// Closed set of damageable entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Hostile,
    ThirdParty,
    Boss(AttackPattern),
}

impl EntityKind {
    pub fn default_health(&self) -> i32 {
        match self {
            EntityKind::Hostile => hostile::HEALTH,
            EntityKind::ThirdParty => third_party::HEALTH,
            EntityKind::Boss(_) => boss::HEALTH,
        }
    }

    pub fn size(&self) -> Vec2 {
        match self {
            EntityKind::Hostile => Vec2::new(hostile::WIDTH, hostile::HEIGHT),
            EntityKind::ThirdParty => Vec2::new(third_party::WIDTH, third_party::HEIGHT),
            EntityKind::Boss(_) => Vec2::new(boss::WIDTH, boss::HEIGHT),
        }
    }

    pub fn score(&self) -> u32 {
        match self {
            EntityKind::Hostile => hostile::SCORE,
            EntityKind::ThirdParty => third_party::SCORE,
            EntityKind::Boss(_) => boss::SCORE,
        }
    }

    /// External action triggered by eliminating this kind; bosses have none
    pub fn remediation(&self) -> Option<RemediationKind> {
        match self {
            EntityKind::Hostile => Some(RemediationKind::Hostile),
            EntityKind::ThirdParty => Some(RemediationKind::ThirdParty),
            EntityKind::Boss(_) => None,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self, EntityKind::Boss(_))
    }
}

/// Per-entity movement state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AiState {
    /// -1.0 or 1.0
    pub patrol_dir: f32,
    /// Pattern timer in seconds (boss dash cadence)
    pub timer: f32,
    pub dashing: bool,
    pub dash_dir: f32,
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            patrol_dir: 1.0,
            timer: 0.0,
            dashing: false,
            dash_dir: 1.0,
        }
    }
}

/// Outcome of `Combatant::take_damage`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Protected, already eliminated, or otherwise immune
    Blocked,
    Wounded { remaining: i32 },
    /// Health reached zero on this hit; the entity is now pending removal
    Eliminated,
}

/// Anything the player can shoot: hostiles, third parties, bosses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: EntityId,
    pub kind: EntityKind,
    /// None for bosses
    pub identity: Option<Identity>,
    pub body: Body,
    pub health: i32,
    pub max_health: i32,
    /// Exempted resource: takes no damage until unprotected
    pub is_protected: bool,
    /// Set the instant health reaches zero; never indexed while set
    pub is_pending_removal: bool,
    /// Tick at which `is_pending_removal` was set
    pub removal_tick: Tick,
    /// Hidden entities are neither drawn nor collided with (quest staging)
    pub is_hidden: bool,
    pub alive: bool,
    pub spawn_point: Vec2,
    pub ai: AiState,
}

impl Combatant {
    pub fn new(id: EntityId, kind: EntityKind, identity: Option<Identity>, position: Vec2) -> Self {
        let health = kind.default_health();
        Self {
            id,
            kind,
            identity,
            body: Body::new(position, kind.size()),
            health,
            max_health: health,
            is_protected: false,
            is_pending_removal: false,
            removal_tick: 0,
            is_hidden: false,
            alive: true,
            spawn_point: position,
            ai: AiState::default(),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        self.body.bounds()
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Eligible for the spatial index and any collision check
    #[inline]
    pub fn is_collidable(&self) -> bool {
        self.alive && !self.is_pending_removal && !self.is_hidden
    }

    /// Whether touching this entity hurts the player
    pub fn can_damage_player(&self) -> bool {
        match self.kind {
            EntityKind::Hostile => true,
            EntityKind::Boss(_) => true,
            EntityKind::ThirdParty => !self.is_protected,
        }
    }

    /// Apply projectile damage at tick `now`
    pub fn take_damage(&mut self, amount: i32, now: Tick) -> DamageOutcome {
        if self.is_protected || !self.alive || self.is_pending_removal || amount <= 0 {
            return DamageOutcome::Blocked;
        }

        self.health -= amount;
        if self.health <= 0 {
            self.health = 0;
            self.is_pending_removal = true;
            self.removal_tick = now;
            DamageOutcome::Eliminated
        } else {
            DamageOutcome::Wounded {
                remaining: self.health,
            }
        }
    }
}

/// Who fired a projectile. Single-player today; kept as a type so the
/// resolver never has to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerRef {
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub owner: PlayerRef,
    pub position: Vec2,
    /// Unit vector
    pub direction: Vec2,
    pub speed: f32,
    pub damage: i32,
    /// Seconds left before the projectile fizzles
    pub lifetime: f32,
    /// Marked for despawn (hit, off-screen, wall, expired)
    pub spent: bool,
}

impl Projectile {
    pub fn new(id: EntityId, position: Vec2, direction: Vec2, speed: f32, damage: i32, lifetime: f32) -> Self {
        Self {
            id,
            owner: PlayerRef::Local,
            position,
            direction: direction.normalize(),
            speed,
            damage,
            lifetime,
            spent: false,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::centered(self.position, Vec2::new(projectile::SIZE, projectile::SIZE))
    }

    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }
}

/// How a quest adversary moves toward the objective
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AdversaryBehavior {
    /// Heads straight for the objective (pursuing hacker)
    Racer,
    /// Walks its waypoints in order, then the objective (patrolling auditor)
    Patrol { waypoints: Vec<Vec2> },
}

/// Non-combat NPC spawned by a quest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adversary {
    pub id: EntityId,
    pub body: Body,
    pub speed: f32,
    pub behavior: AdversaryBehavior,
    pub waypoint_index: usize,
}

impl Adversary {
    pub fn new(id: EntityId, position: Vec2, speed: f32, behavior: AdversaryBehavior) -> Self {
        Self {
            id,
            body: Body::new(position, Vec2::new(hostile::WIDTH, hostile::HEIGHT)),
            speed,
            behavior,
            waypoint_index: 0,
        }
    }

    /// Current movement target
    pub fn next_target(&self, objective: Vec2) -> Vec2 {
        match &self.behavior {
            AdversaryBehavior::Racer => objective,
            AdversaryBehavior::Patrol { waypoints } => {
                waypoints.get(self.waypoint_index).copied().unwrap_or(objective)
            }
        }
    }
}
