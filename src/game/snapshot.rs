//! Read-only views handed to the rendering/UI layer, and the persisted
//! save-state record

use serde::{Deserialize, Serialize};

use crate::game::arcade::ArcadeSession;
use crate::game::entity::{Adversary, Combatant, EntityId, EntityKind, Projectile, Tick};
use crate::game::level::LevelId;
use crate::game::mode::GameMode;
use crate::game::quest::{Quest, QuestState};
use crate::util::vec2::Vec2;

/// Transient message shown to the player (remediation failures, level unlocks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    /// Tick after which the notification is dropped. Paused ticks don't count.
    pub expires_at: Tick,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub health: i32,
    pub max_health: i32,
    pub is_protected: bool,
    pub is_pending_removal: bool,
    pub is_hidden: bool,
    pub target_id: Option<String>,
}

impl From<&Combatant> for EntityView {
    fn from(c: &Combatant) -> Self {
        Self {
            id: c.id,
            kind: c.kind,
            position: c.body.position,
            velocity: c.body.velocity,
            size: c.body.size,
            health: c.health,
            max_health: c.max_health,
            is_protected: c.is_protected,
            is_pending_removal: c.is_pending_removal,
            is_hidden: c.is_hidden,
            target_id: c.identity.as_ref().map(|i| i.target_id.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileView {
    pub id: EntityId,
    pub position: Vec2,
    pub direction: Vec2,
}

impl From<&Projectile> for ProjectileView {
    fn from(p: &Projectile) -> Self {
        Self {
            id: p.id,
            position: p.position,
            direction: p.direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdversaryView {
    pub id: EntityId,
    pub position: Vec2,
}

impl From<&Adversary> for AdversaryView {
    fn from(a: &Adversary) -> Self {
        Self {
            id: a.id,
            position: a.body.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestView {
    pub id: String,
    pub name: String,
    pub state: QuestState,
    pub adversary: Option<EntityId>,
}

impl From<&Quest> for QuestView {
    fn from(q: &Quest) -> Self {
        Self {
            id: q.definition.id.clone(),
            name: q.definition.name.clone(),
            state: q.state().clone(),
            adversary: q.adversary_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcadeView {
    pub time_remaining: f32,
    pub combo_count: u32,
    pub combo_window_expires_at: f32,
    pub multiplier_active: bool,
    pub eliminations_count: u32,
    pub score: u32,
    pub max_combo: u32,
    pub pending_reports: usize,
    pub target_hostiles: usize,
}

impl From<&ArcadeSession> for ArcadeView {
    fn from(s: &ArcadeSession) -> Self {
        Self {
            time_remaining: s.time_remaining(),
            combo_count: s.combo(),
            combo_window_expires_at: s.combo_window_expires_at(),
            multiplier_active: s.multiplier_active(),
            eliminations_count: s.eliminations(),
            score: s.score(),
            max_combo: s.max_combo(),
            pending_reports: s.pending_reports(),
            target_hostiles: s.target_hostiles(),
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub tick: Tick,
    pub mode: GameMode,
    /// Mode underneath a pause; equals `mode` otherwise
    pub active_mode: GameMode,
    pub level_id: Option<LevelId>,
    pub player_health: i32,
    pub player_max_health: i32,
    pub player_position: Vec2,
    pub player_facing: Vec2,
    pub invincible_until: Tick,
    /// The player took damage on the last advanced tick
    pub damage_flash: bool,
    pub score: u32,
    pub entities: Vec<EntityView>,
    pub projectiles: Vec<ProjectileView>,
    pub adversaries: Vec<AdversaryView>,
    pub active_quest: Option<QuestView>,
    pub active_arcade: Option<ArcadeView>,
    pub notifications: Vec<Notification>,
    pub unlocked_levels: Vec<LevelId>,
}

/// What survives a save/load cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub mode: GameMode,
    pub player_health: i32,
    pub player_position: Vec2,
    pub level_id: Option<LevelId>,
    pub unlocked_levels: Vec<LevelId>,
    #[serde(default)]
    pub cleared_levels: Vec<LevelId>,
    #[serde(default)]
    pub completed_quests: Vec<String>,
    #[serde(default)]
    pub score: u32,
}
