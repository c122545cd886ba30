//! Events produced during a tick

use serde::{Deserialize, Serialize};

use crate::game::arcade::SessionResults;
use crate::game::entity::{EntityId, EntityKind, Identity, Tick};
use crate::game::mode::GameMode;
use crate::game::quest::QuestEvent;

/// What removed an entity's last health point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EliminationCause {
    Projectile,
}

/// Emitted exactly once per entity, on the tick its health reached zero
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationEvent {
    pub target: EntityId,
    pub kind: EntityKind,
    pub identity: Option<Identity>,
    pub cause: EliminationCause,
    pub tick: Tick,
}

/// The player's health reached zero. The mode machine reacts, not the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDeathEvent {
    pub tick: Tick,
    /// Entity that landed the final hit
    pub killer: EntityId,
}

/// Everything notable that happened during one `Game::tick`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: Tick,
    /// False when the game was paused and nothing advanced
    pub advanced: bool,
    pub eliminations: Vec<EliminationEvent>,
    pub player_hits: u32,
    pub player_death: Option<PlayerDeathEvent>,
    /// Renderer hint: the player took damage this tick
    pub damage_flash: bool,
    pub mode_changes: Vec<(GameMode, GameMode)>,
    pub quest_events: Vec<QuestEvent>,
    pub arcade_results: Option<SessionResults>,
    pub level_cleared: Option<u32>,
    pub remediation_failures: usize,
}
