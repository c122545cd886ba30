//! Timed objective challenges
//!
//! Every quest runs the same machine:
//! `NotStarted -> Triggered -> Active -> Completed | Failed`.
//! Crossing the trigger line prompts the player; accepting spawns the quest's
//! adversary and starts the countdown. The player wins by reaching the
//! objective first. Resolution always undoes the quest's staging before
//! gameplay continues.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::game::entity::{AdversaryBehavior, EntityId, EntityKind};
use crate::game::mode::TransitionError;
use crate::game::systems::ai;
use crate::game::world::World;
use crate::util::vec2::Vec2;

/// Adversary counts as arrived within this distance of the objective
const ARRIVAL_EPSILON: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestDefinition {
    pub id: String,
    pub name: String,
    /// Player x at or beyond which the quest triggers
    pub trigger_x: f32,
    pub objective: Vec2,
    pub adversary_spawn: Vec2,
    pub adversary_speed: f32,
    pub behavior: AdversaryBehavior,
    /// Resource protected once the quest is completed
    pub protect_resource_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestStatus {
    NotStarted,
    Triggered,
    Active,
    Completed,
    Failed,
}

impl QuestStatus {
    pub fn is_resolved(&self) -> bool {
        matches!(self, QuestStatus::Completed | QuestStatus::Failed)
    }

    /// Triggered or Active: the quest owns part of the level right now
    pub fn is_in_progress(&self) -> bool {
        matches!(self, QuestStatus::Triggered | QuestStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuestState {
    pub status: QuestStatus,
    pub time_remaining: f32,
    pub trigger_position: Vec2,
    pub objective_position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestFailure {
    AdversaryArrived,
    TimeExpired,
    /// The player left the level mid-race
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QuestEvent {
    Triggered { quest_id: String, name: String },
    Declined { quest_id: String },
    Accepted { quest_id: String, adversary: EntityId },
    Completed { quest_id: String },
    Failed { quest_id: String, reason: QuestFailure },
}

#[derive(Debug, Clone)]
pub struct Quest {
    pub definition: QuestDefinition,
    state: QuestState,
    duration: f32,
    adversary_id: Option<EntityId>,
    /// Hostiles hidden for staging; every one is unhidden on resolution
    staged: SmallVec<[EntityId; 8]>,
    /// Cleared by a decline until the player steps back behind the trigger
    armed: bool,
    protect_requested: bool,
}

impl Quest {
    pub fn new(definition: QuestDefinition, duration: f32) -> Self {
        let state = QuestState {
            status: QuestStatus::NotStarted,
            time_remaining: duration,
            trigger_position: Vec2::new(definition.trigger_x, definition.objective.y),
            objective_position: definition.objective,
        };
        Self {
            definition,
            state,
            duration,
            adversary_id: None,
            staged: SmallVec::new(),
            armed: true,
            protect_requested: false,
        }
    }

    #[inline]
    pub fn state(&self) -> &QuestState {
        &self.state
    }

    #[inline]
    pub fn status(&self) -> QuestStatus {
        self.state.status
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn adversary_id(&self) -> Option<EntityId> {
        self.adversary_id
    }

    pub fn staged(&self) -> &[EntityId] {
        &self.staged
    }

    /// NotStarted -> Triggered when the player crosses the trigger line
    pub fn observe_player(&mut self, player_pos: Vec2) -> Option<QuestEvent> {
        if self.state.status != QuestStatus::NotStarted {
            return None;
        }

        let past_trigger = player_pos.x >= self.definition.trigger_x;
        if !self.armed {
            if !past_trigger {
                self.armed = true;
            }
            return None;
        }
        if !past_trigger {
            return None;
        }

        self.state.status = QuestStatus::Triggered;
        tracing::info!("Quest '{}' triggered", self.definition.name);
        Some(QuestEvent::Triggered {
            quest_id: self.definition.id.clone(),
            name: self.definition.name.clone(),
        })
    }

    /// Triggered -> Active: spawn the adversary, hide hostiles standing on the
    /// objective, start the countdown
    pub fn accept(&mut self, world: &mut World, staging_radius: f32) -> Result<QuestEvent, TransitionError> {
        if self.state.status != QuestStatus::Triggered {
            return Err(TransitionError::NoPendingQuest);
        }

        let adversary = world.spawn_adversary(
            self.definition.adversary_spawn,
            self.definition.adversary_speed,
            self.definition.behavior.clone(),
        );
        self.adversary_id = Some(adversary);

        let objective = self.definition.objective;
        for c in world.combatants.iter_mut() {
            if c.kind == EntityKind::Hostile
                && c.is_collidable()
                && c.position().distance_to(objective) <= staging_radius
            {
                c.is_hidden = true;
                self.staged.push(c.id);
            }
        }

        self.state.status = QuestStatus::Active;
        self.state.time_remaining = self.duration;
        tracing::info!(
            "Quest '{}' accepted: {:.0}s on the clock, {} hostiles staged",
            self.definition.name,
            self.duration,
            self.staged.len()
        );

        Ok(QuestEvent::Accepted {
            quest_id: self.definition.id.clone(),
            adversary,
        })
    }

    /// Triggered -> NotStarted; re-arms once the player is back behind the trigger
    pub fn decline(&mut self) -> Result<QuestEvent, TransitionError> {
        if self.state.status != QuestStatus::Triggered {
            return Err(TransitionError::NoPendingQuest);
        }
        self.state.status = QuestStatus::NotStarted;
        self.armed = false;
        tracing::info!("Quest '{}' declined", self.definition.name);
        Ok(QuestEvent::Declined {
            quest_id: self.definition.id.clone(),
        })
    }

    /// Advance an active quest by `dt` seconds
    pub fn update(&mut self, world: &mut World, dt: f32, objective_radius: f32) -> Option<QuestEvent> {
        if self.state.status != QuestStatus::Active {
            return None;
        }

        self.state.time_remaining = (self.state.time_remaining - dt).max(0.0);

        let objective = self.definition.objective;
        let adversary_pos = self.adversary_id.and_then(|id| {
            let adversary = world.adversaries.iter_mut().find(|a| a.id == id)?;
            Some(ai::advance_adversary(adversary, objective, dt))
        });

        let player_arrived = world.player.position().distance_to(objective) <= objective_radius;
        let adversary_arrived = adversary_pos.is_some_and(|p| p.distance_to(objective) <= ARRIVAL_EPSILON);

        // Win is checked before either lose condition
        let failure = if player_arrived {
            None
        } else if adversary_arrived {
            Some(QuestFailure::AdversaryArrived)
        } else if self.state.time_remaining <= 0.0 {
            Some(QuestFailure::TimeExpired)
        } else {
            return None;
        };

        self.cleanup(world);

        let quest_id = self.definition.id.clone();
        Some(match failure {
            None => {
                self.state.status = QuestStatus::Completed;
                tracing::info!("Quest '{}' completed", self.definition.name);
                QuestEvent::Completed { quest_id }
            }
            Some(reason) => {
                self.state.status = QuestStatus::Failed;
                tracing::info!("Quest '{}' failed: {:?}", self.definition.name, reason);
                QuestEvent::Failed { quest_id, reason }
            }
        })
    }

    /// Undo everything the quest set up in the world
    fn cleanup(&mut self, world: &mut World) {
        for id in self.staged.drain(..) {
            if let Some(c) = world.combatant_mut(id) {
                c.is_hidden = false;
            }
        }
        if let Some(id) = self.adversary_id.take() {
            world.despawn_adversary(id);
        }
    }

    /// Fail an active quest because the player walked out on it
    pub fn abandon(&mut self, world: &mut World) -> Option<QuestEvent> {
        if self.state.status != QuestStatus::Active {
            return None;
        }
        self.cleanup(world);
        self.state.status = QuestStatus::Failed;
        tracing::info!("Quest '{}' abandoned", self.definition.name);
        Some(QuestEvent::Failed {
            quest_id: self.definition.id.clone(),
            reason: QuestFailure::Abandoned,
        })
    }

    /// Back to NotStarted with a full clock, undoing any staging. Used by level reset.
    pub fn reset(&mut self, world: &mut World) {
        self.cleanup(world);
        self.state.status = QuestStatus::NotStarted;
        self.state.time_remaining = self.duration;
        self.armed = true;
    }

    /// Resource to protect, handed out exactly once after completion
    pub fn take_protect_request(&mut self) -> Option<String> {
        if self.state.status == QuestStatus::Completed && !self.protect_requested {
            self.protect_requested = true;
            Some(self.definition.protect_resource_id.clone())
        } else {
            None
        }
    }
}
