//! Top-level game mode state machine
//!
//! ```text
//! EXPLORATION --door--> PLATFORM_LEVEL --summon--> BOSS_BATTLE
//!      ^                  |   ^   ^                    |
//!      +-------exit-------+   |   +----boss defeated---+
//!                             |
//!                 ARCADE_CHALLENGE (timer expiry / death)
//!
//! any mode except PAUSED --pause--> PAUSED --resume--> previous mode
//! ```
//!
//! The machine also owns whichever challenge is live: a level's quest or an
//! arcade session, never both.

use serde::{Deserialize, Serialize};

use crate::game::arcade::ArcadeSession;
use crate::game::entity::PhysicsMode;
use crate::game::quest::{Quest, QuestStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Exploration,
    PlatformLevel,
    BossBattle,
    ArcadeChallenge,
    Paused,
}

impl GameMode {
    /// Physics policy for the player in this mode (None while paused)
    pub fn physics(&self) -> Option<PhysicsMode> {
        match self {
            GameMode::Exploration => Some(PhysicsMode::Exploration),
            GameMode::PlatformLevel | GameMode::BossBattle | GameMode::ArcadeChallenge => Some(PhysicsMode::Platform),
            GameMode::Paused => None,
        }
    }

    /// Modes whose state lives inside a level
    pub fn in_level(&self) -> bool {
        matches!(self, GameMode::PlatformLevel | GameMode::BossBattle | GameMode::ArcadeChallenge)
    }
}

/// A transition that is not available from the current state
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} while in {from:?}")]
    InvalidFrom { from: GameMode, action: &'static str },
    #[error("a quest is in progress")]
    QuestInProgress,
    #[error("no quest is waiting for a decision")]
    NoPendingQuest,
}

/// The challenge the machine currently owns
#[derive(Debug, Clone, Default)]
pub enum ActiveChallenge {
    #[default]
    None,
    Quest(Quest),
    Arcade(ArcadeSession),
}

#[derive(Debug, Clone, Default)]
pub struct ModeMachine {
    mode: GameMode,
    /// Mode to restore on resume; Some exactly while paused
    resume_to: Option<GameMode>,
    challenge: ActiveChallenge,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mode(&self) -> GameMode {
        self.mode
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.mode == GameMode::Paused
    }

    /// The mode gameplay is in, looking through a pause
    pub fn active_mode(&self) -> GameMode {
        self.resume_to.unwrap_or(self.mode)
    }

    fn expect(&self, from: GameMode, action: &'static str) -> Result<(), TransitionError> {
        if self.mode == from {
            Ok(())
        } else {
            Err(TransitionError::InvalidFrom { from: self.mode, action })
        }
    }

    fn set(&mut self, to: GameMode) {
        if self.mode != to {
            tracing::info!("Mode {:?} -> {:?}", self.mode, to);
        }
        self.mode = to;
    }

    /// Pause from any unpaused mode. The only guard is "not already paused".
    pub fn pause(&mut self) -> Result<(), TransitionError> {
        if self.is_paused() {
            return Err(TransitionError::InvalidFrom {
                from: GameMode::Paused,
                action: "pause",
            });
        }
        self.resume_to = Some(self.mode);
        self.set(GameMode::Paused);
        Ok(())
    }

    /// Return to exactly the mode that was paused
    pub fn resume(&mut self) -> Result<GameMode, TransitionError> {
        self.expect(GameMode::Paused, "resume")?;
        let previous = self.resume_to.take();
        invariant!(previous.is_some(), "paused without a mode to resume");
        let to = previous.unwrap_or(GameMode::Exploration);
        self.set(to);
        Ok(to)
    }

    /// Pause input handler: pauses or resumes
    pub fn toggle_pause(&mut self) -> GameMode {
        let result = if self.is_paused() {
            self.resume().map(|_| ())
        } else {
            self.pause()
        };
        if let Err(e) = result {
            invariant!(false, "pause toggle failed: {}", e);
        }
        self.mode
    }

    /// EXPLORATION -> PLATFORM_LEVEL, taking ownership of the level's quest
    pub fn enter_level(&mut self, quest: Option<Quest>) -> Result<(), TransitionError> {
        self.expect(GameMode::Exploration, "enter a level")?;
        self.challenge = quest.map_or(ActiveChallenge::None, ActiveChallenge::Quest);
        self.set(GameMode::PlatformLevel);
        Ok(())
    }

    /// PLATFORM_LEVEL -> EXPLORATION; the level's quest state is destroyed
    pub fn exit_level(&mut self) -> Result<(), TransitionError> {
        self.expect(GameMode::PlatformLevel, "exit the level")?;
        self.challenge = ActiveChallenge::None;
        self.set(GameMode::Exploration);
        Ok(())
    }

    /// PLATFORM_LEVEL -> BOSS_BATTLE. Refused while a quest is running.
    pub fn start_boss(&mut self) -> Result<(), TransitionError> {
        self.expect(GameMode::PlatformLevel, "summon the boss")?;
        if self.quest().is_some_and(|q| q.status() == QuestStatus::Active) {
            return Err(TransitionError::QuestInProgress);
        }
        self.set(GameMode::BossBattle);
        Ok(())
    }

    /// BOSS_BATTLE -> PLATFORM_LEVEL after the boss falls
    pub fn end_boss(&mut self) -> Result<(), TransitionError> {
        self.expect(GameMode::BossBattle, "end the boss battle")?;
        self.set(GameMode::PlatformLevel);
        Ok(())
    }

    /// PLATFORM_LEVEL -> ARCADE_CHALLENGE. A quest that has not started is
    /// dropped (the caller re-creates it afterwards); a running one blocks entry.
    pub fn start_arcade(&mut self, session: ArcadeSession) -> Result<(), TransitionError> {
        self.expect(GameMode::PlatformLevel, "start an arcade session")?;
        if self.quest().is_some_and(|q| q.status().is_in_progress()) {
            return Err(TransitionError::QuestInProgress);
        }
        self.challenge = ActiveChallenge::Arcade(session);
        self.set(GameMode::ArcadeChallenge);
        Ok(())
    }

    /// ARCADE_CHALLENGE -> PLATFORM_LEVEL. Hands back the finished session
    /// and installs the level's quest again.
    pub fn finish_arcade(&mut self, quest: Option<Quest>) -> Result<ArcadeSession, TransitionError> {
        self.expect(GameMode::ArcadeChallenge, "finish the arcade session")?;
        let previous = std::mem::replace(
            &mut self.challenge,
            quest.map_or(ActiveChallenge::None, ActiveChallenge::Quest),
        );
        self.set(GameMode::PlatformLevel);
        match previous {
            ActiveChallenge::Arcade(session) => Ok(session),
            _ => {
                invariant!(false, "arcade mode without a session");
                Err(TransitionError::InvalidFrom {
                    from: GameMode::ArcadeChallenge,
                    action: "finish the arcade session",
                })
            }
        }
    }

    /// Player death in any level mode: back to PLATFORM_LEVEL with a fresh quest.
    /// An arcade session must be finished by the caller first.
    pub fn reset_level(&mut self, quest: Option<Quest>) -> Result<(), TransitionError> {
        if !matches!(self.mode, GameMode::PlatformLevel | GameMode::BossBattle) {
            return Err(TransitionError::InvalidFrom {
                from: self.mode,
                action: "reset the level",
            });
        }
        self.challenge = quest.map_or(ActiveChallenge::None, ActiveChallenge::Quest);
        self.set(GameMode::PlatformLevel);
        Ok(())
    }

    pub fn challenge(&self) -> &ActiveChallenge {
        &self.challenge
    }

    pub fn quest(&self) -> Option<&Quest> {
        match &self.challenge {
            ActiveChallenge::Quest(q) => Some(q),
            _ => None,
        }
    }

    pub fn quest_mut(&mut self) -> Option<&mut Quest> {
        match &mut self.challenge {
            ActiveChallenge::Quest(q) => Some(q),
            _ => None,
        }
    }

    pub fn arcade(&self) -> Option<&ArcadeSession> {
        match &self.challenge {
            ActiveChallenge::Arcade(s) => Some(s),
            _ => None,
        }
    }

    pub fn arcade_mut(&mut self) -> Option<&mut ArcadeSession> {
        match &mut self.challenge {
            ActiveChallenge::Arcade(s) => Some(s),
            _ => None,
        }
    }

    /// Drop a resolved quest; its state is destroyed on resolution
    pub fn clear_resolved_quest(&mut self) -> Option<Quest> {
        if self.quest().is_some_and(|q| q.status().is_resolved()) {
            match std::mem::take(&mut self.challenge) {
                ActiveChallenge::Quest(q) => return Some(q),
                other => self.challenge = other,
            }
        }
        None
    }
}
