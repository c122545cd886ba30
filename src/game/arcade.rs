//! Arcade challenge session
//!
//! A countdown, a combo tracker, a respawn scheduler that ramps difficulty,
//! and a queue of deferred elimination reports flushed in rate-limited
//! batches. The session counts its own eliminations; other code reports to
//! it through methods and never touches its fields.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::ArcadeConfig;
use crate::game::constants::arcade::MAX_SPAWN_ATTEMPTS;
use crate::game::entity::{EntityKind, Identity};
use crate::remediation::{RemediationKind, RemediationRequest};
use crate::util::vec2::Vec2;

/// A deferred elimination report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EliminationRecord {
    pub kind: RemediationKind,
    pub target_id: String,
    pub scope: String,
    /// Session time of the elimination, in milliseconds
    pub at_ms: u64,
}

impl EliminationRecord {
    pub fn into_request(self) -> RemediationRequest {
        RemediationRequest::Eliminate {
            kind: self.kind,
            target_id: self.target_id,
            scope: self.scope,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEndReason {
    TimerExpired,
    PlayerDeath,
}

/// Final stats handed to the results display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResults {
    pub reason: SessionEndReason,
    pub score: u32,
    pub max_combo: u32,
    pub eliminations: u32,
    pub survival_time: f32,
    /// Reports sent over the whole session, including the final flush
    pub reports_flushed: usize,
}

/// Horizontal strip arcade hostiles spawn on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnArea {
    pub min_x: f32,
    pub max_x: f32,
    pub y: f32,
}

/// What the session wants done after advancing one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArcadeStep {
    pub spawns: Vec<Vec2>,
    pub batch: Vec<EliminationRecord>,
    pub expired: bool,
}

/// Score and combo after one elimination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComboUpdate {
    pub combo: u32,
    pub points: u32,
}

#[derive(Debug, Clone)]
pub struct ArcadeSession {
    config: ArcadeConfig,
    time_remaining: f32,
    elapsed: f32,
    combo_count: u32,
    max_combo: u32,
    combo_window_expires_at: f32,
    eliminations_count: u32,
    score: u32,
    pending_reports: VecDeque<EliminationRecord>,
    next_batch_at: f32,
    reports_sent: usize,
    target_hostiles: usize,
    next_difficulty_at: f32,
    /// Session times at which a replacement hostile is due
    respawns: Vec<f32>,
    finished: bool,
}

impl ArcadeSession {
    pub fn new(config: ArcadeConfig) -> Self {
        Self {
            time_remaining: config.duration_secs,
            elapsed: 0.0,
            combo_count: 0,
            max_combo: 0,
            combo_window_expires_at: 0.0,
            eliminations_count: 0,
            score: 0,
            pending_reports: VecDeque::new(),
            next_batch_at: 0.0,
            reports_sent: 0,
            target_hostiles: config.initial_target_hostiles.min(config.max_target_hostiles),
            next_difficulty_at: config.difficulty_interval_secs,
            respawns: Vec::new(),
            finished: false,
            config,
        }
    }

    pub fn time_remaining(&self) -> f32 {
        self.time_remaining
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn combo(&self) -> u32 {
        self.combo_count
    }

    pub fn max_combo(&self) -> u32 {
        self.max_combo
    }

    pub fn combo_window_expires_at(&self) -> f32 {
        self.combo_window_expires_at
    }

    pub fn eliminations(&self) -> u32 {
        self.eliminations_count
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn pending_reports(&self) -> usize {
        self.pending_reports.len()
    }

    pub fn target_hostiles(&self) -> usize {
        self.target_hostiles
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the score multiplier applies to the next elimination at the current combo
    pub fn multiplier_active(&self) -> bool {
        self.combo_count >= self.config.combo_threshold
    }

    /// Count an elimination at the current session time
    pub fn record_elimination(&mut self, kind: EntityKind, identity: Option<&Identity>) -> ComboUpdate {
        let now = self.elapsed;

        let streak = self.combo_count > 0 && now <= self.combo_window_expires_at;
        // Reaching the threshold arms the multiplier; it pays out from the next elimination
        let boosted = streak && self.multiplier_active();
        if streak {
            self.combo_count += 1;
        } else {
            self.combo_count = 1;
        }
        self.combo_window_expires_at = now + self.config.combo_window_secs;
        self.max_combo = self.max_combo.max(self.combo_count);
        self.eliminations_count += 1;

        let base = kind.score();
        let points = if boosted {
            (base as f32 * self.config.combo_multiplier).round() as u32
        } else {
            base
        };
        self.score += points;

        if let (Some(remediation), Some(identity)) = (kind.remediation(), identity) {
            self.pending_reports.push_back(EliminationRecord {
                kind: remediation,
                target_id: identity.target_id.clone(),
                scope: identity.scope.clone(),
                at_ms: (now * 1000.0) as u64,
            });
        }

        if kind == EntityKind::Hostile {
            self.respawns.push(now + self.config.respawn_delay_secs);
        }

        ComboUpdate {
            combo: self.combo_count,
            points,
        }
    }

    /// The player took a hit: the combo breaks and a penalty is taken
    pub fn register_player_hit(&mut self) {
        if self.combo_count > 0 {
            tracing::debug!("Combo of {} broken by a hit", self.combo_count);
        }
        self.combo_count = 0;
        self.score = self.score.saturating_sub(self.config.hit_score_penalty);
    }

    /// Advance the session clock. `live_hostiles` is the number currently in play.
    pub fn advance<R: Rng>(
        &mut self,
        dt: f32,
        live_hostiles: usize,
        player_pos: Vec2,
        area: SpawnArea,
        rng: &mut R,
    ) -> ArcadeStep {
        let mut step = ArcadeStep::default();
        if self.finished {
            return step;
        }

        self.elapsed += dt;
        self.time_remaining = (self.time_remaining - dt).max(0.0);

        if self.combo_count > 0 && self.elapsed > self.combo_window_expires_at {
            self.combo_count = 0;
        }

        while self.elapsed >= self.next_difficulty_at {
            self.target_hostiles = (self.target_hostiles + self.config.target_step).min(self.config.max_target_hostiles);
            self.next_difficulty_at += self.config.difficulty_interval_secs;
            tracing::info!("Arcade difficulty up: {} hostiles", self.target_hostiles);
        }

        let elapsed = self.elapsed;
        self.respawns.retain(|&due| due > elapsed);
        let wanted = self
            .target_hostiles
            .saturating_sub(live_hostiles + self.respawns.len());
        step.spawns = (0..wanted).map(|_| self.pick_spawn(player_pos, area, rng)).collect();

        if !self.pending_reports.is_empty() && self.elapsed >= self.next_batch_at {
            step.batch = self.take_batch();
            self.next_batch_at = self.elapsed + self.config.report_batch_delay_secs;
            tracing::debug!("Flushed {} elimination reports, {} queued", step.batch.len(), self.pending_reports.len());
        }

        step.expired = self.time_remaining <= 0.0;
        step
    }

    fn take_batch(&mut self) -> Vec<EliminationRecord> {
        let n = self.config.report_batch_size.min(self.pending_reports.len());
        self.reports_sent += n;
        self.pending_reports.drain(..n).collect()
    }

    /// Random point on the spawn strip at least the safe distance from the
    /// player, or the far end of the strip if none is found
    fn pick_spawn<R: Rng>(&self, player_pos: Vec2, area: SpawnArea, rng: &mut R) -> Vec2 {
        let safe_sq = self.config.safe_spawn_distance * self.config.safe_spawn_distance;

        if area.max_x > area.min_x {
            for _ in 0..MAX_SPAWN_ATTEMPTS {
                let candidate = Vec2::new(rng.gen_range(area.min_x..area.max_x), area.y);
                if candidate.distance_sq_to(player_pos) >= safe_sq {
                    return candidate;
                }
            }
        }

        let left = Vec2::new(area.min_x, area.y);
        let right = Vec2::new(area.max_x, area.y);
        if left.distance_sq_to(player_pos) >= right.distance_sq_to(player_pos) {
            left
        } else {
            right
        }
    }

    /// End the session. Returns final stats plus every remaining report,
    /// already split into batches, for immediate dispatch.
    pub fn finish(&mut self, reason: SessionEndReason) -> (SessionResults, Vec<Vec<EliminationRecord>>) {
        if !invariant!(!self.finished, "arcade session finished twice") {
            return (self.results(reason), Vec::new());
        }
        self.finished = true;
        self.respawns.clear();

        let mut batches = Vec::new();
        while !self.pending_reports.is_empty() {
            batches.push(self.take_batch());
        }

        let results = self.results(reason);
        tracing::info!(
            "Arcade session over ({:?}): score {}, {} eliminations, {} reports in final flush",
            reason,
            results.score,
            results.eliminations,
            batches.iter().map(Vec::len).sum::<usize>()
        );
        (results, batches)
    }

    fn results(&self, reason: SessionEndReason) -> SessionResults {
        SessionResults {
            reason,
            score: self.score,
            max_combo: self.max_combo,
            eliminations: self.eliminations_count,
            survival_time: self.elapsed,
            reports_flushed: self.reports_sent,
        }
    }
}
