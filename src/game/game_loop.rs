//! Main game orchestration
//!
//! `Game` owns the world, the mode machine and every collaborator. Input
//! goes through `handle_input` (directly, or via the input buffer drained at
//! the start of each tick); everything else happens inside `tick`.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use hashbrown::HashSet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::runtime::Handle;

use crate::config::GameConfig;
use crate::game::arcade::{ArcadeSession, SessionEndReason, SessionResults, SpawnArea};
use crate::game::constants::{self, display, hostile, level};
use crate::game::entity::{EntityKind, Identity, Player, Tick};
use crate::game::events::TickReport;
use crate::game::input_buffer::{InputAction, InputBuffer, InputSender};
use crate::game::level::{ExemptionList, LevelCatalog, LevelId, LevelTemplate};
use crate::game::mode::{GameMode, ModeMachine, TransitionError};
use crate::game::performance::FrameBudget;
use crate::game::quest::{Quest, QuestEvent};
use crate::game::snapshot::{
    AdversaryView, ArcadeView, EntityView, GameSnapshot, Notification, PersistedState, ProjectileView, QuestView,
};
use crate::game::spatial::SpatialGrid;
use crate::game::systems::physics::{self, MoveIntent};
use crate::game::systems::{ai, combat, projectile};
use crate::game::world::{Arena, World};
use crate::remediation::{DisplayLayer, RemediationClient, RemediationDispatcher};
use crate::util::vec2::Vec2;

/// Held and one-shot controls collected from input
#[derive(Debug, Clone, Copy, Default)]
struct Controls {
    direction: Vec2,
    jump: bool,
    fire: bool,
}

pub struct Game {
    config: GameConfig,
    catalog: LevelCatalog,
    exemptions: ExemptionList,
    machine: ModeMachine,
    world: World,
    grid: SpatialGrid,
    dispatcher: RemediationDispatcher,
    display: Arc<dyn DisplayLayer>,
    inputs: InputBuffer,
    controls: Controls,
    tick: Tick,
    level_id: Option<LevelId>,
    unlocked: BTreeSet<LevelId>,
    cleared: BTreeSet<LevelId>,
    completed_quests: HashSet<String>,
    score: u32,
    notifications: VecDeque<Notification>,
    /// Quest events produced by input handling, reported on the next tick
    pending_events: Vec<QuestEvent>,
    /// Real level identities handed to arcade spawns, each used once
    arcade_identities: VecDeque<Identity>,
    last_results: Option<SessionResults>,
    damage_flash: bool,
    reported_mode: GameMode,
    rng: StdRng,
    frame: FrameBudget,
}

/// Fresh quest for a level unless it was already completed
fn level_quest(level: &LevelTemplate, completed: &HashSet<String>, duration: f32) -> Option<Quest> {
    level
        .quest
        .as_ref()
        .filter(|def| !completed.contains(&def.id))
        .map(|def| Quest::new(def.clone(), duration))
}

fn clamp_into(arena: &Arena, position: Vec2) -> Vec2 {
    Vec2::new(position.x.clamp(0.0, arena.width), position.y.clamp(0.0, arena.height))
}

impl Game {
    /// New game in exploration mode over a generated level catalogue
    pub fn new(
        config: GameConfig,
        client: Arc<dyn RemediationClient>,
        display: Arc<dyn DisplayLayer>,
        runtime: Handle,
    ) -> Self {
        let catalog = LevelCatalog::generate(config.rng_seed, level::COUNT);
        let map = &catalog.map;
        let world = World::new(
            Player::new(map.spawn, config.player.max_health),
            Arena {
                width: map.width,
                height: map.height,
                ground_y: None,
            },
        );

        Self {
            grid: SpatialGrid::new(config.spatial_cell_size),
            dispatcher: RemediationDispatcher::new(client, runtime),
            unlocked: catalog.first().into_iter().collect(),
            rng: StdRng::seed_from_u64(config.rng_seed),
            frame: FrameBudget::new(config.tick_rate),
            config,
            catalog,
            exemptions: ExemptionList::default(),
            machine: ModeMachine::new(),
            world,
            display,
            inputs: InputBuffer::default(),
            controls: Controls::default(),
            tick: 0,
            level_id: None,
            cleared: BTreeSet::new(),
            completed_quests: HashSet::new(),
            score: 0,
            notifications: VecDeque::new(),
            pending_events: Vec::new(),
            arcade_identities: VecDeque::new(),
            last_results: None,
            damage_flash: false,
            reported_mode: GameMode::Exploration,
        }
    }

    /// Swap in explicit level data. Only meaningful before play starts.
    pub fn with_catalog(mut self, catalog: LevelCatalog) -> Self {
        self.catalog = catalog;
        self.unlocked = self.catalog.first().into_iter().collect();
        self.cleared.clear();
        self.level_id = None;
        self.machine = ModeMachine::new();
        self.world.load_exploration(&self.catalog.map, self.catalog.map.spawn);
        self
    }

    /// Identities that spawn protected
    pub fn with_exemptions(mut self, exemptions: ExemptionList) -> Self {
        self.exemptions = exemptions;
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    pub fn machine(&self) -> &ModeMachine {
        &self.machine
    }

    #[inline]
    pub fn mode(&self) -> GameMode {
        self.machine.mode()
    }

    #[inline]
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn current_level(&self) -> Option<LevelId> {
        self.level_id
    }

    pub fn unlocked_levels(&self) -> impl Iterator<Item = LevelId> + '_ {
        self.unlocked.iter().copied()
    }

    pub fn exemptions(&self) -> &ExemptionList {
        &self.exemptions
    }

    pub fn dispatcher(&self) -> &RemediationDispatcher {
        &self.dispatcher
    }

    pub fn last_results(&self) -> Option<&SessionResults> {
        self.last_results.as_ref()
    }

    pub fn frame_budget(&self) -> &FrameBudget {
        &self.frame
    }

    /// Handle for input sources on other threads
    pub fn input_sender(&self) -> InputSender {
        self.inputs.sender()
    }

    /// Queue an action for the next tick. False if the buffer is full.
    pub fn submit(&self, action: InputAction) -> bool {
        self.inputs.try_submit(action)
    }

    /// Apply one player action. While paused only `Pause` is honored.
    pub fn handle_input(&mut self, action: InputAction) -> Result<(), TransitionError> {
        if action == InputAction::Pause {
            self.machine.toggle_pause();
            return Ok(());
        }
        if self.machine.is_paused() {
            return Err(TransitionError::InvalidFrom {
                from: GameMode::Paused,
                action: "act",
            });
        }

        match action {
            InputAction::Move(direction) => self.controls.direction = direction,
            InputAction::Jump => self.controls.jump = true,
            InputAction::Fire => self.controls.fire = true,
            InputAction::AcceptQuest => {
                self.require(GameMode::PlatformLevel, "accept a quest")?;
                let staging = self.config.quest.staging_radius;
                let quest = self.machine.quest_mut().ok_or(TransitionError::NoPendingQuest)?;
                let event = quest.accept(&mut self.world, staging)?;
                self.pending_events.push(event);
            }
            InputAction::DeclineQuest => {
                self.require(GameMode::PlatformLevel, "decline a quest")?;
                let quest = self.machine.quest_mut().ok_or(TransitionError::NoPendingQuest)?;
                let event = quest.decline()?;
                self.pending_events.push(event);
            }
            InputAction::EnterArcade => {
                self.machine
                    .start_arcade(ArcadeSession::new(self.config.arcade.clone()))?;
                let exemptions = &self.exemptions;
                self.arcade_identities = self
                    .world
                    .combatants
                    .iter()
                    .filter(|c| c.kind == EntityKind::Hostile && !c.is_protected && c.is_collidable())
                    .filter_map(|c| c.identity.clone())
                    .filter(|i| !exemptions.contains(&i.target_id))
                    .collect();
                self.world.stash_combatants();
                tracing::info!(
                    "Arcade session started: {:.0}s, {} identities in the pool",
                    self.config.arcade.duration_secs,
                    self.arcade_identities.len()
                );
            }
            InputAction::SummonBoss => {
                self.machine.start_boss()?;
                let spec = self.level_id.and_then(|id| self.catalog.level(id)).map(|l| l.boss);
                if let Some(spec) = spec {
                    let id = self
                        .world
                        .spawn_combatant(EntityKind::Boss(spec.pattern), None, spec.position);
                    tracing::info!("Boss {} ({:?}) summoned", id, spec.pattern);
                } else {
                    invariant!(false, "boss battle outside a level");
                }
            }
            InputAction::Pause => {}
        }
        Ok(())
    }

    fn require(&self, mode: GameMode, action: &'static str) -> Result<(), TransitionError> {
        if self.machine.mode() == mode {
            Ok(())
        } else {
            Err(TransitionError::InvalidFrom {
                from: self.machine.mode(),
                action,
            })
        }
    }

    /// Run one fixed-timestep tick. A paused game does not advance at all.
    pub fn tick(&mut self) -> TickReport {
        self.frame.tick_start();

        for action in self.inputs.drain() {
            if let Err(e) = self.handle_input(action) {
                tracing::debug!("Input {:?} rejected: {}", action, e);
            }
        }

        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        if self.machine.is_paused() {
            self.note_mode_change(&mut report);
            return report;
        }

        self.tick += 1;
        let now = self.tick;
        report.tick = now;
        report.advanced = true;
        report.quest_events.append(&mut self.pending_events);

        self.process_outcomes(now, &mut report);
        self.notifications.retain(|n| n.expires_at > now);
        self.damage_flash = false;

        if self.machine.mode() == GameMode::Exploration {
            self.step_exploration();
        } else {
            self.step_level(now, &mut report);
        }

        self.world.reap(now);
        self.controls.jump = false;
        self.controls.fire = false;
        self.note_mode_change(&mut report);

        self.frame.tick_end(self.world.entity_count());
        report
    }

    fn note_mode_change(&mut self, report: &mut TickReport) {
        let mode = self.machine.mode();
        if mode != self.reported_mode {
            report.mode_changes.push((self.reported_mode, mode));
            self.reported_mode = mode;
        }
    }

    /// Surface remediation results that arrived since the last tick
    fn process_outcomes(&mut self, now: Tick, report: &mut TickReport) {
        for outcome in self.dispatcher.drain_outcomes() {
            match &outcome.result {
                Ok(ack) => {
                    tracing::debug!("Remediation of {} acknowledged ({})", outcome.request.target(), ack.reference);
                }
                Err(e) => {
                    let message = format!("Remediation failed for {}: {}", outcome.request.target(), e);
                    tracing::warn!("{}", message);
                    self.display.notify_error(&message);
                    self.notify(message, now);
                    report.remediation_failures += 1;
                }
            }
        }
    }

    fn notify(&mut self, message: String, now: Tick) {
        let ttl = constants::secs_to_ticks(display::NOTIFICATION_SECS, self.config.tick_rate);
        self.notifications.push_back(Notification {
            message,
            expires_at: now + ttl,
        });
        while self.notifications.len() > display::MAX_NOTIFICATIONS {
            self.notifications.pop_front();
        }
    }

    fn step_exploration(&mut self) {
        let intent = MoveIntent {
            direction: self.controls.direction,
            jump: false,
        };
        physics::update_player(
            &mut self.world.player,
            intent,
            self.config.player.run_speed,
            self.config.player.walk_speed,
            self.config.dt(),
            &self.world.arena,
        );

        let door = self
            .catalog
            .map
            .door_at(self.world.player.position())
            .map(|d| d.level_id);
        match door {
            Some(id) if self.unlocked.contains(&id) => {
                self.enter_level(id);
            }
            Some(id) => tracing::trace!("Door to level {} is locked", id),
            None => {}
        }
    }

    fn enter_level(&mut self, id: LevelId) -> bool {
        let Some(level) = self.catalog.level(id) else {
            tracing::warn!("Unknown level {}", id);
            return false;
        };

        let quest = level_quest(level, &self.completed_quests, self.config.quest.duration_secs);
        if let Err(e) = self.machine.enter_level(quest) {
            tracing::debug!("Cannot enter level {}: {}", id, e);
            return false;
        }

        self.world.load_level(level, &self.exemptions);
        self.level_id = Some(id);
        tracing::info!("Entered {} ({} combatants)", level.name, self.world.combatants.len());
        true
    }

    fn step_level(&mut self, now: Tick, report: &mut TickReport) {
        let dt = self.config.dt();

        let intent = MoveIntent {
            direction: self.controls.direction,
            jump: self.controls.jump,
        };
        physics::update_player(
            &mut self.world.player,
            intent,
            self.config.player.run_speed,
            self.config.player.walk_speed,
            dt,
            &self.world.arena,
        );

        if self.controls.fire {
            projectile::fire(&mut self.world, &self.config, now);
        }

        let player_pos = self.world.player.position();
        ai::update_combatants(&mut self.world.combatants, player_pos, self.world.arena.ground_y, dt);
        physics::update_combatants(&mut self.world.combatants, dt, &self.world.arena);
        projectile::update(&mut self.world.projectiles, dt, &self.world.arena);

        let combat = combat::resolve_tick(&mut self.world, &mut self.grid, now, self.config.invincibility_ticks());
        report.player_hits = combat.player_hits;
        report.damage_flash = combat.damage_flash;
        self.damage_flash = combat.damage_flash;

        for event in &combat.eliminations {
            self.on_elimination(event.kind, event.identity.as_ref());
        }
        report.eliminations = combat.eliminations;

        if combat.player_hits > 0 {
            if let Some(session) = self.machine.arcade_mut() {
                session.register_player_hit();
            }
        }

        if let Some(death) = combat.player_death {
            report.player_death = Some(death);
            if self.machine.mode() == GameMode::ArcadeChallenge {
                self.finish_arcade(SessionEndReason::PlayerDeath, report);
            }
            self.reset_level();
            return;
        }

        match self.machine.mode() {
            GameMode::PlatformLevel => {
                self.step_quest(dt, report);
                self.check_cleared(now, report);
                self.check_exit(report);
            }
            GameMode::ArcadeChallenge => self.step_arcade(dt, report),
            _ => {}
        }
    }

    fn on_elimination(&mut self, kind: EntityKind, identity: Option<&Identity>) {
        if let Some(session) = self.machine.arcade_mut() {
            let update = session.record_elimination(kind, identity);
            tracing::debug!("Arcade elimination: combo {}, +{}", update.combo, update.points);
            // The stand-in carried a level identity; its original must not come back
            if let Some(identity) = identity {
                self.world.consume_stashed(&identity.target_id);
            }
        } else {
            self.score += kind.score();
            if let (Some(remediation), Some(identity)) = (kind.remediation(), identity) {
                self.dispatcher
                    .eliminate(remediation, &identity.target_id, &identity.scope);
            }
        }

        if kind.is_boss() {
            match self.machine.end_boss() {
                Ok(()) => tracing::info!("Boss defeated"),
                Err(e) => tracing::debug!("Boss eliminated outside a boss battle: {}", e),
            }
        }
    }

    /// Reload the current level after the player died
    fn reset_level(&mut self) {
        let Some(level) = self.level_id.and_then(|id| self.catalog.level(id)) else {
            invariant!(false, "player died outside a level");
            return;
        };

        let quest = level_quest(level, &self.completed_quests, self.config.quest.duration_secs);
        self.world.load_level(level, &self.exemptions);
        if let Err(e) = self.machine.reset_level(quest) {
            invariant!(false, "level reset refused: {}", e);
        }
        tracing::info!("Player died, {} restarted", level.name);
    }

    fn step_quest(&mut self, dt: f32, report: &mut TickReport) {
        let player_pos = self.world.player.position();
        let objective_radius = self.config.quest.objective_radius;

        let Some(quest) = self.machine.quest_mut() else {
            return;
        };

        if let Some(event) = quest.observe_player(player_pos) {
            if let QuestEvent::Triggered { name, .. } = &event {
                self.display.present_quest_prompt(name);
            }
            report.quest_events.push(event);
        }

        if let Some(event) = quest.update(&mut self.world, dt, objective_radius) {
            if let QuestEvent::Completed { quest_id } = &event {
                self.completed_quests.insert(quest_id.clone());
            }
            if let Some(resource) = quest.take_protect_request() {
                self.dispatcher.protect(&resource);
            }
            report.quest_events.push(event);
        }

        self.machine.clear_resolved_quest();
    }

    /// Unlock the next level once every unprotected target is gone
    fn check_cleared(&mut self, now: Tick, report: &mut TickReport) {
        let Some(id) = self.level_id else {
            return;
        };
        if self.cleared.contains(&id) || self.world.remaining_targets() > 0 {
            return;
        }

        self.cleared.insert(id);
        report.level_cleared = Some(id);
        tracing::info!("Level {} cleared", id);

        if let Some(next) = self.catalog.next_after(id) {
            if self.unlocked.insert(next) {
                self.notify(format!("Level {next} unlocked"), now);
            }
        }
    }

    fn check_exit(&mut self, report: &mut TickReport) {
        let Some(id) = self.level_id else {
            return;
        };
        let Some(exit) = self.catalog.level(id).map(|l| l.exit) else {
            return;
        };
        if !self.world.player.bounds().overlaps(&exit) {
            return;
        }
        if let Some(event) = self.machine.quest_mut().and_then(|q| q.abandon(&mut self.world)) {
            report.quest_events.push(event);
        }
        if let Err(e) = self.machine.exit_level() {
            tracing::debug!("Exit refused: {}", e);
            return;
        }

        let map = &self.catalog.map;
        let return_point = map.door_for(id).map_or(map.spawn, |d| d.return_point());
        self.world.load_exploration(map, return_point);
        self.level_id = None;
        tracing::info!("Left level {}", id);
    }

    fn step_arcade(&mut self, dt: f32, report: &mut TickReport) {
        let live = self.world.live_count(EntityKind::Hostile);
        let player_pos = self.world.player.position();
        let arena = self.world.arena;
        let area = SpawnArea {
            min_x: hostile::WIDTH,
            max_x: arena.width - hostile::WIDTH,
            y: arena.ground_y.unwrap_or(arena.height) - hostile::HEIGHT * 0.5,
        };

        let Some(session) = self.machine.arcade_mut() else {
            invariant!(false, "arcade mode without a session");
            return;
        };
        let step = session.advance(dt, live, player_pos, area, &mut self.rng);

        let allowed = self.frame.spawn_allowance(live, step.spawns.len());
        if allowed < step.spawns.len() {
            tracing::debug!("Frame budget held back {} spawns", step.spawns.len() - allowed);
        }
        for position in step.spawns.into_iter().take(allowed) {
            let identity = self.next_arcade_identity();
            let protected = identity
                .as_ref()
                .is_some_and(|i| self.exemptions.contains(&i.target_id));
            let id = self.world.spawn_combatant(EntityKind::Hostile, identity, position);
            if let Some(c) = self.world.combatant_mut(id) {
                c.is_protected = protected;
            }
        }

        for record in step.batch {
            self.dispatcher.dispatch(record.into_request());
        }

        if step.expired {
            self.finish_arcade(SessionEndReason::TimerExpired, report);
        }
    }

    /// Next pooled identity that is still eligible for elimination
    fn next_arcade_identity(&mut self) -> Option<Identity> {
        while let Some(identity) = self.arcade_identities.pop_front() {
            if !self.exemptions.contains(&identity.target_id) {
                return Some(identity);
            }
        }
        None
    }

    /// Close the running session: flush every queued report, restore the
    /// level, show results
    fn finish_arcade(&mut self, reason: SessionEndReason, report: &mut TickReport) {
        let Some(session) = self.machine.arcade_mut() else {
            return;
        };
        let (results, batches) = session.finish(reason);
        for record in batches.into_iter().flatten() {
            self.dispatcher.dispatch(record.into_request());
        }

        let quest = self
            .level_id
            .and_then(|id| self.catalog.level(id))
            .and_then(|l| level_quest(l, &self.completed_quests, self.config.quest.duration_secs));
        if let Err(e) = self.machine.finish_arcade(quest) {
            invariant!(false, "arcade finish refused: {}", e);
        }
        self.world.restore_stashed();
        self.arcade_identities.clear();

        self.score += results.score;
        self.display.show_session_results(&results);
        report.arcade_results = Some(results.clone());
        self.last_results = Some(results);
    }

    /// Mark or unmark an identity as protected, updating live entities.
    /// Returns how many live entities changed.
    pub fn set_protection(&mut self, target_id: &str, protected: bool) -> usize {
        if protected {
            self.exemptions.insert(target_id);
        } else {
            self.exemptions.remove(target_id);
        }

        let mut changed = 0;
        for c in self.world.combatants.iter_mut() {
            let matches = c.identity.as_ref().is_some_and(|i| i.target_id == target_id);
            if matches && c.is_protected != protected {
                c.is_protected = protected;
                changed += 1;
            }
        }
        // Level combatants parked for an arcade session come back with the new flag
        for c in self.world.stashed_mut() {
            if c.identity.as_ref().is_some_and(|i| i.target_id == target_id) {
                c.is_protected = protected;
            }
        }
        tracing::info!("{} {} ({} live entities)", if protected { "Protected" } else { "Unprotected" }, target_id, changed);
        changed
    }

    /// Read-only view of the whole game for a renderer
    pub fn snapshot(&self) -> GameSnapshot {
        let player = &self.world.player;
        GameSnapshot {
            tick: self.tick,
            mode: self.machine.mode(),
            active_mode: self.machine.active_mode(),
            level_id: self.level_id,
            player_health: player.health,
            player_max_health: player.max_health,
            player_position: player.position(),
            player_facing: player.facing,
            invincible_until: player.invincible_until,
            damage_flash: self.damage_flash,
            score: self.score,
            entities: self.world.combatants.iter().map(EntityView::from).collect(),
            projectiles: self.world.projectiles.iter().map(ProjectileView::from).collect(),
            adversaries: self.world.adversaries.iter().map(AdversaryView::from).collect(),
            active_quest: self.machine.quest().map(QuestView::from),
            active_arcade: self.machine.arcade().map(ArcadeView::from),
            notifications: self.notifications.iter().cloned().collect(),
            unlocked_levels: self.unlocked.iter().copied().collect(),
        }
    }

    /// Record to persist. Boss battles and arcade sessions are not resumable
    /// and save as the level they were started from.
    pub fn save_state(&self) -> PersistedState {
        let mode = match self.machine.mode() {
            GameMode::BossBattle | GameMode::ArcadeChallenge => GameMode::PlatformLevel,
            mode => mode,
        };
        PersistedState {
            mode,
            player_health: self.world.player.health,
            player_position: self.world.player.position(),
            level_id: self.level_id,
            unlocked_levels: self.unlocked.iter().copied().collect(),
            cleared_levels: self.cleared.iter().copied().collect(),
            completed_quests: self.completed_quests.iter().cloned().collect(),
            score: self.score,
        }
    }

    /// Rebuild progress, mode and player from a saved record
    pub fn load_state(&mut self, state: &PersistedState) {
        self.machine = ModeMachine::new();
        self.world.clear_area();
        self.level_id = None;
        self.controls = Controls::default();
        self.pending_events.clear();

        self.unlocked = state
            .unlocked_levels
            .iter()
            .copied()
            .chain(self.catalog.first())
            .filter(|id| self.catalog.level(*id).is_some())
            .collect();
        self.cleared = state.cleared_levels.iter().copied().collect();
        self.completed_quests = state.completed_quests.iter().cloned().collect();
        self.score = state.score;

        let level = match state.mode {
            GameMode::Exploration => None,
            _ => state.level_id.filter(|id| self.catalog.level(*id).is_some()),
        };
        if state.level_id.is_some() && level.is_none() && state.mode != GameMode::Exploration {
            tracing::warn!("Saved level {:?} no longer exists, loading exploration", state.level_id);
        }

        match level {
            Some(id) if self.enter_level(id) => {
                self.world.player.body.position = clamp_into(&self.world.arena, state.player_position);
            }
            _ => {
                let map = &self.catalog.map;
                let arena = Arena {
                    width: map.width,
                    height: map.height,
                    ground_y: None,
                };
                self.world.load_exploration(map, clamp_into(&arena, state.player_position));
            }
        }

        let max = self.world.player.max_health;
        self.world.player.set_health(state.player_health.clamp(1, max));

        if state.mode == GameMode::Paused {
            self.machine.toggle_pause();
        }
        self.reported_mode = self.machine.mode();
        tracing::info!("Loaded save: {:?} at level {:?}", self.machine.mode(), self.level_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entity::AdversaryBehavior;
    use crate::game::level::{BossSpec, Door, ExplorationMap, SpawnSpec};
    use crate::game::entity::Combatant;
    use crate::game::quest::{QuestDefinition, QuestFailure, QuestStatus};
    use crate::remediation::{RecordingDisplay, RemediationRequest, SimulatedClient};
    use crate::game::entity::AttackPattern;
    use crate::util::vec2::Rect;
    use std::time::{Duration, Instant};

    struct Harness {
        game: Game,
        client: Arc<SimulatedClient>,
        display: Arc<RecordingDisplay>,
        _runtime: tokio::runtime::Runtime,
    }

    fn catalog() -> LevelCatalog {
        let level = LevelTemplate {
            id: 1,
            name: "Test Level".to_string(),
            width: 2000.0,
            height: 800.0,
            ground_y: 600.0,
            entry: Vec2::new(80.0, 580.0),
            exit: Rect::new(1936.0, 0.0, 64.0, 800.0),
            spawns: vec![
                SpawnSpec {
                    kind: EntityKind::Hostile,
                    identity: Identity::new("zombie-a", "acct"),
                    position: Vec2::new(600.0, 580.0),
                },
                SpawnSpec {
                    kind: EntityKind::ThirdParty,
                    identity: Identity::new("access-a", "acct"),
                    position: Vec2::new(900.0, 576.0),
                },
            ],
            quest: Some(QuestDefinition {
                id: "quest-1".to_string(),
                name: "Outrun the Hacker".to_string(),
                trigger_x: 300.0,
                objective: Vec2::new(1500.0, 580.0),
                adversary_spawn: Vec2::new(400.0, 580.0),
                adversary_speed: 90.0,
                behavior: AdversaryBehavior::Racer,
                protect_resource_id: "jewel".to_string(),
            }),
            boss: BossSpec {
                pattern: AttackPattern::Charger,
                position: Vec2::new(1000.0, 552.0),
            },
        };
        let map = ExplorationMap {
            width: 800.0,
            height: 600.0,
            // Standing in the door: the first tick enters the level
            spawn: Vec2::new(132.0, 132.0),
            doors: vec![Door {
                level_id: 1,
                region: Rect::new(100.0, 100.0, 64.0, 64.0),
            }],
        };
        LevelCatalog::from_parts(vec![level], map)
    }

    fn harness_with(config: GameConfig) -> Harness {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap();
        let client = Arc::new(SimulatedClient::default());
        let display = Arc::new(RecordingDisplay::new());
        let game = Game::new(config, client.clone(), display.clone(), runtime.handle().clone()).with_catalog(catalog());
        Harness {
            game,
            client,
            display,
            _runtime: runtime,
        }
    }

    fn in_level() -> Harness {
        let mut h = harness_with(GameConfig::default());
        h.game.tick();
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);
        h
    }

    fn wait_idle(game: &Game) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while game.dispatcher().in_flight() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Put the first hostile one shot from death right in front of the player and shoot it
    fn shoot_first_hostile(game: &mut Game) -> Vec<TickReport> {
        let x = game.world.player.position().x + 120.0;
        let hostile = &mut game.world.combatants[0];
        hostile.health = 1;
        hostile.body.position.x = x;
        hostile.spawn_point.x = x;

        game.handle_input(InputAction::Fire).unwrap();
        (0..10).map(|_| game.tick()).collect()
    }

    fn eliminations(reports: &[TickReport]) -> usize {
        reports.iter().map(|r| r.eliminations.len()).sum()
    }

    #[test]
    fn test_door_enters_level_and_exit_returns() {
        let mut h = harness_with(GameConfig::default());
        assert_eq!(h.game.mode(), GameMode::Exploration);

        let report = h.game.tick();
        assert_eq!(report.mode_changes, vec![(GameMode::Exploration, GameMode::PlatformLevel)]);
        assert_eq!(h.game.current_level(), Some(1));
        assert_eq!(h.game.world().combatants.len(), 2);
        assert!(h.game.machine().quest().is_some());

        h.game.world.player.body.position.x = 1950.0;
        h.game.tick();
        assert_eq!(h.game.mode(), GameMode::Exploration);
        assert_eq!(h.game.current_level(), None);
        let back = h.game.world().player.position();
        assert!(back.approx_eq(Vec2::new(132.0, 244.0), 1.0));
        assert!(h.game.world().combatants.is_empty());
    }

    #[test]
    fn test_paused_tick_does_not_advance() {
        let mut h = in_level();
        let before = h.game.current_tick();
        h.game.handle_input(InputAction::Pause).unwrap();

        let position = h.game.world().combatants[0].position();
        for _ in 0..30 {
            let report = h.game.tick();
            assert!(!report.advanced);
        }
        assert_eq!(h.game.current_tick(), before);
        assert_eq!(h.game.world().combatants[0].position(), position);

        assert!(h.game.handle_input(InputAction::Fire).is_err());
        h.game.handle_input(InputAction::Pause).unwrap();
        assert!(h.game.tick().advanced);
    }

    #[test]
    fn test_elimination_dispatches_remediation_immediately() {
        let mut h = in_level();
        assert_eq!(eliminations(&shoot_first_hostile(&mut h.game)), 1);
        assert_eq!(h.game.score(), 100);

        wait_idle(&h.game);
        assert!(h.client.requests().iter().any(|r| matches!(
            r,
            RemediationRequest::Eliminate { target_id, .. } if target_id == "zombie-a"
        )));
        assert_eq!(h.game.world().combatants.len(), 1);
    }

    #[test]
    fn test_remediation_failure_surfaces_once() {
        let mut h = in_level();
        h.client.fail_target("zombie-a");
        let mut reports = shoot_first_hostile(&mut h.game);
        wait_idle(&h.game);
        reports.extend((0..3).map(|_| h.game.tick()));

        let failures: usize = reports.iter().map(|r| r.remediation_failures).sum();
        assert_eq!(failures, 1);
        assert_eq!(h.display.errors().len(), 1);
        assert_eq!(h.game.snapshot().notifications.len(), 1);
    }

    #[test]
    fn test_protected_identity_cannot_be_shot() {
        let mut h = in_level();
        assert_eq!(h.game.set_protection("zombie-a", true), 1);
        let reports = shoot_first_hostile(&mut h.game);
        // The shot passes through; anything it hits behind carries no identity
        assert!(reports
            .iter()
            .flat_map(|r| r.eliminations.iter())
            .all(|e| e.identity.is_none()));
        assert_eq!(h.game.world().combatants[0].health, 1);

        assert_eq!(h.game.set_protection("zombie-a", false), 1);
        h.game.world.player.fire_ready_at = 0;
        assert_eq!(eliminations(&shoot_first_hostile(&mut h.game)), 1);
    }

    #[test]
    fn test_death_resets_level() {
        let mut h = in_level();
        h.game.world.player.health = 1;
        let player_pos = h.game.world.player.position();
        h.game.world.combatants[0].body.position = player_pos;

        let report = h.game.tick();
        assert!(report.player_death.is_some());
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);
        assert_eq!(h.game.world().player.health, h.game.world().player.max_health);
        assert_eq!(h.game.world().combatants.len(), 2);
        assert_eq!(h.game.machine().quest().map(|q| q.status()), Some(QuestStatus::NotStarted));
    }

    #[test]
    fn test_quest_prompt_shown_on_trigger() {
        let mut h = in_level();
        h.game.world.player.body.position.x = 310.0;
        let report = h.game.tick();
        assert!(matches!(report.quest_events.as_slice(), [QuestEvent::Triggered { .. }]));
        assert_eq!(h.display.prompts(), vec!["Outrun the Hacker".to_string()]);

        h.game.handle_input(InputAction::AcceptQuest).unwrap();
        let report = h.game.tick();
        assert!(matches!(report.quest_events.first(), Some(QuestEvent::Accepted { .. })));
        assert_eq!(h.game.world().adversaries.len(), 1);
        assert_eq!(h.game.handle_input(InputAction::SummonBoss), Err(TransitionError::QuestInProgress));
    }

    #[test]
    fn test_boss_defeat_returns_to_level() {
        let mut h = in_level();
        h.game.handle_input(InputAction::SummonBoss).unwrap();
        h.game.tick();
        assert_eq!(h.game.mode(), GameMode::BossBattle);

        let boss = h.game.world.combatants.iter_mut().find(|c| c.kind.is_boss()).unwrap();
        boss.health = 1;
        boss.body.position = Vec2::new(200.0, 552.0);
        h.game.handle_input(InputAction::Fire).unwrap();
        for _ in 0..10 {
            h.game.tick();
        }
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);
        assert_eq!(h.game.score(), 1000);
    }

    #[test]
    fn test_arcade_session_runs_and_restores_level() {
        let mut config = GameConfig::default();
        config.arcade.duration_secs = 1.0;
        let mut h = harness_with(config);
        h.game.tick();

        h.game.handle_input(InputAction::EnterArcade).unwrap();
        assert_eq!(h.game.mode(), GameMode::ArcadeChallenge);
        assert!(h.game.world().has_stash());

        h.game.tick();
        assert_eq!(
            h.game.world().live_count(EntityKind::Hostile),
            h.game.config().arcade.initial_target_hostiles
        );
        // The level's one hostile identity goes to the first arcade spawn
        assert_eq!(
            h.game
                .world()
                .combatants
                .iter()
                .filter(|c| c.identity.is_some())
                .count(),
            1
        );

        let results = (0..80).find_map(|_| h.game.tick().arcade_results);
        let results = results.expect("session should end on the timer");
        assert_eq!(results.reason, SessionEndReason::TimerExpired);
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);
        assert_eq!(h.game.world().combatants.len(), 2);
        assert!(h.game.machine().quest().is_some());
        assert_eq!(h.display.results().len(), 1);
    }

    #[test]
    fn test_clearing_level_unlocks_next() {
        let mut h = in_level();
        for c in h.game.world.combatants.iter_mut() {
            c.is_pending_removal = true;
            c.alive = false;
        }
        let report = h.game.tick();
        assert_eq!(report.level_cleared, Some(1));
        // Single-level catalogue: nothing further to unlock
        assert_eq!(h.game.unlocked_levels().collect::<Vec<_>>(), vec![1]);
        assert!(h.game.tick().level_cleared.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let mut h = in_level();
        h.game.world.player.set_health(6);
        h.game.handle_input(InputAction::Pause).unwrap();
        let saved = h.game.save_state();
        assert_eq!(saved.mode, GameMode::Paused);
        assert_eq!(saved.level_id, Some(1));

        let mut fresh = harness_with(GameConfig::default());
        fresh.game.load_state(&saved);
        assert_eq!(fresh.game.mode(), GameMode::Paused);
        assert_eq!(fresh.game.machine().active_mode(), GameMode::PlatformLevel);
        assert_eq!(fresh.game.current_level(), Some(1));
        assert_eq!(fresh.game.world().player.health, 6);
        assert!(fresh
            .game
            .world()
            .player
            .position()
            .approx_eq(saved.player_position, 1e-3));
    }

    #[test]
    fn test_load_clamps_health() {
        let mut h = harness_with(GameConfig::default());
        let state = PersistedState {
            mode: GameMode::BossBattle,
            player_health: 0,
            player_position: Vec2::new(5000.0, 580.0),
            level_id: Some(1),
            unlocked_levels: vec![1],
            cleared_levels: vec![],
            completed_quests: vec![],
            score: 0,
        };
        h.game.load_state(&state);
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);
        assert_eq!(h.game.world().player.health, 1);
        assert!(h.game.world().player.position().x <= 2000.0);
    }

    fn eliminate_requests(client: &SimulatedClient, target: &str) -> usize {
        client
            .requests()
            .iter()
            .filter(|r| matches!(r, RemediationRequest::Eliminate { target_id, .. } if target_id == target))
            .count()
    }

    fn short_arcade() -> Harness {
        let mut config = GameConfig::default();
        config.arcade.duration_secs = 1.0;
        let mut h = harness_with(config);
        h.game.tick();
        h
    }

    fn carries(c: &Combatant, target: &str) -> bool {
        c.identity.as_ref().is_some_and(|i| i.target_id == target)
    }

    #[test]
    fn test_exemption_during_arcade_keeps_identity_out_of_play() {
        let mut h = short_arcade();
        h.game.handle_input(InputAction::EnterArcade).unwrap();
        // Only the stashed original carries the identity right now
        assert_eq!(h.game.set_protection("zombie-a", true), 0);

        h.game.tick();
        assert!(h.game.world().live_count(EntityKind::Hostile) > 0);
        assert!(h.game.world().combatants.iter().all(|c| c.identity.is_none()));

        let results = (0..80).find_map(|_| h.game.tick().arcade_results);
        assert!(results.is_some());
        let restored = h.game.world().combatants.iter().find(|c| carries(c, "zombie-a")).unwrap();
        assert!(restored.is_protected);

        wait_idle(&h.game);
        assert_eq!(eliminate_requests(&h.client, "zombie-a"), 0);
    }

    #[test]
    fn test_protecting_an_arcade_spawn_makes_it_invulnerable() {
        let mut h = short_arcade();
        h.game.handle_input(InputAction::EnterArcade).unwrap();
        h.game.tick();
        assert!(carries(&h.game.world().combatants[0], "zombie-a"));

        assert_eq!(h.game.set_protection("zombie-a", true), 1);
        let reports = shoot_first_hostile(&mut h.game);
        // The shot passes through; anything it hits behind carries no identity
        assert!(reports
            .iter()
            .flat_map(|r| r.eliminations.iter())
            .all(|e| e.identity.is_none()));
        assert_eq!(h.game.world().combatants[0].health, 1);

        let results = (0..80).find_map(|_| h.game.tick().arcade_results).unwrap();
        assert_eq!(results.reports_flushed, 0);
        assert!(h.game.world().combatants.iter().filter(|c| carries(c, "zombie-a")).all(|c| c.is_protected));
        wait_idle(&h.game);
        assert_eq!(eliminate_requests(&h.client, "zombie-a"), 0);
    }

    #[test]
    fn test_arcade_elimination_consumes_the_level_identity() {
        let mut h = short_arcade();
        h.game.handle_input(InputAction::EnterArcade).unwrap();
        h.game.tick();
        assert!(carries(&h.game.world().combatants[0], "zombie-a"));
        assert_eq!(eliminations(&shoot_first_hostile(&mut h.game)), 1);

        let results = (0..80).find_map(|_| h.game.tick().arcade_results).unwrap();
        assert_eq!(results.reports_flushed, 1);
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);

        // The original never comes back to be eliminated a second time
        assert!(h.game.world().combatants.iter().all(|c| !carries(c, "zombie-a")));
        assert_eq!(h.game.world().combatants.len(), 1);
        wait_idle(&h.game);
        assert_eq!(eliminate_requests(&h.client, "zombie-a"), 1);
    }

    #[test]
    fn test_leaving_mid_quest_fails_it() {
        let mut h = in_level();
        h.game.world.player.body.position.x = 310.0;
        h.game.tick();
        h.game.handle_input(InputAction::AcceptQuest).unwrap();
        h.game.tick();
        assert_eq!(h.game.machine().quest().map(|q| q.status()), Some(QuestStatus::Active));
        // A refused arcade entry leaves the level untouched
        assert_eq!(h.game.handle_input(InputAction::EnterArcade), Err(TransitionError::QuestInProgress));
        assert!(!h.game.world().has_stash());
        assert!(h.game.arcade_identities.is_empty());

        h.game.world.player.body.position.x = 1950.0;
        let report = h.game.tick();
        assert!(report.quest_events.iter().any(|e| matches!(
            e,
            QuestEvent::Failed { reason: QuestFailure::Abandoned, .. }
        )));
        assert_eq!(h.game.mode(), GameMode::Exploration);

        // Not completed, so it is offered again on the way back in
        h.game.world.player.body.position = Vec2::new(132.0, 132.0);
        h.game.tick();
        assert_eq!(h.game.mode(), GameMode::PlatformLevel);
        assert_eq!(h.game.machine().quest().map(|q| q.status()), Some(QuestStatus::NotStarted));
        wait_idle(&h.game);
        assert!(h.client.requests().iter().all(|r| !matches!(r, RemediationRequest::Protect { .. })));
    }
}

