//! End-to-end scenarios driven through the public `Game` API only

use std::sync::Arc;
use std::time::{Duration, Instant};

use zombie_blaster_core::config::GameConfig;
use zombie_blaster_core::game::arcade::SessionEndReason;
use zombie_blaster_core::game::entity::{AdversaryBehavior, AttackPattern, EntityKind, Identity};
use zombie_blaster_core::game::events::TickReport;
use zombie_blaster_core::game::level::{BossSpec, Door, ExemptionList, ExplorationMap, LevelCatalog, LevelTemplate, SpawnSpec};
use zombie_blaster_core::game::quest::{QuestDefinition, QuestEvent};
use zombie_blaster_core::game::{Game, GameMode, InputAction};
use zombie_blaster_core::remediation::{RecordingDisplay, SimulatedClient};
use zombie_blaster_core::util::vec2::{Rect, Vec2};

struct Harness {
    game: Game,
    client: Arc<SimulatedClient>,
    display: Arc<RecordingDisplay>,
    _runtime: tokio::runtime::Runtime,
}

fn hostile(id: &str, x: f32) -> SpawnSpec {
    SpawnSpec {
        kind: EntityKind::Hostile,
        identity: Identity::new(id, "acct-1"),
        position: Vec2::new(x, 580.0),
    }
}

fn catalog(spawns: Vec<SpawnSpec>, quest: Option<QuestDefinition>) -> LevelCatalog {
    let level = LevelTemplate {
        id: 1,
        name: "Scenario".to_string(),
        width: 2000.0,
        height: 800.0,
        ground_y: 600.0,
        entry: Vec2::new(80.0, 580.0),
        exit: Rect::new(1936.0, 0.0, 64.0, 800.0),
        spawns,
        quest,
        boss: BossSpec {
            pattern: AttackPattern::Sentinel,
            position: Vec2::new(1200.0, 552.0),
        },
    };
    let map = ExplorationMap {
        width: 800.0,
        height: 600.0,
        spawn: Vec2::new(132.0, 132.0),
        doors: vec![Door {
            level_id: 1,
            region: Rect::new(100.0, 100.0, 64.0, 64.0),
        }],
    };
    LevelCatalog::from_parts(vec![level], map)
}

fn harness(config: GameConfig, catalog: LevelCatalog, exemptions: ExemptionList) -> Harness {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();
    let client = Arc::new(SimulatedClient::default());
    let display = Arc::new(RecordingDisplay::new());
    let game = Game::new(config, client.clone(), display.clone(), runtime.handle().clone())
        .with_catalog(catalog)
        .with_exemptions(exemptions);
    Harness {
        game,
        client,
        display,
        _runtime: runtime,
    }
}

/// Spawned standing in the door: one tick puts the player in the level
fn enter(h: &mut Harness) {
    h.game.tick();
    assert_eq!(h.game.mode(), GameMode::PlatformLevel);
}

fn wait_idle(game: &Game) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while game.dispatcher().in_flight() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Hold fire until something is eliminated or `max_ticks` pass
fn fire_until_elimination(game: &mut Game, max_ticks: usize) -> Option<TickReport> {
    for _ in 0..max_ticks {
        game.handle_input(InputAction::Fire).unwrap();
        let report = game.tick();
        if !report.eliminations.is_empty() {
            return Some(report);
        }
    }
    None
}

fn encoded_snapshot(game: &Game) -> Vec<u8> {
    bincode::serde::encode_to_vec(game.snapshot(), bincode::config::standard()).unwrap()
}

#[test]
fn pause_freezes_everything_and_defers_remediation_outcomes() {
    let mut h = harness(
        GameConfig::default(),
        catalog(vec![hostile("zombie-p", 260.0)], None),
        ExemptionList::default(),
    );
    h.client.fail_target("zombie-p");
    enter(&mut h);

    let report = fire_until_elimination(&mut h.game, 120).expect("hostile should go down");
    assert_eq!(report.eliminations[0].identity.as_ref().map(|i| i.target_id.as_str()), Some("zombie-p"));

    // Pause before the failure outcome can be drained
    h.game.handle_input(InputAction::Pause).unwrap();
    wait_idle(&h.game);
    assert_eq!(h.game.dispatcher().pending_outcomes(), 1);

    let frozen = encoded_snapshot(&h.game);
    for _ in 0..60 {
        let report = h.game.tick();
        assert!(!report.advanced);
        assert_eq!(report.remediation_failures, 0);
    }
    assert_eq!(encoded_snapshot(&h.game), frozen);
    assert_eq!(h.game.dispatcher().pending_outcomes(), 1);
    assert!(h.display.errors().is_empty());

    h.game.handle_input(InputAction::Pause).unwrap();
    let report = h.game.tick();
    assert!(report.advanced);
    assert_eq!(report.remediation_failures, 1);
    assert_eq!(h.display.errors().len(), 1);
    assert_eq!(h.game.snapshot().notifications.len(), 1);
}

#[test]
fn pause_freezes_every_mode() {
    let expected = [
        GameMode::Exploration,
        GameMode::PlatformLevel,
        GameMode::BossBattle,
        GameMode::ArcadeChallenge,
    ];

    for mode in expected {
        let mut h = harness(
            GameConfig::default(),
            catalog(vec![hostile("zombie-1", 1500.0)], None),
            ExemptionList::default(),
        );
        if mode != GameMode::Exploration {
            enter(&mut h);
        }
        match mode {
            GameMode::BossBattle => h.game.handle_input(InputAction::SummonBoss).unwrap(),
            GameMode::ArcadeChallenge => h.game.handle_input(InputAction::EnterArcade).unwrap(),
            _ => {}
        }
        if mode != GameMode::Exploration {
            // Get the boss moving and the arcade clock and spawner running
            for _ in 0..5 {
                h.game.tick();
            }
        }
        assert_eq!(h.game.mode(), mode);

        let tick = h.game.current_tick();
        h.game.handle_input(InputAction::Pause).unwrap();
        let snapshot = h.game.snapshot();
        assert_eq!(snapshot.mode, GameMode::Paused);
        assert_eq!(snapshot.active_mode, mode);

        let frozen = encoded_snapshot(&h.game);
        for _ in 0..30 {
            assert!(!h.game.tick().advanced);
        }
        assert_eq!(h.game.current_tick(), tick);
        assert_eq!(encoded_snapshot(&h.game), frozen, "{mode:?} changed while paused");

        h.game.handle_input(InputAction::Pause).unwrap();
        assert_eq!(h.game.mode(), mode);
    }
}

#[test]
fn failed_quest_leaves_no_hostile_invulnerable() {
    let quest = QuestDefinition {
        id: "quest-c".to_string(),
        name: "Outrun the Hacker".to_string(),
        trigger_x: 200.0,
        objective: Vec2::new(1500.0, 580.0),
        adversary_spawn: Vec2::new(400.0, 580.0),
        adversary_speed: 3000.0,
        behavior: AdversaryBehavior::Racer,
        protect_resource_id: "crown-jewel".to_string(),
    };
    let mut h = harness(
        GameConfig::default(),
        catalog(vec![hostile("zombie-staged", 1400.0)], Some(quest)),
        ExemptionList::default(),
    );
    enter(&mut h);

    h.game.handle_input(InputAction::Move(Vec2::RIGHT)).unwrap();
    let triggered = (0..120).any(|_| {
        h.game
            .tick()
            .quest_events
            .iter()
            .any(|e| matches!(e, QuestEvent::Triggered { .. }))
    });
    assert!(triggered);
    h.game.handle_input(InputAction::Move(Vec2::ZERO)).unwrap();

    h.game.handle_input(InputAction::AcceptQuest).unwrap();
    h.game.tick();
    let snapshot = h.game.snapshot();
    assert_eq!(snapshot.adversaries.len(), 1);
    assert!(snapshot.entities.iter().all(|e| e.is_hidden));

    let failed = (0..120).any(|_| {
        h.game
            .tick()
            .quest_events
            .iter()
            .any(|e| matches!(e, QuestEvent::Failed { .. }))
    });
    assert!(failed);

    let snapshot = h.game.snapshot();
    assert!(snapshot.active_quest.is_none());
    assert!(snapshot.adversaries.is_empty());
    assert!(snapshot.entities.iter().all(|e| !e.is_hidden));

    // The formerly staged hostile is back in play and can be shot
    h.game.handle_input(InputAction::Move(Vec2::RIGHT)).unwrap();
    let report = fire_until_elimination(&mut h.game, 240).expect("staged hostile should be hittable");
    assert_eq!(
        report.eliminations[0].identity.as_ref().map(|i| i.target_id.as_str()),
        Some("zombie-staged")
    );
}

#[test]
fn idle_arcade_session_ends_on_timer_with_nothing_to_report() {
    let mut config = GameConfig::default();
    // Enough health to stand through a full minute of contact hits
    config.player.max_health = 100;
    let mut h = harness(
        config,
        catalog(vec![hostile("zombie-1", 1500.0)], None),
        ExemptionList::default(),
    );
    enter(&mut h);
    h.game.handle_input(InputAction::EnterArcade).unwrap();

    let ticks = 65 * 60;
    let results = (0..ticks).find_map(|_| h.game.tick().arcade_results);
    let results = results.expect("session should end within 65s");

    assert_eq!(results.reason, SessionEndReason::TimerExpired);
    assert_eq!(results.score, 0);
    assert_eq!(results.eliminations, 0);
    assert_eq!(results.reports_flushed, 0);
    assert!((results.survival_time - 60.0).abs() < 0.1);
    assert_eq!(h.game.mode(), GameMode::PlatformLevel);

    wait_idle(&h.game);
    assert_eq!(h.client.request_count(), 0);
    assert_eq!(h.display.results(), vec![results]);
}

#[test]
fn exempt_identities_spawn_protected_and_survive_fire() {
    let mut h = harness(
        GameConfig::default(),
        catalog(vec![hostile("zombie-vip", 260.0)], None),
        ExemptionList::from_ids(["zombie-vip"]),
    );
    enter(&mut h);

    let snapshot = h.game.snapshot();
    assert_eq!(snapshot.entities.len(), 1);
    assert!(snapshot.entities[0].is_protected);

    assert!(fire_until_elimination(&mut h.game, 60).is_none());
    let view = &h.game.snapshot().entities[0];
    assert_eq!(view.health, view.max_health);

    wait_idle(&h.game);
    assert_eq!(h.client.request_count(), 0);
}

#[test]
fn saved_progress_round_trips_through_json() {
    let mut h = harness(
        GameConfig::default(),
        catalog(vec![hostile("zombie-1", 1500.0)], None),
        ExemptionList::default(),
    );
    enter(&mut h);
    for _ in 0..30 {
        h.game.tick();
    }

    let json = serde_json::to_string(&h.game.save_state()).unwrap();
    let state = serde_json::from_str(&json).unwrap();

    let mut restored = harness(
        GameConfig::default(),
        catalog(vec![hostile("zombie-1", 1500.0)], None),
        ExemptionList::default(),
    );
    restored.game.load_state(&state);

    assert_eq!(restored.game.mode(), GameMode::PlatformLevel);
    assert_eq!(restored.game.current_level(), Some(1));
    let a = h.game.snapshot();
    let b = restored.game.snapshot();
    assert_eq!(a.player_health, b.player_health);
    assert!(a.player_position.approx_eq(b.player_position, 1e-3));
    assert_eq!(a.unlocked_levels, b.unlocked_levels);
}
