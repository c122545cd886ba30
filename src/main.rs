use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zombie_blaster_core::config::GameConfig;
use zombie_blaster_core::game::performance::BudgetStatus;
use zombie_blaster_core::game::quest::QuestStatus;
use zombie_blaster_core::game::snapshot::GameSnapshot;
use zombie_blaster_core::game::{Game, GameMode, InputAction, InputSender};
use zombie_blaster_core::remediation::{SimulatedClient, TracingDisplay};
use zombie_blaster_core::util::vec2::Vec2;

/// Drives the game without a human: walks to a door, clears what it can,
/// takes the quest, then plays an arcade session
struct Autopilot {
    inputs: InputSender,
    door: Vec2,
    ticks_in_level: u64,
    arcade_played: bool,
}

impl Autopilot {
    fn steer(&mut self, snapshot: &GameSnapshot) {
        let pos = snapshot.player_position;
        let mut actions = Vec::new();

        match snapshot.mode {
            GameMode::Exploration => {
                self.ticks_in_level = 0;
                actions.push(InputAction::Move((self.door - pos).normalize()));
            }
            GameMode::PlatformLevel => {
                self.ticks_in_level += 1;
                if snapshot
                    .active_quest
                    .as_ref()
                    .is_some_and(|q| q.state.status == QuestStatus::Triggered)
                {
                    actions.push(InputAction::AcceptQuest);
                }
                if !self.arcade_played && self.ticks_in_level > 20 * 60 {
                    self.arcade_played = true;
                    actions.push(InputAction::EnterArcade);
                }
                actions.push(InputAction::Move(Vec2::RIGHT));
                actions.push(InputAction::Fire);
            }
            GameMode::BossBattle | GameMode::ArcadeChallenge => {
                let nearest = snapshot
                    .entities
                    .iter()
                    .filter(|e| !e.is_protected && !e.is_pending_removal && !e.is_hidden)
                    .min_by(|a, b| pos.distance_sq_to(a.position).total_cmp(&pos.distance_sq_to(b.position)));
                if let Some(target) = nearest {
                    let dir = if target.position.x < pos.x { Vec2::LEFT } else { Vec2::RIGHT };
                    actions.push(InputAction::Move(dir));
                }
                actions.push(InputAction::Fire);
            }
            GameMode::Paused => {}
        }

        for action in actions {
            if let Err(e) = self.inputs.try_send(action) {
                warn!("Autopilot input dropped: {}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Zombie Blaster core v{}", env!("CARGO_PKG_VERSION"));

    let config = GameConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {} Hz, seed {}, cell size {}",
        config.tick_rate, config.rng_seed, config.spatial_cell_size
    );

    let demo_secs: u64 = std::env::var("DEMO_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(90);
    let latency_ms: u64 = std::env::var("REMEDIATION_LATENCY_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(150);

    let client = Arc::new(SimulatedClient::new(Duration::from_millis(latency_ms)));
    let tick_duration = Duration::from_secs_f32(config.dt());
    let total_ticks = demo_secs * config.tick_rate as u64;

    let mut game = Game::new(
        config,
        client.clone(),
        Arc::new(TracingDisplay),
        tokio::runtime::Handle::current(),
    );

    let door = game
        .catalog()
        .first()
        .and_then(|id| game.catalog().map.door_for(id))
        .map_or(game.catalog().map.spawn, |d| d.region.center());
    let mut pilot = Autopilot {
        inputs: game.input_sender(),
        door,
        ticks_in_level: 0,
        arcade_played: false,
    };

    let mut interval = tokio::time::interval(tick_duration);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut overloaded = false;
    let run = async {
        while game.current_tick() < total_ticks {
            interval.tick().await;
            pilot.steer(&game.snapshot());
            let report = game.tick();

            if let Some(results) = &report.arcade_results {
                match serde_json::to_string(results) {
                    Ok(json) => info!("Session results: {}", json),
                    Err(e) => warn!("Could not serialize results: {}", e),
                }
            }
            let over = game.frame_budget().status() == BudgetStatus::Overloaded;
            if over && !overloaded {
                warn!("{}", game.frame_budget().status_message());
            }
            overloaded = over;

            if report.tick % (10 * 60) == 0 {
                info!(
                    "Tick {}: {:?}, score {}, {}",
                    report.tick,
                    game.mode(),
                    game.score(),
                    game.frame_budget().status_message()
                );
            }
        }
    };

    tokio::select! {
        _ = run => info!("Demo finished"),
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    info!(
        "Final score {}, {} remediation requests sent",
        game.score(),
        client.request_count()
    );
    Ok(())
}
