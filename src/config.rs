//! Runtime configuration
//!
//! Defaults come from `game::constants`; selected values can be overridden
//! through environment variables (a `.env` file is honored by the binary).

use std::str::FromStr;

use crate::game::constants::{self, arcade, physics, player, projectile, quest, spatial};

/// Configuration validation failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tick_rate must be between 1 and 1000, got {0}")]
    TickRate(u32),
    #[error("spatial cell size must be at least the largest entity extent ({min}), got {got}")]
    CellSize { got: f32, min: f32 },
    #[error("player max health must be positive, got {0}")]
    MaxHealth(i32),
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error("report batch size must be at least 1")]
    BatchSize,
}

/// Player tuning
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub max_health: i32,
    pub invincibility_secs: f32,
    pub run_speed: f32,
    pub walk_speed: f32,
    pub fire_cooldown_secs: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: player::MAX_HEALTH,
            invincibility_secs: player::INVINCIBILITY_SECS,
            run_speed: player::RUN_SPEED,
            walk_speed: player::WALK_SPEED,
            fire_cooldown_secs: player::FIRE_COOLDOWN_SECS,
        }
    }
}

/// Projectile/combat tuning
#[derive(Debug, Clone)]
pub struct CombatConfig {
    pub projectile_speed: f32,
    pub projectile_damage: i32,
    pub projectile_lifetime_secs: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            projectile_speed: projectile::SPEED,
            projectile_damage: projectile::DAMAGE,
            projectile_lifetime_secs: projectile::LIFETIME_SECS,
        }
    }
}

/// Quest timer tuning
#[derive(Debug, Clone)]
pub struct QuestConfig {
    pub duration_secs: f32,
    pub objective_radius: f32,
    pub staging_radius: f32,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            duration_secs: quest::DURATION_SECS,
            objective_radius: quest::OBJECTIVE_RADIUS,
            staging_radius: quest::STAGING_RADIUS,
        }
    }
}

/// Arcade session tuning
#[derive(Debug, Clone)]
pub struct ArcadeConfig {
    pub duration_secs: f32,
    pub combo_window_secs: f32,
    pub combo_threshold: u32,
    pub combo_multiplier: f32,
    pub initial_target_hostiles: usize,
    pub target_step: usize,
    pub max_target_hostiles: usize,
    pub difficulty_interval_secs: f32,
    pub respawn_delay_secs: f32,
    pub safe_spawn_distance: f32,
    pub report_batch_size: usize,
    pub report_batch_delay_secs: f32,
    pub hit_score_penalty: u32,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            duration_secs: arcade::DURATION_SECS,
            combo_window_secs: arcade::COMBO_WINDOW_SECS,
            combo_threshold: arcade::COMBO_MULTIPLIER_THRESHOLD,
            combo_multiplier: arcade::COMBO_MULTIPLIER,
            initial_target_hostiles: arcade::INITIAL_TARGET_HOSTILES,
            target_step: arcade::TARGET_STEP,
            max_target_hostiles: arcade::MAX_TARGET_HOSTILES,
            difficulty_interval_secs: arcade::DIFFICULTY_INTERVAL_SECS,
            respawn_delay_secs: arcade::RESPAWN_DELAY_SECS,
            safe_spawn_distance: arcade::SAFE_SPAWN_DISTANCE,
            report_batch_size: arcade::REPORT_BATCH_SIZE,
            report_batch_delay_secs: arcade::REPORT_BATCH_DELAY_SECS,
            hit_score_penalty: arcade::HIT_SCORE_PENALTY,
        }
    }
}

/// Game configuration
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Spatial index cell size in world units
    pub spatial_cell_size: f32,
    /// Seed for level generation and arcade spawning
    pub rng_seed: u64,
    pub player: PlayerConfig,
    pub combat: CombatConfig,
    pub quest: QuestConfig,
    pub arcade: ArcadeConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: physics::TICK_RATE,
            spatial_cell_size: spatial::CELL_SIZE,
            rng_seed: 0x5EED_2024,
            player: PlayerConfig::default(),
            combat: CombatConfig::default(),
            quest: QuestConfig::default(),
            arcade: ArcadeConfig::default(),
        }
    }
}

/// Read and parse an environment variable, warning (and returning None) on bad input
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", key, raw);
            None
        }
    }
}

impl GameConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Some(rate) = env_parse::<u32>("TICK_RATE") {
            if (1..=1000).contains(&rate) {
                config.tick_rate = rate;
            } else {
                tracing::warn!("TICK_RATE must be 1-1000, using default");
            }
        }

        if let Some(cell) = env_parse::<f32>("SPATIAL_CELL_SIZE") {
            if cell > 0.0 {
                config.spatial_cell_size = cell;
            } else {
                tracing::warn!("SPATIAL_CELL_SIZE must be > 0, using default");
            }
        }

        if let Some(health) = env_parse::<i32>("PLAYER_MAX_HEALTH") {
            if health > 0 {
                config.player.max_health = health;
            } else {
                tracing::warn!("PLAYER_MAX_HEALTH must be > 0, using default");
            }
        }

        if let Some(secs) = env_parse::<f32>("INVINCIBILITY_SECS") {
            if secs >= 0.0 {
                config.player.invincibility_secs = secs;
            } else {
                tracing::warn!("INVINCIBILITY_SECS must be >= 0, using default");
            }
        }

        if let Some(secs) = env_parse::<f32>("QUEST_DURATION_SECS") {
            if secs > 0.0 {
                config.quest.duration_secs = secs;
            } else {
                tracing::warn!("QUEST_DURATION_SECS must be > 0, using default");
            }
        }

        if let Some(secs) = env_parse::<f32>("ARCADE_DURATION_SECS") {
            if secs > 0.0 {
                config.arcade.duration_secs = secs;
            } else {
                tracing::warn!("ARCADE_DURATION_SECS must be > 0, using default");
            }
        }

        if let Some(secs) = env_parse::<f32>("COMBO_WINDOW_SECS") {
            if secs > 0.0 {
                config.arcade.combo_window_secs = secs;
            } else {
                tracing::warn!("COMBO_WINDOW_SECS must be > 0, using default");
            }
        }

        if let Some(size) = env_parse::<usize>("REPORT_BATCH_SIZE") {
            if size > 0 {
                config.arcade.report_batch_size = size;
            } else {
                tracing::warn!("REPORT_BATCH_SIZE must be > 0, using default");
            }
        }

        if let Some(secs) = env_parse::<f32>("REPORT_BATCH_DELAY_SECS") {
            if secs >= 0.0 {
                config.arcade.report_batch_delay_secs = secs;
            } else {
                tracing::warn!("REPORT_BATCH_DELAY_SECS must be >= 0, using default");
            }
        }

        if let Some(seed) = env_parse::<u64>("RNG_SEED") {
            config.rng_seed = seed;
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::TickRate(self.tick_rate));
        }
        // Neighbor queries only reach one cell out
        let min = constants::boss::WIDTH.max(constants::boss::HEIGHT);
        if self.spatial_cell_size < min {
            return Err(ConfigError::CellSize {
                got: self.spatial_cell_size,
                min,
            });
        }
        if self.player.max_health <= 0 {
            return Err(ConfigError::MaxHealth(self.player.max_health));
        }
        if self.combat.projectile_damage <= 0 {
            return Err(ConfigError::NonPositive("projectile damage"));
        }
        if self.quest.duration_secs <= 0.0 {
            return Err(ConfigError::NonPositive("quest duration"));
        }
        if self.arcade.duration_secs <= 0.0 {
            return Err(ConfigError::NonPositive("arcade duration"));
        }
        if self.arcade.combo_window_secs <= 0.0 {
            return Err(ConfigError::NonPositive("combo window"));
        }
        if self.arcade.report_batch_size == 0 {
            return Err(ConfigError::BatchSize);
        }
        Ok(())
    }

    /// Seconds per tick
    #[inline]
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Invincibility window in ticks
    pub fn invincibility_ticks(&self) -> u64 {
        constants::secs_to_ticks(self.player.invincibility_secs, self.tick_rate)
    }

    /// Fire cooldown in ticks
    pub fn fire_cooldown_ticks(&self) -> u64 {
        constants::secs_to_ticks(self.player.fire_cooldown_secs, self.tick_rate)
    }
}
