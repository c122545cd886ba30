//! Tuning constants. `GameConfig::default()` is built from these; anything
//! overridable at runtime lives in `crate::config`.

/// Tick/physics constants
pub mod physics {
    /// Simulation tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Delta time per tick in seconds
    pub const DT: f32 = 1.0 / 60.0;
    /// Downward acceleration in platform modes (units/s²)
    pub const GRAVITY: f32 = 1800.0;
    /// Terminal fall speed
    pub const MAX_FALL_SPEED: f32 = 900.0;
    /// Initial upward speed of a jump
    pub const JUMP_SPEED: f32 = 720.0;
}

/// Convert seconds to whole ticks at the given rate (rounded up)
#[inline]
pub fn secs_to_ticks(secs: f32, tick_rate: u32) -> u64 {
    (secs * tick_rate as f32).ceil().max(0.0) as u64
}

/// Player constants
pub mod player {
    /// Maximum health (5 hearts, 2 points each)
    pub const MAX_HEALTH: i32 = 10;
    /// Invulnerability after taking a hit, in seconds
    pub const INVINCIBILITY_SECS: f32 = 1.5;
    /// Horizontal run speed in platform modes
    pub const RUN_SPEED: f32 = 260.0;
    /// Walk speed in top-down exploration
    pub const WALK_SPEED: f32 = 200.0;
    /// Collision box size
    pub const WIDTH: f32 = 28.0;
    pub const HEIGHT: f32 = 40.0;
    /// Minimum time between shots, in seconds
    pub const FIRE_COOLDOWN_SECS: f32 = 0.2;
}

/// Hostile (zombie) constants
pub mod hostile {
    pub const HEALTH: i32 = 3;
    pub const WIDTH: f32 = 28.0;
    pub const HEIGHT: f32 = 40.0;
    /// Shamble speed when chasing the player
    pub const CHASE_SPEED: f32 = 70.0;
    /// Patrol speed around the spawn point
    pub const PATROL_SPEED: f32 = 40.0;
    /// Half-width of the patrol range around the spawn point
    pub const PATROL_RANGE: f32 = 60.0;
    /// Distance at which a hostile starts chasing the player
    pub const AGGRO_RADIUS: f32 = 300.0;
    pub const SCORE: u32 = 100;
}

/// Third-party access grant constants
pub mod third_party {
    pub const HEALTH: i32 = 10;
    pub const WIDTH: f32 = 36.0;
    pub const HEIGHT: f32 = 48.0;
    pub const SCORE: u32 = 250;
}

/// Boss constants
pub mod boss {
    pub const HEALTH: i32 = 30;
    pub const WIDTH: f32 = 80.0;
    pub const HEIGHT: f32 = 96.0;
    pub const PACE_SPEED: f32 = 90.0;
    pub const DASH_SPEED: f32 = 520.0;
    /// Seconds between charger dashes
    pub const DASH_INTERVAL_SECS: f32 = 3.0;
    /// Seconds a dash lasts
    pub const DASH_DURATION_SECS: f32 = 0.6;
    /// Sentinel hover height above ground
    pub const HOVER_HEIGHT: f32 = 140.0;
    pub const TRACK_SPEED: f32 = 120.0;
    pub const SCORE: u32 = 1000;
}

/// Projectile constants
pub mod projectile {
    pub const SPEED: f32 = 700.0;
    pub const DAMAGE: i32 = 1;
    pub const SIZE: f32 = 8.0;
    /// Projectile lifetime in seconds
    pub const LIFETIME_SECS: f32 = 1.5;
}

/// Spatial index constants
pub mod spatial {
    /// Grid cell size in world units; keeps average bucket occupancy around 3-5
    /// at 500+ live entities
    pub const CELL_SIZE: f32 = 100.0;
    /// Initial capacity for the cell map
    pub const GRID_INITIAL_CAPACITY: usize = 256;
    /// Initial capacity for entity vectors within cells
    pub const CELL_INITIAL_CAPACITY: usize = 8;
}

/// Quest/challenge constants
pub mod quest {
    /// Countdown budget once a quest is accepted
    pub const DURATION_SECS: f32 = 60.0;
    /// Player must get this close to the objective to win
    pub const OBJECTIVE_RADIUS: f32 = 80.0;
    /// Default adversary speed
    pub const ADVERSARY_SPEED: f32 = 90.0;
    /// Hostiles this close to the objective are hidden while a quest runs
    pub const STAGING_RADIUS: f32 = 150.0;
}

/// Arcade challenge constants
pub mod arcade {
    pub const DURATION_SECS: f32 = 60.0;
    pub const COMBO_WINDOW_SECS: f32 = 3.0;
    /// Combo count at which the score multiplier kicks in
    pub const COMBO_MULTIPLIER_THRESHOLD: u32 = 5;
    pub const COMBO_MULTIPLIER: f32 = 1.5;
    /// Live hostiles at session start
    pub const INITIAL_TARGET_HOSTILES: usize = 8;
    /// Added to the target every difficulty step
    pub const TARGET_STEP: usize = 4;
    /// Hard cap on live arcade hostiles
    pub const MAX_TARGET_HOSTILES: usize = 500;
    /// Seconds of session time between difficulty steps
    pub const DIFFICULTY_INTERVAL_SECS: f32 = 30.0;
    /// Delay before an eliminated hostile is replaced
    pub const RESPAWN_DELAY_SECS: f32 = 2.0;
    /// Minimum spawn distance from the player
    pub const SAFE_SPAWN_DISTANCE: f32 = 250.0;
    /// Maximum attempts to find a safe spawn position
    pub const MAX_SPAWN_ATTEMPTS: u32 = 30;
    /// Deferred elimination reports sent per batch
    pub const REPORT_BATCH_SIZE: usize = 10;
    /// Seconds between report batches
    pub const REPORT_BATCH_DELAY_SECS: f32 = 1.0;
    /// Score lost when the player is hit during a session
    pub const HIT_SCORE_PENALTY: u32 = 50;
}

/// Exploration map constants
pub mod exploration {
    pub const MAP_WIDTH: f32 = 1600.0;
    pub const MAP_HEIGHT: f32 = 1200.0;
    pub const DOOR_SIZE: f32 = 64.0;
    /// Player is placed this far below a door when returning from a level
    pub const DOOR_RETURN_OFFSET: f32 = 80.0;
}

/// Level layout constants
pub mod level {
    pub const WIDTH: f32 = 3200.0;
    /// y coordinate of the ground surface
    pub const GROUND_Y: f32 = 600.0;
    pub const EXIT_WIDTH: f32 = 64.0;
    pub const ENTRY_X: f32 = 80.0;
    /// Hostiles never spawn closer than this to the entry point
    pub const SPAWN_CLEARANCE: f32 = 400.0;
    /// Number of generated levels in the catalogue
    pub const COUNT: u32 = 4;
}

/// Display/notification constants
pub mod display {
    /// How long a notification stays in the snapshot
    pub const NOTIFICATION_SECS: f32 = 4.0;
    /// Maximum notifications kept at once
    pub const MAX_NOTIFICATIONS: usize = 8;
}
