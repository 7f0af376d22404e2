use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DARK_TINT, DEFAULT_MAZE, GHOST_ARRIVE_EPSILON, GHOST_HITBOX_SIZE, GHOST_LAST_BIAS,
    GHOST_SPEED, GHOST_START_COUNT, INITIAL_SPAWN_DELAY_MS, KILL_DELAY_MS, LIGHTNING_ENTER_SPEED,
    LIGHTNING_HOLD_SECS, LIGHTNING_PHASE_EXIT_SPEEDS, LIGHTNING_TICKER_MAX_SECS,
    LIGHTNING_TICKER_MIN_SECS, LIGHT_TINT, PLAYER_COLORS, PLAYER_HITBOX_SIZE, PLAYER_LIVES,
    RESPAWN_DELAY_MS, SPAWN_MAX_ATTEMPTS, SPAWN_MIN_DISTANCE, SPAWN_RETRY_BASE_MS,
    SPAWN_RETRY_MAX_MS,
};
use crate::error::{SimError, SimResult};
use crate::types::Color;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostConfig {
    pub speed: f32,
    pub hitbox_size: f32,
    pub last_bias: f32,
    pub arrive_epsilon: f32,
    pub start_count: usize,
    pub initial_spawn_delay_ms: u64,
    pub respawn_delay_ms: u64,
    pub kill_delay_ms: u64,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            speed: GHOST_SPEED,
            hitbox_size: GHOST_HITBOX_SIZE,
            last_bias: GHOST_LAST_BIAS,
            arrive_epsilon: GHOST_ARRIVE_EPSILON,
            start_count: GHOST_START_COUNT,
            initial_spawn_delay_ms: INITIAL_SPAWN_DELAY_MS,
            respawn_delay_ms: RESPAWN_DELAY_MS,
            kill_delay_ms: KILL_DELAY_MS,
        }
    }
}

impl GhostConfig {
    /// Attack probes reach half a hitbox out from the ghost's centre.
    pub fn probe_length(&self) -> f32 {
        self.hitbox_size / 2.0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    pub min_distance: f32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub max_attempts: u32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            min_distance: SPAWN_MIN_DISTANCE,
            retry_base_ms: SPAWN_RETRY_BASE_MS,
            retry_max_ms: SPAWN_RETRY_MAX_MS,
            max_attempts: SPAWN_MAX_ATTEMPTS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LightningConfig {
    pub ticker_min_secs: f32,
    pub ticker_max_secs: f32,
    pub enter_speed: f32,
    pub hold_secs: f32,
    pub phase_exit_speeds: Vec<f32>,
    pub dark_tint: Color,
    pub light_tint: Color,
    pub all_disabled: bool,
    pub auto_disabled: bool,
    pub background_disabled: bool,
}

impl Default for LightningConfig {
    fn default() -> Self {
        Self {
            ticker_min_secs: LIGHTNING_TICKER_MIN_SECS,
            ticker_max_secs: LIGHTNING_TICKER_MAX_SECS,
            enter_speed: LIGHTNING_ENTER_SPEED,
            hold_secs: LIGHTNING_HOLD_SECS,
            phase_exit_speeds: LIGHTNING_PHASE_EXIT_SPEEDS.to_vec(),
            dark_tint: DARK_TINT,
            light_tint: LIGHT_TINT,
            all_disabled: false,
            auto_disabled: false,
            background_disabled: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub lives: u32,
    pub hitbox_size: f32,
    pub colors: Vec<Color>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            lives: PLAYER_LIVES,
            hitbox_size: PLAYER_HITBOX_SIZE,
            colors: PLAYER_COLORS.to_vec(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MazeConfig {
    pub layout: String,
}

impl Default for MazeConfig {
    fn default() -> Self {
        Self {
            layout: DEFAULT_MAZE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub ghosts: GhostConfig,
    pub spawn: SpawnConfig,
    pub lightning: LightningConfig,
    pub players: PlayerConfig,
    pub maze: MazeConfig,
}

impl SimConfig {
    pub fn load(path: &Path) -> SimResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| SimError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content).map_err(|error| match error {
            SimError::ConfigParse { source, .. } => SimError::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: SimConfig =
            toml::from_str(content).map_err(|source| SimError::ConfigParse {
                path: "<inline>".into(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        let ghosts = &self.ghosts;
        require_positive("ghosts.speed", ghosts.speed)?;
        require_positive("ghosts.hitbox_size", ghosts.hitbox_size)?;
        require_positive("ghosts.arrive_epsilon", ghosts.arrive_epsilon)?;
        if !(0.0..=1.0).contains(&ghosts.last_bias) {
            return Err(invalid(format!(
                "ghosts.last_bias must be within [0, 1], got {}",
                ghosts.last_bias
            )));
        }
        if ghosts.start_count == 0 {
            return Err(invalid("ghosts.start_count must be at least 1".to_string()));
        }

        let spawn = &self.spawn;
        if !spawn.min_distance.is_finite() || spawn.min_distance < 0.0 {
            return Err(invalid(format!(
                "spawn.min_distance must be a non-negative number, got {}",
                spawn.min_distance
            )));
        }
        if spawn.retry_base_ms == 0 || spawn.retry_max_ms < spawn.retry_base_ms {
            return Err(invalid(
                "spawn retry window needs 0 < retry_base_ms <= retry_max_ms".to_string(),
            ));
        }
        if spawn.max_attempts == 0 {
            return Err(invalid("spawn.max_attempts must be at least 1".to_string()));
        }

        let lightning = &self.lightning;
        require_positive("lightning.ticker_min_secs", lightning.ticker_min_secs)?;
        require_positive("lightning.ticker_max_secs", lightning.ticker_max_secs)?;
        if lightning.ticker_min_secs > lightning.ticker_max_secs {
            return Err(invalid(format!(
                "lightning ticker range is inverted: {} > {}",
                lightning.ticker_min_secs, lightning.ticker_max_secs
            )));
        }
        require_positive("lightning.enter_speed", lightning.enter_speed)?;
        if !lightning.hold_secs.is_finite() || lightning.hold_secs < 0.0 {
            return Err(invalid(format!(
                "lightning.hold_secs must be non-negative, got {}",
                lightning.hold_secs
            )));
        }
        if lightning.phase_exit_speeds.is_empty() {
            return Err(invalid(
                "lightning.phase_exit_speeds needs at least one phase".to_string(),
            ));
        }
        for speed in &lightning.phase_exit_speeds {
            require_positive("lightning.phase_exit_speeds", *speed)?;
        }

        let players = &self.players;
        if players.lives == 0 {
            return Err(invalid("players.lives must be at least 1".to_string()));
        }
        require_positive("players.hitbox_size", players.hitbox_size)?;
        if players.colors.is_empty() {
            return Err(invalid("players.colors must not be empty".to_string()));
        }
        if self.maze.layout.trim().is_empty() {
            return Err(invalid("maze.layout must not be empty".to_string()));
        }
        Ok(())
    }
}

fn require_positive(name: &str, value: f32) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be a positive number, got {value}")))
    }
}

fn invalid(message: String) -> SimError {
    SimError::InvalidConfig(message)
}
