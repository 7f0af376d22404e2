use crate::types::{Color, Vec2};

pub const TICK_RATE: u32 = 50;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const GHOST_SPEED: f32 = 2.0;
pub const GHOST_HITBOX_SIZE: f32 = 0.9;
pub const GHOST_ARRIVE_EPSILON: f32 = 0.05;
pub const GHOST_LAST_BIAS: f32 = 0.1;
pub const GHOST_START_COUNT: usize = 4;
pub const INITIAL_SPAWN_DELAY_MS: u64 = 1_000;
pub const RESPAWN_DELAY_MS: u64 = 3_000;
pub const KILL_DELAY_MS: u64 = 1_000;

pub const OFF_STAGE: Vec2 = Vec2 { x: 999.0, y: 999.0 };

pub const SPAWN_MIN_DISTANCE: f32 = 3.0;
pub const SPAWN_RETRY_BASE_MS: u64 = 500;
pub const SPAWN_RETRY_MAX_MS: u64 = 8_000;
pub const SPAWN_MAX_ATTEMPTS: u32 = 10;

pub const LIGHTNING_TICKER_MIN_SECS: f32 = 8.0;
pub const LIGHTNING_TICKER_MAX_SECS: f32 = 20.0;
pub const LIGHTNING_ENTER_SPEED: f32 = 20.0;
pub const LIGHTNING_HOLD_SECS: f32 = 0.1;
pub const LIGHTNING_PHASE_EXIT_SPEEDS: [f32; 2] = [5.0, 1.5];

pub const DARK_TINT: Color = Color::rgb(0.12, 0.12, 0.18);
pub const LIGHT_TINT: Color = Color::rgb(1.0, 1.0, 1.0);

pub const PLAYER_LIVES: u32 = 3;
pub const PLAYER_HITBOX_SIZE: f32 = 0.8;
pub const PLAYER_COLORS: [Color; 4] = [
    Color::rgb(0.4, 0.6, 0.6),
    Color::rgb(0.6, 0.4, 0.4),
    Color::rgb(0.4, 0.6, 0.4),
    Color::rgb(0.6, 0.6, 0.4),
];
pub const MAX_PLAYERS: usize = 4;

pub const ANNOUNCE_HIDE_MS: u64 = 2_000;
pub const ALERT_COLOR: Color = Color::rgb(0.6, 0.2, 0.2);
pub const TEXT_GHOST_KILLED: &str = "Nice! You killed a Ghost";
pub const TEXT_PLAYER_KILLED: &str = "Oops! A Ghost killed you";
pub const TEXT_GAME_OVER: &str = "GAME OVER, Press R key to restart";

/// `o` waypoint, `H` waypoint doubling as a player home slot,
/// `-` and `|` join neighbouring waypoints. One character is one world unit.
pub const DEFAULT_MAZE: &str = "\
o---o-------o---o-------o---o
|   |       |   |       |   |
|   o---o---o   o---o---o   |
|   |       |   |       |   |
o---o   o---o---o---o   o---o
|       |   |   |   |       |
o-------o   H---H   o-------o
|       |   |   |   |       |
o---o   o---H---H---o   o---o
|   |       |   |       |   |
|   o---o---o   o---o---o   |
|   |       |   |       |   |
o---o-------o---o-------o---o";

/// Exponential backoff for an exhausted spawn attempt, capped at `max_ms`.
pub fn get_spawn_retry_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(max_ms)
}

pub fn get_player_color(index: usize) -> Color {
    PLAYER_COLORS[index % PLAYER_COLORS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_doubles_until_cap() {
        assert_eq!(get_spawn_retry_delay_ms(0, 500, 8_000), 500);
        assert_eq!(get_spawn_retry_delay_ms(1, 500, 8_000), 1_000);
        assert_eq!(get_spawn_retry_delay_ms(3, 500, 8_000), 4_000);
        assert_eq!(get_spawn_retry_delay_ms(5, 500, 8_000), 8_000);
        assert_eq!(get_spawn_retry_delay_ms(80, 500, 8_000), 8_000);
    }

    #[test]
    fn player_colors_wrap() {
        assert_eq!(get_player_color(0), get_player_color(4));
    }
}
