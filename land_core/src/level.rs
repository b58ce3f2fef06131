use serde::Serialize;

use crate::cell::Level;
use crate::config::GameConfig;

/// Building level progression at a point in time. Levels are display levels
/// (1 to `max_level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelInfo {
    pub can_level_up: bool,
    pub current_level: u8,
    pub expected_level: u8,
    /// Game-time seconds since the last level threshold.
    pub time_since_last_level_up: u64,
    /// Game-time seconds per level, zero once the cap is reached.
    pub level_up_time: u64,
    /// Wall-clock seconds until the next threshold, `None` at the cap.
    pub time_to_next_level: Option<u64>,
}

pub fn level_progress(bought_at: u64, current: Level, now: u64, config: &GameConfig) -> LevelInfo {
    let owned_for = now.saturating_sub(bought_at).saturating_mul(config.game_speed);
    let reached = owned_for / config.level_up_seconds + 1;
    let expected_level = reached.min(u64::from(config.max_level)) as u8;
    let time_since_last_level_up = owned_for % config.level_up_seconds;
    let capped = expected_level >= config.max_level;

    let time_to_next_level = (!capped).then(|| {
        (config.level_up_seconds - time_since_last_level_up).div_ceil(config.game_speed)
    });

    LevelInfo {
        can_level_up: expected_level > current.display_level(),
        current_level: current.display_level(),
        expected_level,
        time_since_last_level_up,
        level_up_time: if capped { 0 } else { config.level_up_seconds },
        time_to_next_level,
    }
}
