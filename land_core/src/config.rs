//! Game constants shared with the on-chain contracts.
//!
//! Loaded from `game_config.json` with an optional override path in
//! `PONZILAND_CONFIG_PATH`.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use land_schema::Felt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell::Level;

pub const BUILTIN_GAME_CONFIG: &str = include_str!("data/game_config.json");

pub const CONFIG_PATH_ENV: &str = "PONZILAND_CONFIG_PATH";

const BASE_TOKEN: &str = "0x05735fa6be5dd248350866644c0a137e571f9d637bb4db6532ddd63a95854b58";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the square land grid.
    pub grid_size: u32,
    /// Ledger namespace the land models are published under.
    pub namespace: String,
    /// Multiplier applied to wall-clock time by the contracts.
    pub game_speed: u64,
    /// Tax charged per tax period, as a percentage of the listed price.
    pub tax_rate_percent: u64,
    pub max_neighbors: u32,
    pub tax_period_seconds: u64,
    /// Game-time seconds a building needs per level.
    pub level_up_seconds: u64,
    pub max_level: u8,
    /// Game-time seconds after which an auction sits at its floor price.
    pub auction_duration_seconds: u64,
    /// Divisor turning an auction's raw decay rate into an exponent.
    pub decay_scale: u64,
    pub bootstrap_page_size: u32,
    /// Currency auctions are settled in.
    pub base_token: Felt,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 64,
            namespace: "ponzi_land".to_string(),
            game_speed: 20,
            tax_rate_percent: 2,
            max_neighbors: 8,
            tax_period_seconds: 3600,
            level_up_seconds: 60 * 60 * 48,
            max_level: 3,
            auction_duration_seconds: 60 * 60 * 24 * 7,
            decay_scale: 1000,
            bootstrap_page_size: 50,
            base_token: Felt::from_hex(BASE_TOKEN).unwrap_or(Felt::ZERO),
        }
    }
}

impl GameConfig {
    pub fn builtin() -> Arc<Self> {
        Arc::new(
            serde_json::from_str(BUILTIN_GAME_CONFIG).expect("builtin game config should parse"),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, GameConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, GameConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| GameConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        GameConfig::from_json_str(&contents)
    }

    /// Rejects values the projections would divide by.
    pub fn validate(&self) -> Result<(), GameConfigError> {
        let checks: [(&'static str, bool); 7] = [
            ("grid_size", self.grid_size > 0),
            ("game_speed", self.game_speed > 0),
            ("max_neighbors", self.max_neighbors > 0),
            ("tax_period_seconds", self.tax_period_seconds > 0),
            ("level_up_seconds", self.level_up_seconds > 0),
            (
                "max_level",
                self.max_level > 0 && usize::from(self.max_level) <= Level::ALL.len(),
            ),
            ("decay_scale", self.decay_scale > 0),
        ];
        match checks.iter().find(|(_, ok)| !ok) {
            Some((field, _)) => Err(GameConfigError::Invalid { field: *field }),
            None => Ok(()),
        }
    }

    pub fn cell_count(&self) -> usize {
        (self.grid_size as usize).saturating_mul(self.grid_size as usize)
    }

    pub fn tax_rate(&self) -> f64 {
        self.tax_rate_percent as f64 / 100.0
    }

    /// A config for a different grid side, keeping every other constant.
    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }
}

#[derive(Debug, Error)]
pub enum GameConfigError {
    #[error("failed to parse game config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read game config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("game config field '{field}' must be greater than zero")]
    Invalid { field: &'static str },
}

#[derive(Debug, Clone)]
pub struct GameConfigMetadata {
    path: Option<PathBuf>,
}

impl GameConfigMetadata {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

pub fn load_game_config_from_env() -> (Arc<GameConfig>, GameConfigMetadata) {
    let Some(path) = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) else {
        tracing::info!(target: "ponziland::config", "game_config.loaded=builtin");
        return (GameConfig::builtin(), GameConfigMetadata::new(None));
    };

    match GameConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "ponziland::config",
                path = %path.display(),
                grid_size = config.grid_size,
                "game_config.loaded=file"
            );
            (Arc::new(config), GameConfigMetadata::new(Some(path)))
        }
        Err(err) => {
            tracing::warn!(
                target: "ponziland::config",
                path = %path.display(),
                error = %err,
                "game_config.load_failed"
            );
            (GameConfig::builtin(), GameConfigMetadata::new(None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_matches_contract_constants() {
        let config = GameConfig::builtin();
        assert_eq!(*config, GameConfig::default());
        assert_eq!(config.cell_count(), 64 * 64);
        assert!((config.tax_rate() - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.base_token.to_string(), BASE_TOKEN);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = GameConfig::from_json_str(r#"{ "grid_size": 8 }"#).unwrap();
        assert_eq!(config.grid_size, 8);
        assert_eq!(config.game_speed, 20);
        assert_eq!(config.namespace, "ponzi_land");
    }

    #[test]
    fn zero_divisors_are_rejected() {
        let err = GameConfig::from_json_str(r#"{ "max_neighbors": 0 }"#).unwrap_err();
        assert!(matches!(
            err,
            GameConfigError::Invalid {
                field: "max_neighbors"
            }
        ));
    }

    #[test]
    fn max_level_is_bounded_by_building_levels() {
        let err = GameConfig::from_json_str(r#"{ "max_level": 5 }"#).unwrap_err();
        assert!(matches!(err, GameConfigError::Invalid { field: "max_level" }));
        let top = GameConfig::from_json_str(r#"{ "max_level": 3 }"#).unwrap();
        assert_eq!(usize::from(top.max_level), Level::ALL.len());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = GameConfig::from_file(Path::new("/nonexistent/game_config.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/game_config.json"));
    }
}
