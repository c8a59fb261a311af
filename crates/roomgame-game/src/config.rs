use roomgame_core::automaton::AutomatonConfig;
use roomgame_core::constants::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse game config RON: {0}")]
    ParseError(String),
    #[error("Invalid game config: {0}")]
    Invalid(String),
}

/// Session settings. Every field has a default, so a RON file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub columns: u32,
    pub rows: u32,
    pub height_units: f32,
    pub heal_amount: f32,
    pub min_room_span: u32,
    /// Seconds between slow updates.
    pub slow_update_interval: f32,
    pub populate_radius: f32,
    /// Fraction of the remaining path the outer influence covers per second.
    pub outer_influence_speed: f32,
    /// Height above the grid the outer influence patrols at.
    pub outer_influence_patrol_height: f32,
    /// Height above the grid the outer influence dives to when attacking.
    pub outer_influence_attack_height: f32,
    pub outer_influence_seed: u32,
    pub automaton: AutomatonConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            columns: GRID_COLUMNS,
            rows: GRID_ROWS,
            height_units: GRID_HEIGHT_UNITS,
            heal_amount: DEFAULT_HEAL_AMOUNT,
            min_room_span: MIN_ROOM_SPAN,
            slow_update_interval: SLOW_UPDATE_INTERVAL,
            populate_radius: POPULATE_CIRCLE_RADIUS,
            outer_influence_speed: OUTER_INFLUENCE_SPEED,
            outer_influence_patrol_height: 1.0,
            outer_influence_attack_height: 0.3,
            outer_influence_seed: 1,
            automaton: AutomatonConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a RON config.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        let options = ron::Options::default();
        let config: GameConfig = options
            .from_str(ron_str)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must have cells, got {}x{}",
                self.columns, self.rows
            )));
        }
        if !(self.height_units > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "height_units must be positive, got {}",
                self.height_units
            )));
        }
        if !(self.heal_amount > 0.0 && self.heal_amount <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "heal_amount must be in (0, 1], got {}",
                self.heal_amount
            )));
        }
        if !(self.slow_update_interval > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "slow_update_interval must be positive, got {}",
                self.slow_update_interval
            )));
        }
        let a = &self.automaton;
        if !(a.transition_time > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "transition_time must be positive, got {}",
                a.transition_time
            )));
        }
        for (name, value) in [
            ("birth_threshold", a.birth_threshold),
            ("death_threshold", a.death_threshold),
            ("collision_threshold", a.collision_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if a.outer_influence_neighbor_threshold > 8 {
            return Err(ConfigError::Invalid(format!(
                "outer_influence_neighbor_threshold must be at most 8, got {}",
                a.outer_influence_neighbor_threshold
            )));
        }
        Ok(())
    }
}
