//! Process configuration (spec component C0).
//!
//! Every field has a sensible default so the server runs with zero
//! configuration; an optional TOML file overrides any subset of them.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

fn default_reliable_port() -> u16 {
    7777
}
fn default_tick_hz() -> f32 {
    30.0
}
fn default_spawn_interval_initial() -> f32 {
    2.0
}
fn default_spawn_interval_floor() -> f32 {
    0.8
}
fn default_spawn_interval_shrink() -> f32 {
    0.01
}
fn default_boss_score_threshold() -> u32 {
    100
}
fn default_player_default_health() -> i32 {
    100
}
fn default_player_fire_cooldown() -> f32 {
    0.3
}
fn default_basic_enemy_amplitude() -> f32 {
    50.0
}
fn default_basic_enemy_frequency() -> f32 {
    0.01
}
fn default_basic_enemy_base_speed() -> f32 {
    100.0
}
fn default_spread_enemy_amplitude() -> f32 {
    60.0
}
fn default_spread_enemy_frequency() -> f32 {
    0.015
}
fn default_spread_enemy_base_speed() -> f32 {
    100.0
}
fn default_spread_enemy_fire_cooldown() -> f32 {
    1.25
}
fn default_boss_speed() -> f32 {
    100.0
}
fn default_boss_health() -> i32 {
    1000
}
fn default_boss_width() -> f32 {
    0.08
}
fn default_boss_height() -> f32 {
    0.14
}
fn default_boss_fire_cooldown() -> f32 {
    0.5
}
fn default_boss_projectile_count() -> u8 {
    5
}
fn default_boss_angle_spread() -> f32 {
    15.0
}
fn default_server_id() -> u16 {
    1
}
fn default_server_ip() -> u32 {
    0x7f00_0001 // 127.0.0.1
}

/// Top-level, process-wide configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub gameplay: GameplaySection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            gameplay: GameplaySection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    #[serde(default = "default_reliable_port")]
    pub reliable_port: u16,
    #[serde(default = "default_server_id")]
    pub server_id: u16,
    #[serde(default = "default_server_ip")]
    pub server_ip: u32,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            reliable_port: default_reliable_port(),
            server_id: default_server_id(),
            server_ip: default_server_ip(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameplaySection {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f32,
    #[serde(default = "default_spawn_interval_initial")]
    pub spawn_interval_initial: f32,
    #[serde(default = "default_spawn_interval_floor")]
    pub spawn_interval_floor: f32,
    #[serde(default = "default_spawn_interval_shrink")]
    pub spawn_interval_shrink: f32,
    #[serde(default = "default_boss_score_threshold")]
    pub boss_score_threshold: u32,
    #[serde(default = "default_player_default_health")]
    pub player_default_health: i32,
    #[serde(default = "default_player_fire_cooldown")]
    pub player_fire_cooldown: f32,
    #[serde(default = "default_basic_enemy_amplitude")]
    pub basic_enemy_amplitude: f32,
    #[serde(default = "default_basic_enemy_frequency")]
    pub basic_enemy_frequency: f32,
    #[serde(default = "default_basic_enemy_base_speed")]
    pub basic_enemy_base_speed: f32,
    #[serde(default = "default_spread_enemy_amplitude")]
    pub spread_enemy_amplitude: f32,
    #[serde(default = "default_spread_enemy_frequency")]
    pub spread_enemy_frequency: f32,
    #[serde(default = "default_spread_enemy_base_speed")]
    pub spread_enemy_base_speed: f32,
    #[serde(default = "default_spread_enemy_fire_cooldown")]
    pub spread_enemy_fire_cooldown: f32,
    #[serde(default = "default_boss_speed")]
    pub boss_speed: f32,
    #[serde(default = "default_boss_health")]
    pub boss_health: i32,
    #[serde(default = "default_boss_width")]
    pub boss_width: f32,
    #[serde(default = "default_boss_height")]
    pub boss_height: f32,
    #[serde(default = "default_boss_fire_cooldown")]
    pub boss_fire_cooldown: f32,
    #[serde(default = "default_boss_projectile_count")]
    pub boss_projectile_count: u8,
    #[serde(default = "default_boss_angle_spread")]
    pub boss_angle_spread: f32,
}

impl Default for GameplaySection {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            spawn_interval_initial: default_spawn_interval_initial(),
            spawn_interval_floor: default_spawn_interval_floor(),
            spawn_interval_shrink: default_spawn_interval_shrink(),
            boss_score_threshold: default_boss_score_threshold(),
            player_default_health: default_player_default_health(),
            player_fire_cooldown: default_player_fire_cooldown(),
            basic_enemy_amplitude: default_basic_enemy_amplitude(),
            basic_enemy_frequency: default_basic_enemy_frequency(),
            basic_enemy_base_speed: default_basic_enemy_base_speed(),
            spread_enemy_amplitude: default_spread_enemy_amplitude(),
            spread_enemy_frequency: default_spread_enemy_frequency(),
            spread_enemy_base_speed: default_spread_enemy_base_speed(),
            spread_enemy_fire_cooldown: default_spread_enemy_fire_cooldown(),
            boss_speed: default_boss_speed(),
            boss_health: default_boss_health(),
            boss_width: default_boss_width(),
            boss_height: default_boss_height(),
            boss_fire_cooldown: default_boss_fire_cooldown(),
            boss_projectile_count: default_boss_projectile_count(),
            boss_angle_spread: default_boss_angle_spread(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults for any
    /// field the file omits. Returns defaults outright if `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServerError> {
        if self.gameplay.tick_hz <= 0.0 {
            return Err(ServerError::Config("gameplay.tick_hz must be > 0".into()));
        }
        if !(20.0..=60.0).contains(&self.gameplay.tick_hz) {
            return Err(ServerError::Config(
                "gameplay.tick_hz must be between 20 and 60".into(),
            ));
        }
        if self.gameplay.spawn_interval_floor <= 0.0 {
            return Err(ServerError::Config(
                "gameplay.spawn_interval_floor must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn dt(&self) -> f32 {
        1.0 / self.gameplay.tick_hz
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_file() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.server.reliable_port, 7777);
        assert_eq!(config.gameplay.boss_score_threshold, 100);
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let toml_text = "[gameplay]\ntick_hz = 60.0\n";
        let config: AppConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(config.gameplay.tick_hz, 60.0);
        assert_eq!(config.gameplay.boss_health, 1000);
        assert_eq!(config.server.reliable_port, 7777);
    }

    #[test]
    fn out_of_range_tick_rate_is_rejected() {
        let config = AppConfig {
            gameplay: GameplaySection {
                tick_hz: 5.0,
                ..GameplaySection::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
