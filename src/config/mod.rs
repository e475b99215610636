//! # Configuration Management Module
//!
//! Loads, validates and writes the world host configuration. All sections are
//! optional in the TOML file; anything omitted falls back to the defaults below.
//!
//! ## Configuration Structure
//!
//! - [`WorldConfig`] - data locations, start room, save and unload policy
//! - [`TimingConfig`] - turn and round lengths, calendar shape, visitor recency
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mudworld::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Rooms live under {}", config.world.rooms_dir().display());
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [world]
//! data_dir = "data"
//! start_room = 1
//! careful_save = true
//! unload_idle_rounds = 450
//! min_resident_rooms = 100
//! wildfire_spread_percent = 67
//!
//! [timing]
//! turn_ms = 100
//! round_seconds = 4
//! rounds_per_day = 360
//! night_hours = 8
//!
//! [logging]
//! level = "info"
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Root of all world data. Rooms are stored under `{data_dir}/rooms`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Directory of mutator definitions. Defaults to `{data_dir}/mutators`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutators_dir: Option<String>,
    /// Optional JSON biome table replacing the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biomes_file: Option<String>,
    /// Room that room id 0 resolves to.
    #[serde(default = "default_start_room")]
    pub start_room: u32,
    /// Write room files to a temp file and rename into place.
    #[serde(default = "default_true")]
    pub careful_save: bool,
    /// Rounds a room may sit unvisited before it becomes an unload candidate.
    #[serde(default = "default_unload_idle_rounds")]
    pub unload_idle_rounds: u64,
    /// Never unload below this many resident rooms.
    #[serde(default = "default_min_resident_rooms")]
    pub min_resident_rooms: usize,
    /// Relock interval used by locks that do not name their own.
    #[serde(default = "default_relock")]
    pub default_relock: String,
    /// Chance, per exit, that a burnt-out wildfire catches next door.
    #[serde(default = "default_wildfire_spread_percent")]
    pub wildfire_spread_percent: u32,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_start_room() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_unload_idle_rounds() -> u64 {
    450
}

fn default_min_resident_rooms() -> usize {
    100
}

fn default_relock() -> String {
    "1 hour".to_string()
}

fn default_wildfire_spread_percent() -> u32 {
    67
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            mutators_dir: None,
            biomes_file: None,
            start_room: default_start_room(),
            careful_save: true,
            unload_idle_rounds: default_unload_idle_rounds(),
            min_resident_rooms: default_min_resident_rooms(),
            default_relock: default_relock(),
            wildfire_spread_percent: default_wildfire_spread_percent(),
        }
    }
}

impl WorldConfig {
    /// Build a world config rooted at `data_dir`, everything else default.
    pub fn with_data_dir(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn rooms_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("rooms")
    }

    pub fn mutators_dir(&self) -> PathBuf {
        match &self.mutators_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.data_dir).join("mutators"),
        }
    }

    pub fn world_state_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("world_state.json")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Length of one turn in milliseconds.
    #[serde(default = "default_turn_ms")]
    pub turn_ms: u64,
    /// Length of one round in real seconds.
    #[serde(default = "default_round_seconds")]
    pub round_seconds: u64,
    /// Rounds in one in-game day.
    #[serde(default = "default_rounds_per_day")]
    pub rounds_per_day: u64,
    /// Hours of darkness, centred on midnight.
    #[serde(default = "default_night_hours")]
    pub night_hours: u32,
    /// How long (real seconds) a visit keeps counting as recent.
    #[serde(default = "default_visitor_tracking_seconds")]
    pub visitor_tracking_seconds: u64,
    /// Rounds between automatic save-all passes. 0 disables autosave.
    #[serde(default = "default_rounds_per_autosave")]
    pub rounds_per_autosave: u64,
}

fn default_turn_ms() -> u64 {
    100
}

fn default_round_seconds() -> u64 {
    4
}

fn default_rounds_per_day() -> u64 {
    360
}

fn default_night_hours() -> u32 {
    8
}

fn default_visitor_tracking_seconds() -> u64 {
    180
}

fn default_rounds_per_autosave() -> u64 {
    900
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            turn_ms: default_turn_ms(),
            round_seconds: default_round_seconds(),
            rounds_per_day: default_rounds_per_day(),
            night_hours: default_night_hours(),
            visitor_tracking_seconds: default_visitor_tracking_seconds(),
            rounds_per_autosave: default_rounds_per_autosave(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject timing and policy values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if t.round_seconds == 0 {
            return Err(anyhow!("timing.round_seconds must be at least 1"));
        }
        if t.turn_ms < 10 || t.turn_ms > t.round_seconds * 1000 {
            return Err(anyhow!(
                "timing.turn_ms must be between 10 and {} (got {})",
                t.round_seconds * 1000,
                t.turn_ms
            ));
        }
        if t.rounds_per_day < 24 {
            return Err(anyhow!(
                "timing.rounds_per_day must be at least 24 (got {})",
                t.rounds_per_day
            ));
        }
        if t.night_hours > 24 {
            return Err(anyhow!(
                "timing.night_hours must be at most 24 (got {})",
                t.night_hours
            ));
        }
        if self.world.wildfire_spread_percent > 100 {
            return Err(anyhow!(
                "world.wildfire_spread_percent must be at most 100 (got {})",
                self.world.wildfire_spread_percent
            ));
        }
        if self.world.data_dir.trim().is_empty() {
            return Err(anyhow!("world.data_dir must not be empty"));
        }
        Ok(())
    }
}
