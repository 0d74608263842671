//! Server and room configuration
//!
//! One explicit struct is handed to every room at construction. Durations are
//! expressed in ticks at the reference tick rate.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::seconds_to_ticks;

/// How the tick scheduler paces a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    /// One tick per `1 / tick_rate` seconds
    #[default]
    Realtime,
    /// Ticks back to back (grading runs)
    AsFastAsPossible,
}

impl Pacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pacing::Realtime => "realtime",
            Pacing::AsFastAsPossible => "as_fast_as_possible",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "realtime" | "real-time" => Some(Pacing::Realtime),
            "as_fast_as_possible" | "fast" | "grading" => Some(Pacing::AsFastAsPossible),
            _ => None,
        }
    }
}

/// Rules and sizing for a single room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Ticks per real second
    pub tick_rate: u32,
    /// Trains per room
    pub room_capacity: usize,
    /// Fixed RNG seed; a random one is drawn per room when absent
    pub seed: Option<u64>,

    // === Grid ===
    pub cell_size: i32,
    pub base_grid_cells: i32,
    pub grid_cells_per_player: i32,

    // === Trains ===
    /// Cells per tick with no wagons
    pub base_speed: f32,
    /// Speed multiplier per wagon
    pub speed_decay: f32,
    pub boost_intensity: f32,
    pub boost_duration_ticks: u32,
    /// Cooldown after a boost ends before the next wagon drop
    pub boost_cooldown_ticks: u32,
    pub respawn_delay_ticks: u32,
    /// Entering your own wagons is fatal
    pub self_collision: bool,
    /// Any wagon inside a zone delivers, not only the head
    pub deliver_from_body: bool,

    // === Passengers ===
    /// Total passengers on the map the spawner tops up to
    pub max_passengers: u32,
    pub max_passengers_per_cell: u32,
    pub passenger_spawn_interval_ticks: u32,

    // === Match ===
    /// Ticks after the first join before empty seats are filled with bots
    pub waiting_ticks_before_bots: u32,
    pub game_duration_ticks: u64,
    /// A reconnecting player id takes its train back from the fallback
    pub allow_resume: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            tick_rate: REFERENCE_TICK_RATE,
            room_capacity: 2,
            seed: None,

            cell_size: CELL_SIZE,
            base_grid_cells: BASE_GRID_CELLS,
            grid_cells_per_player: GRID_CELLS_PER_PLAYER,

            base_speed: INITIAL_SPEED / REFERENCE_TICK_RATE as f32,
            speed_decay: SPEED_DECREMENT_COEFFICIENT,
            boost_intensity: BOOST_INTENSITY,
            boost_duration_ticks: seconds_to_ticks(0.25),
            boost_cooldown_ticks: seconds_to_ticks(10.0),
            respawn_delay_ticks: seconds_to_ticks(5.0),
            self_collision: true,
            deliver_from_body: false,

            max_passengers: 4,
            max_passengers_per_cell: 3,
            passenger_spawn_interval_ticks: seconds_to_ticks(1.0),

            waiting_ticks_before_bots: seconds_to_ticks(30.0),
            game_duration_ticks: seconds_to_ticks(300.0) as u64,
            allow_resume: true,
        }
    }
}

impl RoomConfig {
    /// Real time between two ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        if self.room_capacity == 0 {
            return Err(ConfigError::Invalid("room_capacity must be positive".into()));
        }
        if self.cell_size <= 0 || self.base_grid_cells <= 2 * SPAWN_SAFE_ZONE {
            return Err(ConfigError::Invalid(format!(
                "grid too small: {} cells of {}px",
                self.base_grid_cells, self.cell_size
            )));
        }
        if !(self.base_speed > 0.0) || !(self.speed_decay > 0.0) || !(self.boost_intensity >= 1.0) {
            return Err(ConfigError::Invalid("speeds must be positive".into()));
        }
        if self.max_passengers_per_cell == 0 {
            return Err(ConfigError::Invalid(
                "max_passengers_per_cell must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 127.0.0.1 for local only, 0.0.0.0 to accept remote clients
    pub host: String,
    pub port: u16,
    /// Silence after which a client counts as disconnected
    pub client_timeout_secs: f32,
    pub pacing: Pacing,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5555,
            client_timeout_secs: 2.0,
            pacing: Pacing::Realtime,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Parse from a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.client_timeout_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "client_timeout_secs must be positive".into(),
            ));
        }
        self.room.validate()
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs_f32(self.client_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
