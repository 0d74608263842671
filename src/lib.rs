//! Railyard - authoritative server for a multiplayer train grid game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, trains, passengers, zones, collisions)
//! - `snapshot`: Per-tick world view shared with every controller
//! - `controller`: Intent producers (network players, fallback AI)
//! - `room`: Sessions, admission, tick scheduling
//! - `net`: Wire protocol and TCP server
//! - `config`: Server and room configuration

pub mod config;
pub mod controller;
pub mod error;
pub mod leaderboard;
pub mod net;
pub mod room;
pub mod sim;
pub mod snapshot;

pub use config::{Pacing, RoomConfig, ServerConfig};
pub use error::{AdmissionError, ConfigError, ProtocolError, ServerError};
pub use leaderboard::BestScores;
pub use snapshot::Snapshot;

/// Game configuration constants
pub mod consts {
    /// Tick rate every duration in the default configuration is expressed against
    pub const REFERENCE_TICK_RATE: u32 = 60;

    /// Grid defaults (cells)
    pub const BASE_GRID_CELLS: i32 = 20;
    pub const GRID_CELLS_PER_PLAYER: i32 = 1;
    pub const CELL_SIZE: i32 = 20;

    /// Cells a train covers per second at zero wagons
    pub const INITIAL_SPEED: f32 = 10.0;
    /// Speed multiplier applied once per carried wagon
    pub const SPEED_DECREMENT_COEFFICIENT: f32 = 0.95;
    pub const BOOST_INTENSITY: f32 = 3.0;

    /// Distance (cells) a spawn keeps from walls and other trains
    pub const SPAWN_SAFE_ZONE: i32 = 3;
    pub const SPAWN_ATTEMPTS: usize = 100;

    /// Display names
    pub const MAX_NICKNAME_LEN: usize = 15;
    pub const BOT_PREFIX: &str = "Bot ";
}

/// Convert a duration in seconds to ticks at the reference rate
#[inline]
pub fn seconds_to_ticks(seconds: f32) -> u32 {
    (seconds * consts::REFERENCE_TICK_RATE as f32).round().max(0.0) as u32
}
