//! Error types
//!
//! Nothing here is fatal to the simulation: protocol errors are logged and
//! dropped, admission errors are reported back to the joining client.

use std::path::PathBuf;

use thiserror::Error;

/// Server result type
pub type Result<T> = std::result::Result<T, ServerError>;

/// A client message that cannot be honored
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("intent received from a client without a train")]
    NoTrain,

    #[error("observers cannot submit intents")]
    ObserverIntent,

    #[error("client already joined room {0}")]
    AlreadyJoined(u32),
}

/// Rejection at join time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("room is full ({capacity} players)")]
    RoomFull { capacity: usize },

    #[error("a match is already in progress")]
    MatchInProgress,

    #[error("name '{0}' is already taken in this room")]
    DuplicateName(String),

    #[error("invalid name '{0}'")]
    InvalidName(String),

    #[error("invalid player id '{0}'")]
    InvalidPlayerId(String),

    #[error("player '{0}' is already connected")]
    DuplicatePlayer(String),

    #[error("room closed")]
    RoomClosed,
}

/// Configuration loading or validation failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Process-level server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
