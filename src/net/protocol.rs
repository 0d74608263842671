//! Wire protocol
//!
//! Newline-delimited JSON objects tagged by `"type"`. Clients send joins,
//! intents, pings and leaves; the server sends welcomes, rejections, waiting
//! room updates, snapshots, the final scores and pongs.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::leaderboard::BestScores;
use crate::room::{JoinMode, RoomId};
use crate::sim::{DeathCause, Intent, Steer, TrainId};
use crate::snapshot::Snapshot;

/// Client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        nickname: String,
        player_id: String,
        #[serde(default)]
        mode: JoinMode,
    },
    Intent {
        #[serde(default)]
        steer: Option<Steer>,
        #[serde(default)]
        drop_wagon: bool,
    },
    Ping,
    Leave,
}

impl ClientMessage {
    /// The simulation intent carried by an `intent` message
    pub fn as_intent(&self) -> Option<Intent> {
        match *self {
            ClientMessage::Intent { steer, drop_wagon } => Some(Intent { steer, drop_wagon }),
            _ => None,
        }
    }
}

/// Server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        room_id: RoomId,
        /// None for observers
        train_id: Option<TrainId>,
        observer: bool,
        /// Took back a train left behind on disconnect
        resumed: bool,
    },
    Rejected {
        reason: String,
    },
    WaitingRoom {
        room_id: RoomId,
        players: Vec<String>,
        capacity: usize,
        waiting_ticks_remaining: u32,
    },
    Snapshot(Snapshot),
    /// A train died this tick
    Death {
        train_id: TrainId,
        cause: DeathCause,
        respawn_remaining: u32,
    },
    GameOver {
        final_scores: BestScores,
    },
    Pong,
}

/// Parse one line from a client
pub fn decode_client(line: &str) -> Result<ClientMessage, ProtocolError> {
    Ok(serde_json::from_str(line.trim())?)
}

/// Serialize a message as one newline-terminated line
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}
