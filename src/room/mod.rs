//! Rooms and sessions
//!
//! A room owns one simulation and the seats driving it. Every seat maps to one
//! train for the room's lifetime; disconnecting swaps the seat's controller
//! for the fallback AI and never touches the train.

pub mod lobby;
pub mod mailbox;
pub mod runner;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RoomConfig;
use crate::consts::*;
use crate::controller::{Controller, ControllerKind, FallbackController, NetworkController};
use crate::error::AdmissionError;
use crate::leaderboard::BestScores;
use crate::net::protocol::ServerMessage;
use crate::sim::{self, GameEvent, GameState, Intent, TrainId};
use crate::snapshot::Snapshot;
use mailbox::IntentSlot;

pub use lobby::Lobby;
pub use runner::{RoomHandle, spawn_room};

pub type RoomId = u32;

/// Names handed to bots filling empty seats
pub const BOT_NAMES: [&str; 20] = [
    "Bot Adrian",
    "Bot Albert",
    "Bot Allen",
    "Bot Andy",
    "Bot Arnold",
    "Bot Bert",
    "Bot Cecil",
    "Bot Charles",
    "Bot Clarence",
    "Bot Elmer",
    "Bot Ernest",
    "Bot Felix",
    "Bot Frank",
    "Bot Fred",
    "Bot Gilbert",
    "Bot Gus",
    "Bot Hank",
    "Bot Howard",
    "Bot James",
    "Bot Lester",
];

const MAX_PLAYER_ID_LEN: usize = 64;

/// How a client takes part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Person playing by hand
    #[default]
    Manual,
    /// Program submitting intents
    Agent,
    /// Receives snapshots, owns no train
    Observer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub player_id: String,
    pub nickname: String,
    pub mode: JoinMode,
}

/// What a connection needs after a successful join
#[derive(Debug, Clone)]
pub struct JoinTicket {
    pub room_id: RoomId,
    pub player_id: String,
    /// None for observers
    pub train: Option<TrainId>,
    /// Where the connection drops intents
    pub slot: Option<Arc<IntentSlot>>,
    pub resumed: bool,
}

impl JoinTicket {
    pub fn welcome(&self) -> ServerMessage {
        ServerMessage::Welcome {
            room_id: self.room_id,
            train_id: self.train,
            observer: self.train.is_none(),
            resumed: self.resumed,
        }
    }
}

/// Lifecycle of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Seats filling up
    Waiting,
    Running,
    Finished,
}

/// A train and whoever drives it
struct Seat {
    /// None for bots
    player_id: Option<String>,
    nickname: String,
    train: TrainId,
    controller: Box<dyn Controller>,
    connected: bool,
}

impl Seat {
    fn is_player(&self) -> bool {
        self.player_id.is_some()
    }
}

pub struct Room {
    pub id: RoomId,
    config: RoomConfig,
    phase: Phase,
    state: GameState,
    seats: BTreeMap<TrainId, Seat>,
    observers: BTreeSet<String>,
    best_scores: BestScores,
    last_snapshot: Option<Snapshot>,
    waited_ticks: u32,
}

impl Room {
    /// Create a room. The grid is sized for a full room up front.
    pub fn new(id: RoomId, config: RoomConfig) -> Self {
        let seed = config.seed.unwrap_or_else(rand::random);
        log::info!(
            "Creating room {id} (capacity {}, seed {seed})",
            config.room_capacity
        );
        let state = GameState::for_players(config.clone(), config.room_capacity, seed);
        Self {
            id,
            config,
            phase: Phase::Waiting,
            state,
            seats: BTreeMap::new(),
            observers: BTreeSet::new(),
            best_scores: BestScores::new(),
            last_snapshot: None,
            waited_ticks: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn best_scores(&self) -> &BestScores {
        &self.best_scores
    }

    /// Seated players and bots
    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Seats still driven by a connected client
    pub fn connected_players(&self) -> usize {
        self.seats
            .values()
            .filter(|s| s.is_player() && s.connected)
            .count()
    }

    pub fn controller_kind(&self, train: TrainId) -> Option<ControllerKind> {
        self.seats.get(&train).map(|s| s.controller.kind())
    }

    pub fn waiting_ticks_remaining(&self) -> u32 {
        self.config
            .waiting_ticks_before_bots
            .saturating_sub(self.waited_ticks)
    }

    pub fn remaining_ticks(&self) -> u64 {
        self.config
            .game_duration_ticks
            .saturating_sub(self.state.time_ticks)
    }

    /// Admit a player or observer
    pub fn join(&mut self, request: JoinRequest) -> Result<JoinTicket, AdmissionError> {
        if self.phase == Phase::Finished {
            return Err(AdmissionError::RoomClosed);
        }
        let player_id = request.player_id.trim();
        if player_id.is_empty() || player_id.len() > MAX_PLAYER_ID_LEN {
            return Err(AdmissionError::InvalidPlayerId(request.player_id));
        }
        let player_id = player_id.to_string();
        if self.observers.contains(&player_id) {
            return Err(AdmissionError::DuplicatePlayer(player_id));
        }

        let seated = |id: &str| self.seats.values().any(|s| s.player_id.as_deref() == Some(id));
        if request.mode == JoinMode::Observer {
            if seated(&player_id) {
                return Err(AdmissionError::DuplicatePlayer(player_id));
            }
            log::info!("Observer {player_id} joined room {}", self.id);
            self.observers.insert(player_id.clone());
            return Ok(JoinTicket {
                room_id: self.id,
                player_id,
                train: None,
                slot: None,
                resumed: false,
            });
        }

        let existing = self
            .seats
            .values()
            .find(|s| s.player_id.as_deref() == Some(player_id.as_str()))
            .map(|s| (s.train, s.connected));
        if let Some((train, connected)) = existing {
            if connected {
                return Err(AdmissionError::DuplicatePlayer(player_id));
            }
            if !self.config.allow_resume {
                return Err(AdmissionError::MatchInProgress);
            }
            return Ok(self.resume(train, player_id, request.mode));
        }

        let nickname = validate_nickname(&request.nickname)?;
        if self.phase != Phase::Waiting {
            return Err(AdmissionError::MatchInProgress);
        }
        if self.seats.values().any(|s| s.nickname == nickname) {
            return Err(AdmissionError::DuplicateName(nickname));
        }
        if self.seats.len() >= self.config.room_capacity {
            return Err(AdmissionError::RoomFull {
                capacity: self.config.room_capacity,
            });
        }
        let Some(train) = self.state.add_train(&nickname) else {
            return Err(AdmissionError::RoomFull {
                capacity: self.seats.len(),
            });
        };

        let slot = Arc::new(IntentSlot::default());
        self.seats.insert(
            train,
            Seat {
                player_id: Some(player_id.clone()),
                nickname: nickname.clone(),
                train,
                controller: Box::new(NetworkController::new(kind_for(request.mode), slot.clone())),
                connected: true,
            },
        );
        log::info!(
            "{nickname} ({player_id}) joined room {} as train {train} ({}/{})",
            self.id,
            self.seats.len(),
            self.config.room_capacity
        );

        Ok(JoinTicket {
            room_id: self.id,
            player_id,
            train: Some(train),
            slot: Some(slot),
            resumed: false,
        })
    }

    /// Hand a train left to the fallback back to its returning player
    fn resume(&mut self, train: TrainId, player_id: String, mode: JoinMode) -> JoinTicket {
        let slot = Arc::new(IntentSlot::default());
        if let Some(seat) = self.seats.get_mut(&train) {
            seat.controller = Box::new(NetworkController::new(kind_for(mode), slot.clone()));
            seat.connected = true;
            log::info!(
                "{} ({player_id}) resumed train {train} in room {}",
                seat.nickname,
                self.id
            );
        }
        JoinTicket {
            room_id: self.id,
            player_id,
            train: Some(train),
            slot: Some(slot),
            resumed: true,
        }
    }

    /// A client left or timed out
    pub fn disconnect(&mut self, player_id: &str) {
        if self.observers.remove(player_id) {
            log::info!("Observer {player_id} left room {}", self.id);
            return;
        }
        let Some(train) = self
            .seats
            .values()
            .find(|s| s.player_id.as_deref() == Some(player_id))
            .map(|s| s.train)
        else {
            return;
        };

        match self.phase {
            Phase::Waiting => {
                self.seats.remove(&train);
                self.state.remove_train(train);
                log::info!("{player_id} left waiting room {}", self.id);
            }
            Phase::Running => {
                if let Some(seat) = self.seats.get_mut(&train) {
                    seat.controller = Box::new(FallbackController::new());
                    seat.connected = false;
                    log::info!(
                        "{} ({player_id}) disconnected, AI takes over train {train} in room {}",
                        seat.nickname,
                        self.id
                    );
                }
            }
            Phase::Finished => {}
        }

        if self.phase != Phase::Finished && self.connected_players() == 0 {
            log::info!("Last player left room {}, closing", self.id);
            self.phase = Phase::Finished;
        }
    }

    /// Advance the room by one scheduler tick; returns messages to broadcast
    pub fn step(&mut self) -> Vec<ServerMessage> {
        match self.phase {
            Phase::Waiting => self.step_waiting(),
            Phase::Running => self.step_running(),
            Phase::Finished => Vec::new(),
        }
    }

    fn step_waiting(&mut self) -> Vec<ServerMessage> {
        if self.seats.is_empty() {
            log::info!("Room {} has no players, closing", self.id);
            self.phase = Phase::Finished;
            return Vec::new();
        }
        self.waited_ticks = self.waited_ticks.saturating_add(1);
        if self.seats.len() >= self.config.room_capacity {
            log::info!("Room {} is full", self.id);
            self.start();
        } else if self.waiting_ticks_remaining() == 0 {
            log::info!("Waiting time expired for room {}, adding bots", self.id);
            self.start();
        }

        if self.phase == Phase::Running {
            return vec![ServerMessage::Snapshot(self.capture())];
        }
        vec![ServerMessage::WaitingRoom {
            room_id: self.id,
            players: self.seats.values().map(|s| s.nickname.clone()).collect(),
            capacity: self.config.room_capacity,
            waiting_ticks_remaining: self.waiting_ticks_remaining(),
        }]
    }

    /// Fill empty seats with bots and start the match
    pub fn start(&mut self) {
        while self.seats.len() < self.config.room_capacity {
            let nickname = self.next_bot_name();
            let Some(train) = self.state.add_train(&nickname) else {
                log::warn!("No room on the grid for {nickname}");
                break;
            };
            log::info!("Adding {nickname} as train {train} to room {}", self.id);
            self.seats.insert(
                train,
                Seat {
                    player_id: None,
                    nickname,
                    train,
                    controller: Box::new(FallbackController::new()),
                    connected: true,
                },
            );
        }
        self.phase = Phase::Running;
        log::info!(
            "Room {} started with {} trains",
            self.id,
            self.state.trains.len()
        );
    }

    fn next_bot_name(&self) -> String {
        let taken = |name: &str| self.seats.values().any(|s| s.nickname == name);
        if let Some(name) = BOT_NAMES.into_iter().find(|&n| !taken(n)) {
            return name.to_string();
        }
        (BOT_NAMES.len() + 1..)
            .map(|n| format!("{BOT_PREFIX}{n}"))
            .find(|n| !taken(n.as_str()))
            .unwrap_or_else(|| BOT_PREFIX.trim().to_string())
    }

    fn step_running(&mut self) -> Vec<ServerMessage> {
        let snapshot = match self.last_snapshot.take() {
            Some(snapshot) => snapshot,
            None => self.capture(),
        };

        let mut intents: BTreeMap<TrainId, Intent> = BTreeMap::new();
        for (&train, seat) in self.seats.iter_mut() {
            if let Some(intent) = seat.controller.compute_intent(&snapshot, train) {
                intents.insert(train, intent);
            }
        }

        let mut deaths = Vec::new();
        for event in sim::tick(&mut self.state, &intents) {
            log::trace!("Room {} tick {}: {event:?}", self.id, self.state.time_ticks);
            if let GameEvent::Died { train, cause } = event {
                let respawn_remaining = self.state.train(train).map_or(0, |t| t.respawn_remaining());
                deaths.push(ServerMessage::Death {
                    train_id: train,
                    cause,
                    respawn_remaining,
                });
            }
        }
        for train in &self.state.trains {
            self.best_scores.record(&train.nickname, train.score);
        }

        let snapshot = self.capture();
        let mut messages = vec![ServerMessage::Snapshot(snapshot)];
        messages.extend(deaths);

        if self.remaining_ticks() == 0 {
            log::info!(
                "Room {} finished after {} ticks",
                self.id,
                self.state.time_ticks
            );
            self.phase = Phase::Finished;
            messages.push(ServerMessage::GameOver {
                final_scores: self.best_scores.clone(),
            });
        }
        messages
    }

    /// Capture and remember the snapshot controllers see next tick
    fn capture(&mut self) -> Snapshot {
        let kinds: BTreeMap<TrainId, ControllerKind> = self
            .seats
            .iter()
            .map(|(&train, seat)| (train, seat.controller.kind()))
            .collect();
        let snapshot = Snapshot::capture(&self.state, &kinds, &self.best_scores, self.remaining_ticks());
        self.last_snapshot = Some(snapshot.clone());
        snapshot
    }
}

fn kind_for(mode: JoinMode) -> ControllerKind {
    match mode {
        JoinMode::Agent => ControllerKind::Agent,
        JoinMode::Manual | JoinMode::Observer => ControllerKind::Human,
    }
}

/// Display names: 1 to 15 characters, not posing as a bot
pub fn validate_nickname(nickname: &str) -> Result<String, AdmissionError> {
    let trimmed = nickname.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NICKNAME_LEN || trimmed.starts_with(BOT_PREFIX) {
        return Err(AdmissionError::InvalidName(nickname.to_string()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(AdmissionError::InvalidName(nickname.to_string()));
    }
    Ok(trimmed.to_string())
}
