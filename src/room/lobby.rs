//! Lobby: routes joins to rooms
//!
//! Holds no game state. A joiner goes to the first room that admits them, and
//! a new room is opened when every existing one is full or already playing.
//! The room list is only locked while choosing the next room to try, never
//! while a room is deciding.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::runner::{Joined, RoomHandle, spawn_room};
use super::{JoinMode, JoinRequest, Room, RoomId};
use crate::config::{Pacing, RoomConfig};
use crate::error::AdmissionError;

pub struct Lobby {
    config: RoomConfig,
    pacing: Pacing,
    rooms: Mutex<Rooms>,
}

struct Rooms {
    open: Vec<RoomHandle>,
    next_id: RoomId,
}

impl Lobby {
    pub fn new(config: RoomConfig, pacing: Pacing) -> Self {
        Self {
            config,
            pacing,
            rooms: Mutex::new(Rooms {
                open: Vec::new(),
                next_id: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Rooms> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rooms whose task is still running
    pub fn room_count(&self) -> usize {
        self.lock().open.iter().filter(|r| !r.is_closed()).count()
    }

    pub async fn join(&self, request: JoinRequest) -> Result<(Joined, RoomHandle), AdmissionError> {
        // Observers only watch existing rooms
        let may_open = request.mode != JoinMode::Observer;
        let mut tried = BTreeSet::new();

        while let Some((room, fresh)) = self.next_room(&tried, may_open) {
            tried.insert(room.id);
            match room.join(request.clone()).await {
                Ok(joined) => return Ok((joined, room)),
                Err(e) if fresh => return Err(e),
                // Try the next room
                Err(
                    AdmissionError::RoomFull { .. }
                    | AdmissionError::MatchInProgress
                    | AdmissionError::RoomClosed,
                ) => {}
                Err(e) => return Err(e),
            }
        }
        Err(AdmissionError::RoomClosed)
    }

    /// First live room not tried yet, or a newly opened one (flagged `true`)
    fn next_room(&self, tried: &BTreeSet<RoomId>, may_open: bool) -> Option<(RoomHandle, bool)> {
        let mut rooms = self.lock();
        rooms.open.retain(|r| !r.is_closed());
        if let Some(room) = rooms.open.iter().find(|r| !tried.contains(&r.id)) {
            return Some((room.clone(), false));
        }
        if !may_open {
            return None;
        }

        let id = rooms.next_id;
        rooms.next_id += 1;
        let room = Room::new(id, self.config.clone());
        let handle = spawn_room(room, self.pacing, self.config.tick_interval());
        rooms.open.push(handle.clone());
        Some((handle, true))
    }
}
