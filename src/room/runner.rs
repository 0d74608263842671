//! Tick scheduler
//!
//! One task per room owns the `Room` outright. Joins and leaves arrive over a
//! command channel drained at the top of every tick; each tick's messages are
//! encoded once and published on a broadcast channel without awaiting any
//! reader.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use super::{JoinRequest, JoinTicket, Phase, Room, RoomId};
use crate::config::Pacing;
use crate::error::AdmissionError;
use crate::net::protocol::encode_line;

/// Pending joins and leaves per room
const COMMAND_BUFFER: usize = 256;
/// Encoded lines a slow reader may fall behind before skipping ahead
const UPDATE_BUFFER: usize = 256;

/// Requests from connection tasks to the room task
pub enum RoomCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<Joined, AdmissionError>>,
    },
    Disconnect {
        player_id: String,
    },
}

/// A successful join together with the room's update feed
pub struct Joined {
    pub ticket: JoinTicket,
    /// Encoded, newline-terminated server messages
    pub updates: broadcast::Receiver<Arc<str>>,
}

/// Cheap handle to a running room task
#[derive(Clone)]
pub struct RoomHandle {
    pub id: RoomId,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub async fn join(&self, request: JoinRequest) -> Result<Joined, AdmissionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::Join { request, reply })
            .await
            .map_err(|_| AdmissionError::RoomClosed)?;
        response.await.map_err(|_| AdmissionError::RoomClosed)?
    }

    pub async fn disconnect(&self, player_id: String) {
        if self
            .commands
            .send(RoomCommand::Disconnect { player_id })
            .await
            .is_err()
        {
            log::debug!("Room {} already closed", self.id);
        }
    }

    /// True once the room task has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Start the tick task for a room
pub fn spawn_room(room: Room, pacing: Pacing, tick_interval: Duration) -> RoomHandle {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
    let handle = RoomHandle {
        id: room.id,
        commands: commands_tx,
    };
    tokio::spawn(run_room(room, pacing, tick_interval, commands_rx));
    handle
}

async fn run_room(
    mut room: Room,
    pacing: Pacing,
    tick_interval: Duration,
    mut commands: mpsc::Receiver<RoomCommand>,
) {
    let (updates, _) = broadcast::channel::<Arc<str>>(UPDATE_BUFFER);
    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!(
        "Room {} tick loop started ({}, {:?} per tick)",
        room.id,
        pacing.as_str(),
        tick_interval
    );

    loop {
        // The waiting room always runs on the clock so joiners get a chance
        if pacing == Pacing::Realtime || room.phase() == Phase::Waiting {
            ticker.tick().await;
        } else {
            tokio::task::yield_now().await;
        }
        let tick_start = Instant::now();

        loop {
            match commands.try_recv() {
                Ok(command) => apply_command(&mut room, command, &updates),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        for message in room.step() {
            match encode_line(&message) {
                // No subscribers is fine
                Ok(line) => {
                    let _ = updates.send(Arc::from(line));
                }
                Err(e) => log::error!("Room {}: failed to encode message: {e}", room.id),
            }
        }

        let elapsed = tick_start.elapsed();
        if pacing == Pacing::Realtime && elapsed > tick_interval {
            log::warn!(
                "Room {}: slow tick {:.2}ms (budget {:.2}ms)",
                room.id,
                elapsed.as_secs_f64() * 1000.0,
                tick_interval.as_secs_f64() * 1000.0
            );
        }

        if room.is_finished() {
            break;
        }
    }

    log::info!(
        "Room {} closed at tick {} ({} trains)",
        room.id,
        room.state().time_ticks,
        room.player_count()
    );
}

fn apply_command(room: &mut Room, command: RoomCommand, updates: &broadcast::Sender<Arc<str>>) {
    match command {
        RoomCommand::Join { request, reply } => {
            let result = room.join(request).map(|ticket| Joined {
                ticket,
                updates: updates.subscribe(),
            });
            if let Err(e) = &result {
                log::info!("Room {} rejected join: {e}", room.id);
            }
            if reply.send(result).is_err() {
                log::debug!("Room {}: joiner went away before the reply", room.id);
            }
        }
        RoomCommand::Disconnect { player_id } => room.disconnect(&player_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::net::protocol::ServerMessage;
    use crate::room::JoinMode;

    fn request(player_id: &str, nickname: &str) -> JoinRequest {
        JoinRequest {
            player_id: player_id.into(),
            nickname: nickname.into(),
            mode: JoinMode::Agent,
        }
    }

    #[tokio::test]
    async fn test_room_task_runs_to_game_over() {
        let config = RoomConfig {
            room_capacity: 2,
            seed: Some(3),
            game_duration_ticks: 30,
            ..Default::default()
        };
        let handle = spawn_room(
            Room::new(7, config),
            Pacing::AsFastAsPossible,
            Duration::from_millis(5),
        );

        let mut ann = handle.join(request("p1", "ann")).await.unwrap();
        assert_eq!(ann.ticket.room_id, 7);
        let _bob = handle.join(request("p2", "bob")).await.unwrap();

        let mut ticks = Vec::new();
        let finished = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let Ok(line) = ann.updates.recv().await else {
                    return false;
                };
                match serde_json::from_str::<ServerMessage>(&line).unwrap() {
                    ServerMessage::Snapshot(s) => ticks.push(s.tick),
                    ServerMessage::GameOver { .. } => return true,
                    _ => {}
                }
            }
        })
        .await
        .unwrap();

        assert!(finished);
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ticks.last(), Some(&30));

        // The task exits once the match is over
        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(
            handle.join(request("p3", "cat")).await.err(),
            Some(AdmissionError::RoomClosed)
        );
    }

    #[tokio::test]
    async fn test_join_rejection_is_reported() {
        let handle = spawn_room(
            Room::new(1, RoomConfig::default()),
            Pacing::Realtime,
            Duration::from_millis(5),
        );
        handle.join(request("p1", "ann")).await.unwrap();
        let err = handle.join(request("p2", "ann")).await.err();
        assert_eq!(err, Some(AdmissionError::DuplicateName("ann".into())));
    }
}
