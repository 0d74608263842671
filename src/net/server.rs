//! TCP server
//!
//! One task per connection reads JSON lines, a writer task owns the socket's
//! write half, and once joined a forwarder task copies the room's broadcast
//! feed into the writer. A lagging reader skips ahead rather than slowing the
//! room down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::protocol::{ClientMessage, ServerMessage, decode_client, encode_line};
use crate::config::ServerConfig;
use crate::error::{ProtocolError, Result};
use crate::room::lobby::Lobby;
use crate::room::runner::{Joined, RoomHandle};
use crate::room::{JoinRequest, JoinTicket};

/// Lines queued for one client before the writer falls behind
const OUTBOUND_BUFFER: usize = 64;
/// Consecutive accept failures tolerated before giving up
const MAX_ACCEPT_ERRORS: u32 = 10;

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    lobby: Arc<Lobby>,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.bind_addr()).await?;
        let lobby = Lobby::new(config.room.clone(), config.pacing);
        Ok(Self {
            listener,
            config: Arc::new(config),
            lobby: Arc::new(lobby),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the listener fails repeatedly
    pub async fn run(self) -> Result<()> {
        log::info!(
            "Listening on {} ({} players per room, {} pacing)",
            self.local_addr()?,
            self.config.room.room_capacity,
            self.config.pacing.as_str()
        );

        let mut error_count = 0;
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    error_count = 0;
                    log::info!("Client connected from {peer}");
                    let config = self.config.clone();
                    let lobby = self.lobby.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, config, lobby).await {
                            log::error!("Connection error ({peer}): {e}");
                        }
                    });
                }
                Err(e) => {
                    log::error!("Failed to accept connection: {e}");
                    error_count += 1;
                    if error_count > MAX_ACCEPT_ERRORS {
                        log::error!("Too many consecutive IO errors, shutting down");
                        return Err(e.into());
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }
}

/// What a connection holds once it is in a room
struct Membership {
    ticket: JoinTicket,
    room: RoomHandle,
    forwarder: JoinHandle<()>,
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: Arc<ServerConfig>,
    lobby: Arc<Lobby>,
) -> Result<()> {
    stream.set_nodelay(true)?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    let (out, mut outbound) = mpsc::channel::<Arc<str>>(OUTBOUND_BUFFER);
    let writer_task = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            if let Err(e) = writer.write_all(line.as_bytes()).await {
                log::debug!("Write to {peer} failed: {e}");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let timeout = config.client_timeout();
    let mut membership: Option<Membership> = None;

    loop {
        let next = tokio::select! {
            next = tokio::time::timeout(timeout, lines.next_line()) => next,
            _ = room_closed(&mut membership) => {
                log::debug!("Room closed, ending session with {peer}");
                break;
            }
        };

        let line = match next {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                log::info!("Client {peer} disconnected");
                break;
            }
            Ok(Err(e)) => {
                log::warn!("Read from {peer} failed: {e}");
                break;
            }
            Err(_) => {
                log::info!("Client {peer} timed out");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message = match decode_client(&line) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("{peer}: {e}");
                continue;
            }
        };

        match message {
            ClientMessage::Join {
                nickname,
                player_id,
                mode,
            } => {
                if let Some(m) = &membership {
                    log::warn!("{peer}: {}", ProtocolError::AlreadyJoined(m.ticket.room_id));
                    continue;
                }
                let request = JoinRequest {
                    player_id,
                    nickname,
                    mode,
                };
                match lobby.join(request).await {
                    Ok((joined, room)) => {
                        let Joined { ticket, updates } = joined;
                        if !send(&out, &ticket.welcome()).await {
                            room.disconnect(ticket.player_id).await;
                            break;
                        }
                        log::debug!(
                            "{peer} is in room {} ({} rooms open)",
                            ticket.room_id,
                            lobby.room_count()
                        );
                        let forwarder = tokio::spawn(forward_updates(updates, out.clone(), peer));
                        membership = Some(Membership {
                            ticket,
                            room,
                            forwarder,
                        });
                    }
                    Err(e) => {
                        let rejected = ServerMessage::Rejected {
                            reason: e.to_string(),
                        };
                        if !send(&out, &rejected).await {
                            break;
                        }
                    }
                }
            }
            message @ ClientMessage::Intent { .. } => {
                let slot = membership.as_ref().map(|m| m.ticket.slot.as_ref());
                match (slot, message.as_intent()) {
                    (Some(Some(slot)), Some(intent)) => slot.submit(intent),
                    (Some(None), _) => log::warn!("{peer}: {}", ProtocolError::ObserverIntent),
                    _ => log::warn!("{peer}: {}", ProtocolError::NoTrain),
                }
            }
            ClientMessage::Ping => {
                if !send(&out, &ServerMessage::Pong).await {
                    break;
                }
            }
            ClientMessage::Leave => {
                log::info!("Client {peer} left");
                break;
            }
        }
    }

    if let Some(m) = membership {
        m.forwarder.abort();
        m.room.disconnect(m.ticket.player_id.clone()).await;
    }
    drop(out);
    let _ = writer_task.await;
    Ok(())
}

/// Resolves once the joined room stops publishing; never without a room
async fn room_closed(membership: &mut Option<Membership>) {
    match membership {
        Some(m) => {
            let _ = (&mut m.forwarder).await;
        }
        None => std::future::pending().await,
    }
}

async fn forward_updates(
    mut updates: broadcast::Receiver<Arc<str>>,
    out: mpsc::Sender<Arc<str>>,
    peer: SocketAddr,
) {
    loop {
        match updates.recv().await {
            Ok(line) => {
                if out.send(line).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::debug!("{peer} lagging, skipped {skipped} updates");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send(out: &mpsc::Sender<Arc<str>>, message: &ServerMessage) -> bool {
    match encode_line(message) {
        Ok(line) => out.send(Arc::from(line)).await.is_ok(),
        Err(e) => {
            log::error!("Failed to encode message: {e}");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Pacing, RoomConfig};
    use std::time::Duration;
    use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

    async fn start(room: RoomConfig) -> SocketAddr {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            pacing: Pacing::AsFastAsPossible,
            room,
            ..Default::default()
        };
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.run());
        addr
    }

    async fn connect(addr: SocketAddr) -> (tokio::io::Lines<BufReader<OwnedReadHalf>>, OwnedWriteHalf) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        (BufReader::new(reader).lines(), writer)
    }

    async fn next_message(lines: &mut tokio::io::Lines<BufReader<OwnedReadHalf>>) -> Option<ServerMessage> {
        let line = tokio::time::timeout(Duration::from_secs(5), lines.next_line())
            .await
            .unwrap()
            .unwrap()?;
        Some(serde_json::from_str(&line).unwrap())
    }

    #[tokio::test]
    async fn test_full_session_over_tcp() {
        let addr = start(RoomConfig {
            room_capacity: 1,
            seed: Some(11),
            game_duration_ticks: 120,
            ..Default::default()
        })
        .await;
        let (mut lines, mut writer) = connect(addr).await;

        writer.write_all(b"this is not json\n").await.unwrap();
        writer.write_all(b"{\"type\":\"ping\"}\n").await.unwrap();
        assert_eq!(next_message(&mut lines).await, Some(ServerMessage::Pong));

        writer
            .write_all(b"{\"type\":\"join\",\"nickname\":\"ann\",\"player_id\":\"p1\",\"mode\":\"agent\"}\n")
            .await
            .unwrap();
        let Some(ServerMessage::Welcome { train_id, observer, .. }) = next_message(&mut lines).await else {
            panic!("expected welcome");
        };
        let train_id = train_id.unwrap();
        assert!(!observer);

        writer
            .write_all(b"{\"type\":\"intent\",\"steer\":\"left\"}\n")
            .await
            .unwrap();

        let mut ticks = Vec::new();
        let mut game_over = false;
        while let Some(message) = next_message(&mut lines).await {
            match message {
                ServerMessage::Snapshot(snapshot) => {
                    let train = snapshot.train(train_id).unwrap();
                    assert_eq!(train.nickname, "ann");
                    ticks.push(snapshot.tick);
                }
                ServerMessage::GameOver { .. } => game_over = true,
                _ => {}
            }
        }

        // Connection closes after the final scores
        assert!(game_over);
        assert!(!ticks.is_empty());
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_rejected_join_can_retry() {
        let addr = start(RoomConfig {
            room_capacity: 2,
            ..Default::default()
        })
        .await;
        let (mut lines, mut writer) = connect(addr).await;

        writer
            .write_all(b"{\"type\":\"join\",\"nickname\":\"Bot Fred\",\"player_id\":\"p1\"}\n")
            .await
            .unwrap();
        assert!(matches!(
            next_message(&mut lines).await,
            Some(ServerMessage::Rejected { .. })
        ));

        writer
            .write_all(b"{\"type\":\"join\",\"nickname\":\"fred\",\"player_id\":\"p1\"}\n")
            .await
            .unwrap();
        assert!(matches!(
            next_message(&mut lines).await,
            Some(ServerMessage::Welcome { observer: false, .. })
        ));
        assert!(matches!(
            next_message(&mut lines).await,
            Some(ServerMessage::WaitingRoom { capacity: 2, .. })
        ));
    }
}
