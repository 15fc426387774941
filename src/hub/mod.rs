//! Per-session broadcast hub
//!
//! A single task owns the registry of live connections. Everything else talks
//! to it through `SessionHub`, a cheap cloneable handle that sends commands
//! over a channel, so registry mutation never needs a lock.
//!
//! Slow consumers are dropped: if a connection's outbound buffer is full when
//! a message is enqueued, the connection is unregistered instead of blocking
//! delivery to everyone else.

mod conn;
pub mod transport;

use crate::config::HubConfig;
use crate::types::{ConnectionId, PlayerId, SessionId};
use conn::{Connection, PumpContext};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

pub use transport::{
    ChannelPeer, ChannelTransport, Frame, FrameSink, FrameStream, Transport, TransportError,
};

/// Commands queued ahead of the hub loop before callers start waiting
const COMMAND_BUFFER: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("hub is no longer running")]
    Closed,
}

enum Command {
    Register(Connection),
    Unregister {
        session_id: SessionId,
        id: ConnectionId,
    },
    Broadcast {
        session_id: SessionId,
        payload: Arc<str>,
    },
    SendToPlayer {
        session_id: SessionId,
        player_id: PlayerId,
        payload: Arc<str>,
    },
    ConnectionCount {
        session_id: SessionId,
        reply: oneshot::Sender<usize>,
    },
    SessionCount {
        reply: oneshot::Sender<usize>,
    },
}

/// Handle to the hub loop
#[derive(Clone)]
pub struct SessionHub {
    commands: mpsc::Sender<Command>,
    config: Arc<HubConfig>,
}

impl SessionHub {
    /// Create a hub and start its control loop on the current tokio runtime
    pub fn new(config: HubConfig) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(run(rx));
        Self {
            commands: tx,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Attach a connection to a session and start its reader and writer pumps
    pub async fn register<T: Transport>(
        &self,
        transport: T,
        session_id: &str,
        player_id: &str,
    ) -> Result<ConnectionId, HubError> {
        let id = format!("{}-{}", session_id, ulid::Ulid::new());
        let (tx, rx) = mpsc::channel(self.config.send_buffer);

        self.send(Command::Register(Connection {
            id: id.clone(),
            session_id: session_id.to_string(),
            player_id: player_id.to_string(),
            send: tx,
        }))
        .await?;

        conn::spawn_pumps(
            transport,
            rx,
            PumpContext {
                id: id.clone(),
                session_id: session_id.to_string(),
                hub: self.clone(),
                config: self.config.clone(),
            },
        );

        tracing::info!(session_id, player_id, connection_id = %id, "Connection registered");
        Ok(id)
    }

    /// Detach a connection. Unknown or already-removed ids are ignored.
    pub async fn unregister(&self, session_id: &str, id: &str) {
        // Only fails if the hub loop is gone, in which case there is nothing to remove
        let _ = self
            .send(Command::Unregister {
                session_id: session_id.to_string(),
                id: id.to_string(),
            })
            .await;
    }

    /// Serialize `event` as JSON and deliver it to every connection in the session
    pub async fn broadcast<E: Serialize>(&self, session_id: &str, event: &E) -> Result<(), HubError> {
        let payload: Arc<str> = serde_json::to_string(event)?.into();
        self.broadcast_raw(session_id, payload).await
    }

    pub async fn broadcast_raw(&self, session_id: &str, payload: Arc<str>) -> Result<(), HubError> {
        self.send(Command::Broadcast {
            session_id: session_id.to_string(),
            payload,
        })
        .await
    }

    /// Deliver `event` only to the given player's connections. A player with
    /// no live connections is not an error.
    pub async fn send_to_player<E: Serialize>(
        &self,
        session_id: &str,
        player_id: &str,
        event: &E,
    ) -> Result<(), HubError> {
        let payload: Arc<str> = serde_json::to_string(event)?.into();
        self.send_raw_to_player(session_id, player_id, payload).await
    }

    pub async fn send_raw_to_player(
        &self,
        session_id: &str,
        player_id: &str,
        payload: Arc<str>,
    ) -> Result<(), HubError> {
        self.send(Command::SendToPlayer {
            session_id: session_id.to_string(),
            player_id: player_id.to_string(),
            payload,
        })
        .await
    }

    /// Live connections in a session
    pub async fn connection_count(&self, session_id: &str) -> usize {
        let (reply, rx) = oneshot::channel();
        let cmd = Command::ConnectionCount {
            session_id: session_id.to_string(),
            reply,
        };
        if self.send(cmd).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    /// Sessions with at least one live connection
    pub async fn session_count(&self) -> usize {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::SessionCount { reply }).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    async fn send(&self, cmd: Command) -> Result<(), HubError> {
        self.commands.send(cmd).await.map_err(|_| HubError::Closed)
    }
}

async fn run(mut commands: mpsc::Receiver<Command>) {
    let mut registry = Registry::default();

    while let Some(cmd) = commands.recv().await {
        match cmd {
            Command::Register(conn) => registry.register(conn),
            Command::Unregister { session_id, id } => registry.unregister(&session_id, &id),
            Command::Broadcast {
                session_id,
                payload,
            } => registry.deliver(&session_id, None, payload),
            Command::SendToPlayer {
                session_id,
                player_id,
                payload,
            } => registry.deliver(&session_id, Some(&player_id), payload),
            Command::ConnectionCount { session_id, reply } => {
                let _ = reply.send(registry.connection_count(&session_id));
            }
            Command::SessionCount { reply } => {
                let _ = reply.send(registry.connections.len());
            }
        }
    }

    tracing::debug!("Hub loop stopped");
}

/// Connection registry, owned exclusively by the hub loop
#[derive(Debug, Default)]
struct Registry {
    connections: HashMap<SessionId, Vec<Connection>>,
}

impl Registry {
    fn register(&mut self, conn: Connection) {
        self.connections
            .entry(conn.session_id.clone())
            .or_default()
            .push(conn);
    }

    /// Dropping the `Connection` closes its outbound channel, which tells the
    /// writer to send a close frame and stop.
    fn unregister(&mut self, session_id: &str, id: &str) {
        let Some(conns) = self.connections.get_mut(session_id) else {
            return;
        };
        if let Some(pos) = conns.iter().position(|c| c.id == id) {
            let conn = conns.remove(pos);
            tracing::info!(
                session_id,
                player_id = %conn.player_id,
                connection_id = %conn.id,
                "Connection unregistered"
            );
        }
        if conns.is_empty() {
            self.connections.remove(session_id);
        }
    }

    /// Enqueue `payload` on every matching connection, dropping the ones that
    /// cannot take it right now
    fn deliver(&mut self, session_id: &str, player_id: Option<&str>, payload: Arc<str>) {
        let Some(conns) = self.connections.get_mut(session_id) else {
            return;
        };

        conns.retain(|conn| {
            if player_id.is_some_and(|p| p != conn.player_id) {
                return true;
            }
            match conn.send.try_send(payload.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        session_id,
                        connection_id = %conn.id,
                        "Outbound buffer full, dropping slow connection"
                    );
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(session_id, connection_id = %conn.id, "Dropping closed connection");
                    false
                }
            }
        });

        if conns.is_empty() {
            self.connections.remove(session_id);
        }
    }

    fn connection_count(&self, session_id: &str) -> usize {
        self.connections.get(session_id).map_or(0, Vec::len)
    }
}
