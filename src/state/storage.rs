use crate::types::*;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("session {0} not found")]
    SessionNotFound(SessionId),

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("session {0} already exists")]
    DuplicateSession(SessionId),

    #[error("player {player_id} has already joined session {session_id}")]
    AlreadyJoined {
        session_id: SessionId,
        player_id: PlayerId,
    },
}

/// Persistence boundary for players, sessions and seats
#[async_trait]
pub trait Storage: Send + Sync {
    async fn create_player(&self, name: &str) -> Result<Player, StorageError>;

    async fn load_player(&self, player_id: &str) -> Result<Player, StorageError>;

    /// Display names for the given players; unknown ids are skipped
    async fn player_names(&self, player_ids: &[PlayerId]) -> HashMap<PlayerId, String>;

    async fn create_session(&self, session: Session) -> Result<(), StorageError>;

    async fn load_session(&self, session_id: &str) -> Result<Session, StorageError>;

    async fn save_state(&self, session_id: &str, state: &GameState) -> Result<(), StorageError>;

    async fn set_status(&self, session_id: &str, status: SessionStatus) -> Result<(), StorageError>;

    /// Seat a player. A player's seat can be written only once.
    async fn join(&self, session_id: &str, seat: PlayerRole) -> Result<(), StorageError>;

    /// Seats in join order
    async fn load_players(&self, session_id: &str) -> Result<Vec<PlayerRole>, StorageError>;
}

#[derive(Debug)]
struct StoredSession {
    session: Session,
    seats: Vec<PlayerRole>,
}

/// Process-local storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    players: RwLock<HashMap<PlayerId, Player>>,
    sessions: RwLock<HashMap<SessionId, StoredSession>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_player(&self, name: &str) -> Result<Player, StorageError> {
        let player = Player {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
        };
        self.players
            .write()
            .await
            .insert(player.id.clone(), player.clone());
        Ok(player)
    }

    async fn load_player(&self, player_id: &str) -> Result<Player, StorageError> {
        self.players
            .read()
            .await
            .get(player_id)
            .cloned()
            .ok_or_else(|| StorageError::PlayerNotFound(player_id.to_string()))
    }

    async fn player_names(&self, player_ids: &[PlayerId]) -> HashMap<PlayerId, String> {
        let players = self.players.read().await;
        player_ids
            .iter()
            .filter_map(|id| players.get(id).map(|p| (id.clone(), p.name.clone())))
            .collect()
    }

    async fn create_session(&self, session: Session) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(StorageError::DuplicateSession(session.id));
        }
        sessions.insert(
            session.id.clone(),
            StoredSession {
                session,
                seats: Vec::new(),
            },
        );
        Ok(())
    }

    async fn load_session(&self, session_id: &str) -> Result<Session, StorageError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.session.clone())
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))
    }

    async fn save_state(&self, session_id: &str, state: &GameState) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        stored.session.state = state.clone();
        Ok(())
    }

    async fn set_status(&self, session_id: &str, status: SessionStatus) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        stored.session.status = status;
        Ok(())
    }

    async fn join(&self, session_id: &str, seat: PlayerRole) -> Result<(), StorageError> {
        let mut sessions = self.sessions.write().await;
        let stored = sessions
            .get_mut(session_id)
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))?;
        if stored.seats.iter().any(|s| s.player_id == seat.player_id) {
            return Err(StorageError::AlreadyJoined {
                session_id: session_id.to_string(),
                player_id: seat.player_id,
            });
        }
        stored.seats.push(seat);
        Ok(())
    }

    async fn load_players(&self, session_id: &str) -> Result<Vec<PlayerRole>, StorageError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map(|s| s.seats.clone())
            .ok_or_else(|| StorageError::SessionNotFound(session_id.to_string()))
    }
}
