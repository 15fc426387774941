mod moves;
mod session;
pub mod storage;

pub use session::all_roles_filled;
pub use storage::{MemoryStorage, Storage, StorageError};

use crate::config::AppConfig;
use crate::consensus::ConsensusTracker;
use crate::game::GameError;
use crate::hub::SessionHub;
use crate::types::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("session is not in progress")]
    NotPlaying,

    #[error("session has already started")]
    NotPending,

    #[error("each team needs one spymaster and at least one operative")]
    RolesNotFilled,

    #[error("only the session creator can start the game")]
    NotCreator,

    #[error("player has not joined this session")]
    NotInSession,

    #[error("only a {required:?} can {action}")]
    WrongRole {
        required: Role,
        action: &'static str,
    },

    #[error("team {0} already has a spymaster")]
    SpymasterTaken(Team),

    #[error("team {0} has no open operative seats")]
    TeamFull(Team),

    #[error("player name cannot be empty")]
    EmptyName,

    #[error("guess cannot be empty")]
    EmptyGuess,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub hub: SessionHub,
    pub consensus: Arc<ConsensusTracker>,
    pub config: Arc<AppConfig>,
    /// Serializes load-apply-save-broadcast per session
    session_locks: Arc<Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AppState {
    /// In-memory state. Must be called from within a tokio runtime.
    pub fn new(config: AppConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(config: AppConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            hub: SessionHub::new(config.hub.clone()),
            consensus: Arc::new(ConsensusTracker::new()),
            config: Arc::new(config),
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Per-session write lock. Unknown sessions fail before any lock entry is
    /// created, and finished sessions get a throwaway lock since they never
    /// change again.
    async fn lock_session(&self, session_id: &str) -> Result<OwnedMutexGuard<()>, SessionError> {
        let session = self.storage.load_session(session_id).await?;
        if session.status == SessionStatus::Finished {
            return Ok(Arc::new(tokio::sync::Mutex::new(())).lock_owned().await);
        }
        let lock = {
            let mut locks = self
                .session_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks.entry(session_id.to_string()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }

    /// Forget a session's lock once it can no longer change
    fn release_session_lock(&self, session_id: &str) {
        self.session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
    }

    #[cfg(test)]
    fn session_lock_count(&self) -> usize {
        self.session_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Session plus the caller's seat, failing if the caller never joined
    async fn load_seated(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<(Session, Vec<PlayerRole>, PlayerRole), SessionError> {
        let session = self.storage.load_session(session_id).await?;
        let seats = self.storage.load_players(session_id).await?;
        let seat = seats
            .iter()
            .find(|s| s.player_id == player_id)
            .cloned()
            .ok_or(SessionError::NotInSession)?;
        Ok((session, seats, seat))
    }
}

/// Team and role of a seat, if the caller holds `required`
fn seat_team(seat: &PlayerRole, required: Role, action: &'static str) -> Result<Team, SessionError> {
    match (seat.team, seat.role) {
        (Some(team), Some(role)) if role == required => Ok(team),
        (Some(_), Some(_)) => Err(SessionError::WrongRole { required, action }),
        _ => Err(SessionError::NotInSession),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::game::board_from_words;

    pub const WORDS: [&str; BOARD_SIZE] = [
        "dog", "cat", "bird", "fish", "horse", "cow", "pig", "sheep", "goat", // starting team
        "apple", "pear", "plum", "grape", "lemon", "lime", "peach", "melon", // other team
        "car", "bus", "train", "boat", "plane", "bike", "truck", // bystanders
        "bomb", // assassin
    ];

    pub fn cards() -> Vec<Card> {
        board_from_words(&WORDS, Team::Red).cards
    }

    /// Ids of a seated, started game: red spymaster, two red operatives,
    /// blue spymaster, one blue operative
    pub struct Table {
        pub session_id: SessionId,
        pub red_spy: PlayerId,
        pub red_ops: Vec<PlayerId>,
        pub blue_spy: PlayerId,
        pub blue_op: PlayerId,
    }

    pub async fn seated_game(state: &AppState, red_operatives: usize) -> Table {
        let red_spy = state.create_player("Rita").await.unwrap().id;
        let blue_spy = state.create_player("Bob").await.unwrap().id;
        let blue_op = state.create_player("Bea").await.unwrap().id;
        let mut red_ops = Vec::new();
        for i in 0..red_operatives {
            red_ops.push(state.create_player(&format!("Red{}", i)).await.unwrap().id);
        }

        let session = state
            .create_session(&red_spy, cards(), Some(Team::Red))
            .await
            .unwrap();
        let sid = session.id.clone();

        state.join(&sid, &red_spy, Team::Red, Role::Spymaster).await.unwrap();
        state.join(&sid, &blue_spy, Team::Blue, Role::Spymaster).await.unwrap();
        state.join(&sid, &blue_op, Team::Blue, Role::Operative).await.unwrap();
        for op in &red_ops {
            state.join(&sid, op, Team::Red, Role::Operative).await.unwrap();
        }
        state.start(&sid, &red_spy).await.unwrap();

        Table {
            session_id: sid,
            red_spy,
            red_ops,
            blue_spy,
            blue_op,
        }
    }

    #[tokio::test]
    async fn test_session_locks_are_per_session() {
        let state = AppState::new(AppConfig::default());
        let creator = state.create_player("Rita").await.unwrap().id;
        let a = state.create_session(&creator, cards(), None).await.unwrap().id;
        let b = state.create_session(&creator, cards(), None).await.unwrap().id;

        let _a = state.lock_session(&a).await.unwrap();
        // A different session is not blocked
        let other = tokio::time::timeout(std::time::Duration::from_millis(100), state.lock_session(&b)).await;
        assert!(matches!(other, Ok(Ok(_))));

        let again = tokio::time::timeout(std::time::Duration::from_millis(50), state.lock_session(&a)).await;
        assert!(again.is_err());
        assert_eq!(state.session_lock_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_session_adds_no_lock() {
        let state = AppState::new(AppConfig::default());
        let player = state.create_player("Rita").await.unwrap().id;

        let clue = Clue {
            word: "pets".to_string(),
            count: 2,
        };
        let err = state.give_clue("nope", &player, clue).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Storage(StorageError::SessionNotFound(_))
        ));
        let err = state.join("nope", &player, Team::Red, Role::Operative).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Storage(StorageError::SessionNotFound(_))
        ));
        assert_eq!(state.session_lock_count(), 0);
    }

    #[tokio::test]
    async fn test_finished_session_releases_lock() {
        let state = AppState::new(AppConfig::default());
        let t = seated_game(&state, 1).await;
        assert_eq!(state.session_lock_count(), 1);

        let clue = Clue {
            word: "boom".to_string(),
            count: 1,
        };
        state.give_clue(&t.session_id, &t.red_spy, clue).await.unwrap();
        let resp = state
            .submit_vote(&t.session_id, &t.red_ops[0], "bomb", true)
            .await
            .unwrap();
        assert!(resp.reached);
        assert_eq!(state.session_lock_count(), 0);

        // Later moves on the finished game are rejected without a new entry
        let err = state.pass(&t.session_id, &t.red_ops[0]).await.unwrap_err();
        assert!(matches!(err, SessionError::NotPlaying));
        assert_eq!(state.session_lock_count(), 0);
    }

    #[test]
    fn test_seat_team_checks_role() {
        let seat = PlayerRole {
            player_id: "p".to_string(),
            team: Some(Team::Blue),
            role: Some(Role::Operative),
            role_assigned: true,
        };
        assert_eq!(seat_team(&seat, Role::Operative, "guess").unwrap(), Team::Blue);
        assert!(matches!(
            seat_team(&seat, Role::Spymaster, "give a clue"),
            Err(SessionError::WrongRole {
                required: Role::Spymaster,
                ..
            })
        ));
        let seatless = PlayerRole {
            team: None,
            role: None,
            ..seat
        };
        assert!(matches!(
            seat_team(&seatless, Role::Operative, "guess"),
            Err(SessionError::NotInSession)
        ));
    }
}
