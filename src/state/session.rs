use super::{AppState, SessionError, StorageError};
use crate::broadcast::broadcast_event;
use crate::game::GameEngine;
use crate::protocol::{GameEvent, PlayerInfo, SessionView};
use crate::types::*;
use rand::Rng;

/// Attempts at a fresh petname before falling back to a ULID
const SESSION_ID_ATTEMPTS: usize = 3;

fn generate_session_id() -> String {
    petname::petname(3, "-").unwrap_or_else(|| ulid::Ulid::new().to_string().to_lowercase())
}

/// Every team has exactly one spymaster and at least one operative
pub fn all_roles_filled(seats: &[PlayerRole]) -> bool {
    [Team::Red, Team::Blue].into_iter().all(|team| {
        let spymasters = seats.iter().filter(|s| s.is(team, Role::Spymaster)).count();
        let operatives = seats.iter().filter(|s| s.is(team, Role::Operative)).count();
        spymasters == 1 && operatives >= 1
    })
}

impl AppState {
    pub async fn create_player(&self, name: &str) -> Result<Player, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        let player = self.storage.create_player(name).await?;
        tracing::info!(player_id = %player.id, name = %player.name, "Player created");
        Ok(player)
    }

    /// Open a pending session on a validated board
    pub async fn create_session(
        &self,
        creator: &str,
        cards: Vec<Card>,
        starting_team: Option<Team>,
    ) -> Result<Session, SessionError> {
        self.storage.load_player(creator).await?;

        let starting_team = starting_team.unwrap_or_else(|| {
            if rand::rng().random_bool(0.5) {
                Team::Red
            } else {
                Team::Blue
            }
        });
        let engine = GameEngine::new(Board { cards }, starting_team)?;
        let state = engine.into_state();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let id = if attempt > SESSION_ID_ATTEMPTS {
                ulid::Ulid::new().to_string().to_lowercase()
            } else {
                generate_session_id()
            };
            let session = Session {
                id,
                created_by: creator.to_string(),
                status: SessionStatus::Pending,
                state: state.clone(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };

            match self.storage.create_session(session.clone()).await {
                Ok(()) => {
                    tracing::info!(session_id = %session.id, creator, %starting_team, "Session created");
                    return Ok(session);
                }
                Err(StorageError::DuplicateSession(id)) if attempt <= SESSION_ID_ATTEMPTS => {
                    tracing::debug!(session_id = %id, "Session id collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Take a seat in a pending session. Seats are permanent once taken.
    pub async fn join(
        &self,
        session_id: &str,
        player_id: &str,
        team: Team,
        role: Role,
    ) -> Result<PlayerRole, SessionError> {
        let _guard = self.lock_session(session_id).await?;

        let session = self.storage.load_session(session_id).await?;
        if session.status != SessionStatus::Pending {
            return Err(SessionError::NotPending);
        }
        self.storage.load_player(player_id).await?;

        let seats = self.storage.load_players(session_id).await?;
        match role {
            Role::Spymaster if seats.iter().any(|s| s.is(team, Role::Spymaster)) => {
                return Err(SessionError::SpymasterTaken(team));
            }
            Role::Operative
                if seats.iter().filter(|s| s.is(team, Role::Operative)).count()
                    >= self.config.max_operatives_per_team =>
            {
                return Err(SessionError::TeamFull(team));
            }
            _ => {}
        }

        let seat = PlayerRole {
            player_id: player_id.to_string(),
            team: Some(team),
            role: Some(role),
            role_assigned: true,
        };
        self.storage.join(session_id, seat.clone()).await?;

        tracing::info!(session_id, player_id, %team, ?role, "Player joined");
        Ok(seat)
    }

    /// Move a fully seated session from pending to playing
    pub async fn start(&self, session_id: &str, player_id: &str) -> Result<Session, SessionError> {
        let _guard = self.lock_session(session_id).await?;

        let mut session = self.storage.load_session(session_id).await?;
        if session.created_by != player_id {
            return Err(SessionError::NotCreator);
        }
        if session.status != SessionStatus::Pending {
            return Err(SessionError::NotPending);
        }

        let seats = self.storage.load_players(session_id).await?;
        if !all_roles_filled(&seats) {
            return Err(SessionError::RolesNotFilled);
        }

        self.storage
            .set_status(session_id, SessionStatus::Playing)
            .await?;
        session.status = SessionStatus::Playing;
        tracing::info!(session_id, players = seats.len(), "Game started");

        let players = self.player_infos(&seats).await;
        let event = GameEvent::GameStart {
            game: session.clone(),
            players,
        };
        broadcast_event(&self.hub, session_id, &seats, &event).await;

        Ok(session)
    }

    /// Session as seen by `player_id`: the board is redacted unless they are a spymaster
    pub async fn view(&self, session_id: &str, player_id: &str) -> Result<SessionView, SessionError> {
        let mut session = self.storage.load_session(session_id).await?;
        let seats = self.storage.load_players(session_id).await?;

        let seat = seats.iter().find(|s| s.player_id == player_id);
        if seat.is_none() && session.created_by != player_id {
            return Err(SessionError::NotInSession);
        }
        let is_spymaster = seat.is_some_and(|s| s.role == Some(Role::Spymaster));
        if !is_spymaster {
            session.state = session.state.redacted();
        }

        Ok(SessionView {
            session,
            players: self.player_infos(&seats).await,
        })
    }

    pub(super) async fn player_infos(&self, seats: &[PlayerRole]) -> Vec<PlayerInfo> {
        let ids: Vec<PlayerId> = seats.iter().map(|s| s.player_id.clone()).collect();
        let names = self.storage.player_names(&ids).await;
        seats
            .iter()
            .map(|s| PlayerInfo {
                player_id: s.player_id.clone(),
                name: names.get(&s.player_id).cloned().unwrap_or_default(),
                team: s.team,
                role: s.role,
            })
            .collect()
    }
}
