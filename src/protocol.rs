use crate::types::*;
use serde::{Deserialize, Serialize};

/// Events pushed to every connection in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    GameStart {
        game: Session,
        players: Vec<PlayerInfo>,
    },
    ClueGiven {
        clue: Clue,
        team: Team,
        game: Session,
    },
    #[serde(rename_all = "camelCase")]
    PlayerVote {
        player_id: PlayerId,
        guess: String,
        confirmed: bool,
    },
    #[serde(rename_all = "camelCase")]
    GuessGiven {
        guess: String,
        team: Team,
        can_keep_guessing: bool,
        card: Card,
        game: Session,
    },
    /// The guessing team ended its turn without using every guess
    TurnPassed {
        team: Team,
        game: Session,
    },
    #[serde(rename_all = "camelCase")]
    GameEnd { winning_team: Team },
}

impl GameEvent {
    /// The session snapshot carried by this event, if any
    pub fn game(&self) -> Option<&Session> {
        match self {
            GameEvent::GameStart { game, .. }
            | GameEvent::ClueGiven { game, .. }
            | GameEvent::GuessGiven { game, .. }
            | GameEvent::TurnPassed { game, .. } => Some(game),
            GameEvent::PlayerVote { .. } | GameEvent::GameEnd { .. } => None,
        }
    }

    /// Copy of this event with the board hidden from operatives
    pub fn redacted(&self) -> GameEvent {
        let mut event = self.clone();
        match &mut event {
            GameEvent::GameStart { game, .. }
            | GameEvent::ClueGiven { game, .. }
            | GameEvent::GuessGiven { game, .. }
            | GameEvent::TurnPassed { game, .. } => game.state = game.state.redacted(),
            GameEvent::PlayerVote { .. } | GameEvent::GameEnd { .. } => {}
        }
        event
    }
}

/// Player seat as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_id: PlayerId,
    pub name: String,
    pub team: Option<Team>,
    pub role: Option<Role>,
}

// HTTP request bodies

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlayerRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub player_id: PlayerId,
    pub cards: Vec<Card>,
    #[serde(default)]
    pub starting_team: Option<Team>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub player_id: PlayerId,
    pub team: Team,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClueRequest {
    pub player_id: PlayerId,
    pub word: String,
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub player_id: PlayerId,
    pub guess: String,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerQuery {
    pub player: PlayerId,
}

// HTTP response bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session: Session,
    pub players: Vec<PlayerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResponse {
    /// True once a strict majority ratified the guess
    pub reached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub can_keep_guessing: Option<bool>,
}
