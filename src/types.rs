use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SessionId = String;
pub type PlayerId = String;
pub type ConnectionId = String;

/// Number of cards on a board (5x5 grid)
pub const BOARD_SIZE: usize = 25;

/// Sentinel for `guesses_remaining` after a clue with count 0
pub const UNLIMITED_GUESSES: i32 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn other(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// The card affiliation that belongs to this team
    pub fn affiliation(self) -> Affiliation {
        match self {
            Team::Red => Affiliation::Red,
            Team::Blue => Affiliation::Blue,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Red => write!(f, "red"),
            Team::Blue => write!(f, "blue"),
        }
    }
}

/// Who a card belongs to. `Unknown` only ever appears on redacted boards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Affiliation {
    Red,
    Blue,
    Bystander,
    Assassin,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Sees the full board and gives clues
    Spymaster,
    /// Sees only revealed cards and votes on guesses
    Operative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub word: String,
    pub affiliation: Affiliation,
    #[serde(default)]
    pub revealed: bool,
    /// Only set once `revealed` is true
    #[serde(default)]
    pub revealed_by: Option<Team>,
}

impl Card {
    pub fn new(word: impl Into<String>, affiliation: Affiliation) -> Self {
        Self {
            word: word.into(),
            affiliation,
            revealed: false,
            revealed_by: None,
        }
    }
}

/// Ordered cards; index 0 is top-left, index 24 bottom-right.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Clue {
    pub word: String,
    /// 0 means unlimited guesses
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub starting_team: Team,
    pub active_team: Team,
    pub active_role: Role,
    pub board: Board,
    /// -1 means unlimited
    pub guesses_remaining: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Playing,
    Finished,
}

/// A running (or pending, or archived) game session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub created_by: PlayerId,
    pub status: SessionStatus,
    pub state: GameState,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// A player's seat in a session. Team and role are fixed when the seat is
/// taken, so `role_assigned` is always true for a stored seat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRole {
    pub player_id: PlayerId,
    pub team: Option<Team>,
    pub role: Option<Role>,
    pub role_assigned: bool,
}

impl PlayerRole {
    pub fn is(&self, team: Team, role: Role) -> bool {
        self.team == Some(team) && self.role == Some(role)
    }
}
