//! Turn-based game engine
//!
//! Owns one `GameState` and applies validated moves to it. The engine is
//! synchronous and not shareable; callers serialize moves per session.

mod board;

pub use board::{board_from_words, target_counts, validate_board};

use crate::types::*;

/// Errors a move can be rejected with. The state is left untouched on error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("it is not {team}'s turn to {action}")]
    WrongTurn { team: Team, action: &'static str },

    #[error("no card found for guess {0:?}")]
    UnknownCard(String),

    #[error("{0:?} has already been guessed")]
    AlreadyRevealed(String),

    #[error("clue word cannot be empty")]
    EmptyClue,

    #[error("game is already over")]
    GameFinished,

    #[error("invalid board: {0}")]
    InvalidBoard(String),
}

/// Where the game currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    AwaitingClue(Team),
    AwaitingGuess { team: Team, guesses_remaining: i32 },
    Finished(Team),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    GiveClue { team: Team, clue: Clue },
    Guess { team: Team, word: String },
    Pass { team: Team },
}

/// What happened as a result of an accepted move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The card flipped by a guess, with its true affiliation
    pub revealed: Option<Card>,
    /// True when the guessing team stays on the board after this move
    pub can_keep_guessing: bool,
    pub winner: Option<Team>,
}

/// Result of an accepted guess, which always flips exactly one card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    /// The flipped card, with its true affiliation
    pub card: Card,
    pub can_keep_guessing: bool,
    pub winner: Option<Team>,
}

impl From<GuessOutcome> for MoveOutcome {
    fn from(outcome: GuessOutcome) -> Self {
        MoveOutcome {
            revealed: Some(outcome.card),
            can_keep_guessing: outcome.can_keep_guessing,
            winner: outcome.winner,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameEngine {
    state: GameState,
}

impl GameEngine {
    /// Start a new game on a freshly dealt board
    pub fn new(board: Board, starting_team: Team) -> Result<Self, GameError> {
        validate_board(&board, starting_team)?;

        Ok(Self {
            state: GameState {
                starting_team,
                active_team: starting_team,
                active_role: Role::Spymaster,
                board,
                guesses_remaining: 0,
            },
        })
    }

    /// Wrap an existing state (e.g. loaded from storage) to apply a single move
    pub fn for_move(state: GameState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    pub fn phase(&self) -> TurnPhase {
        if let Some(winner) = self.game_over() {
            return TurnPhase::Finished(winner);
        }
        match self.state.active_role {
            Role::Spymaster => TurnPhase::AwaitingClue(self.state.active_team),
            Role::Operative => TurnPhase::AwaitingGuess {
                team: self.state.active_team,
                guesses_remaining: self.state.guesses_remaining,
            },
        }
    }

    pub fn apply(&mut self, mv: Move) -> Result<MoveOutcome, GameError> {
        match mv {
            Move::GiveClue { team, clue } => {
                self.give_clue(team, &clue)?;
                Ok(MoveOutcome {
                    revealed: None,
                    can_keep_guessing: true,
                    winner: None,
                })
            }
            Move::Guess { team, word } => self.guess(team, &word).map(MoveOutcome::from),
            Move::Pass { team } => {
                self.pass(team)?;
                Ok(MoveOutcome {
                    revealed: None,
                    can_keep_guessing: false,
                    winner: None,
                })
            }
        }
    }

    pub fn give_clue(&mut self, team: Team, clue: &Clue) -> Result<(), GameError> {
        match self.phase() {
            TurnPhase::Finished(_) => return Err(GameError::GameFinished),
            TurnPhase::AwaitingClue(active) if active == team => {}
            _ => {
                return Err(GameError::WrongTurn {
                    team,
                    action: "give a clue",
                })
            }
        }
        if clue.word.trim().is_empty() {
            return Err(GameError::EmptyClue);
        }

        self.state.guesses_remaining = match clue.count {
            0 => UNLIMITED_GUESSES,
            n => i32::try_from(n).unwrap_or(i32::MAX),
        };
        self.state.active_role = Role::Operative;
        Ok(())
    }

    pub fn guess(&mut self, team: Team, word: &str) -> Result<GuessOutcome, GameError> {
        self.expect_guessing(team, "guess")?;

        let word = word.trim().to_lowercase();
        let idx = self
            .state
            .board
            .cards
            .iter()
            .position(|c| c.word.to_lowercase() == word)
            .ok_or_else(|| GameError::UnknownCard(word.clone()))?;
        if self.state.board.cards[idx].revealed {
            return Err(GameError::AlreadyRevealed(word));
        }

        let card = &mut self.state.board.cards[idx];
        card.revealed = true;
        card.revealed_by = Some(team);
        let card = card.clone();

        if self.state.guesses_remaining > 0 {
            self.state.guesses_remaining -= 1;
        }

        if let Some(winner) = self.game_over() {
            return Ok(GuessOutcome {
                card,
                can_keep_guessing: false,
                winner: Some(winner),
            });
        }

        let can_keep_guessing = card.affiliation == team.affiliation()
            && self.state.guesses_remaining != 0;
        if !can_keep_guessing {
            self.end_turn();
        }

        Ok(GuessOutcome {
            card,
            can_keep_guessing,
            winner: None,
        })
    }

    /// End the guessing team's turn voluntarily
    pub fn pass(&mut self, team: Team) -> Result<(), GameError> {
        self.expect_guessing(team, "pass")?;
        self.end_turn();
        Ok(())
    }

    /// Winner, if the game is over. Assassin: the team that did not just guess wins.
    pub fn game_over(&self) -> Option<Team> {
        let board = &self.state.board;
        for (affiliation, want) in target_counts(self.state.starting_team) {
            if board.revealed_count(affiliation) < want {
                continue;
            }
            match affiliation {
                Affiliation::Red => return Some(Team::Red),
                Affiliation::Blue => return Some(Team::Blue),
                Affiliation::Assassin => return Some(self.state.active_team.other()),
                Affiliation::Bystander | Affiliation::Unknown => {}
            }
        }
        None
    }

    /// Operative view of the current state
    pub fn redact(&self) -> GameState {
        self.state.redacted()
    }

    fn expect_guessing(&self, team: Team, action: &'static str) -> Result<(), GameError> {
        match self.phase() {
            TurnPhase::Finished(_) => Err(GameError::GameFinished),
            TurnPhase::AwaitingGuess { team: active, .. } if active == team => Ok(()),
            _ => Err(GameError::WrongTurn { team, action }),
        }
    }

    fn end_turn(&mut self) {
        self.state.active_team = self.state.active_team.other();
        self.state.active_role = Role::Spymaster;
        self.state.guesses_remaining = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::board::tests::red_start_board;
    use super::*;

    fn new_game() -> GameEngine {
        GameEngine::new(red_start_board(), Team::Red).unwrap()
    }

    fn clue(word: &str, count: u32) -> Clue {
        Clue {
            word: word.to_string(),
            count,
        }
    }

    #[test]
    fn test_new_game_awaits_starting_clue() {
        let game = new_game();
        assert_eq!(game.phase(), TurnPhase::AwaitingClue(Team::Red));
        assert_eq!(game.game_over(), None);
    }

    #[test]
    fn test_new_rejects_invalid_board() {
        let mut board = red_start_board();
        board.cards.truncate(10);
        assert!(matches!(
            GameEngine::new(board, Team::Red),
            Err(GameError::InvalidBoard(_))
        ));
    }

    #[test]
    fn test_give_clue_wrong_team() {
        let mut game = new_game();
        let err = game.give_clue(Team::Blue, &clue("animal", 2)).unwrap_err();
        assert!(matches!(err, GameError::WrongTurn { team: Team::Blue, .. }));
        assert_eq!(game.phase(), TurnPhase::AwaitingClue(Team::Red));
    }

    #[test]
    fn test_give_clue_twice_is_wrong_turn() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 2)).unwrap();
        let err = game.give_clue(Team::Red, &clue("animal", 2)).unwrap_err();
        assert!(matches!(err, GameError::WrongTurn { .. }));
    }

    #[test]
    fn test_clue_count_zero_is_unlimited() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 0)).unwrap();
        assert_eq!(
            game.phase(),
            TurnPhase::AwaitingGuess {
                team: Team::Red,
                guesses_remaining: UNLIMITED_GUESSES
            }
        );

        // Unlimited guesses never run out on correct guesses
        for word in ["dog", "cat", "bird", "fish"] {
            let outcome = game.guess(Team::Red, word).unwrap();
            assert!(outcome.can_keep_guessing);
        }
        assert_eq!(game.state().guesses_remaining, UNLIMITED_GUESSES);
    }

    #[test]
    fn test_two_correct_guesses_then_turn_passes() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 2)).unwrap();

        let first = game.guess(Team::Red, "dog").unwrap();
        assert!(first.can_keep_guessing);
        assert_eq!(
            game.phase(),
            TurnPhase::AwaitingGuess {
                team: Team::Red,
                guesses_remaining: 1
            }
        );

        let second = game.guess(Team::Red, "cat").unwrap();
        assert!(!second.can_keep_guessing);
        assert_eq!(second.card.affiliation, Affiliation::Red);
        assert_eq!(game.phase(), TurnPhase::AwaitingClue(Team::Blue));
        assert_eq!(game.state().guesses_remaining, 0);
    }

    #[test]
    fn test_wrong_affiliation_ends_turn() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("fruit", 3)).unwrap();

        let outcome = game.guess(Team::Red, "car").unwrap();
        assert!(!outcome.can_keep_guessing);
        assert_eq!(outcome.card.affiliation, Affiliation::Bystander);
        assert_eq!(game.phase(), TurnPhase::AwaitingClue(Team::Blue));
    }

    #[test]
    fn test_assassin_other_team_wins() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("kaboom", 1)).unwrap();

        let outcome = game.guess(Team::Red, "bomb").unwrap();
        assert_eq!(outcome.winner, Some(Team::Blue));
        assert_eq!(game.game_over(), Some(Team::Blue));
        assert_eq!(game.phase(), TurnPhase::Finished(Team::Blue));

        // No further moves
        assert_eq!(game.pass(Team::Red), Err(GameError::GameFinished));
        assert_eq!(
            game.give_clue(Team::Blue, &clue("x", 1)),
            Err(GameError::GameFinished)
        );
    }

    #[test]
    fn test_unknown_card_leaves_state_unchanged() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 2)).unwrap();
        let before = game.state().clone();

        let err = game.guess(Team::Red, "wolf").unwrap_err();
        assert_eq!(err, GameError::UnknownCard("wolf".to_string()));
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn test_already_revealed() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 3)).unwrap();
        game.guess(Team::Red, "dog").unwrap();
        let before = game.state().clone();

        let err = game.guess(Team::Red, "DOG").unwrap_err();
        assert_eq!(err, GameError::AlreadyRevealed("dog".to_string()));
        assert_eq!(game.state(), &before);
    }

    #[test]
    fn test_guess_during_clue_phase_is_wrong_turn() {
        let mut game = new_game();
        let err = game.guess(Team::Red, "dog").unwrap_err();
        assert!(matches!(err, GameError::WrongTurn { .. }));
        assert!(!game.state().board.cards[0].revealed);
    }

    #[test]
    fn test_pass_with_no_guesses_used() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 2)).unwrap();
        let board_before = game.state().board.clone();

        game.pass(Team::Red).unwrap();
        assert_eq!(game.phase(), TurnPhase::AwaitingClue(Team::Blue));
        assert_eq!(game.state().board, board_before);
    }

    #[test]
    fn test_pass_wrong_team_or_phase() {
        let mut game = new_game();
        assert!(matches!(
            game.pass(Team::Red),
            Err(GameError::WrongTurn { .. })
        ));

        game.give_clue(Team::Red, &clue("animal", 2)).unwrap();
        assert!(matches!(
            game.pass(Team::Blue),
            Err(GameError::WrongTurn { .. })
        ));
    }

    #[test]
    fn test_revealing_all_own_cards_wins() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("farm", 0)).unwrap();
        let words = ["dog", "cat", "bird", "fish", "horse", "cow", "pig", "sheep", "goat"];
        for (i, word) in words.iter().enumerate() {
            let outcome = game.guess(Team::Red, word).unwrap();
            if i < words.len() - 1 {
                assert_eq!(outcome.winner, None);
            } else {
                assert_eq!(outcome.winner, Some(Team::Red));
            }
        }
        assert_eq!(game.phase(), TurnPhase::Finished(Team::Red));
    }

    #[test]
    fn test_revealing_opponents_last_card_makes_them_win() {
        let mut game = new_game();
        // Blue reveals seven of its own cards, then red flips blue's last one
        let blue_words = ["apple", "pear", "plum", "grape", "lemon", "lime", "peach"];
        game.give_clue(Team::Red, &clue("x", 1)).unwrap();
        game.pass(Team::Red).unwrap();
        game.give_clue(Team::Blue, &clue("fruit", 0)).unwrap();
        for word in blue_words {
            game.guess(Team::Blue, word).unwrap();
        }
        game.pass(Team::Blue).unwrap();

        game.give_clue(Team::Red, &clue("tree", 1)).unwrap();
        let outcome = game.guess(Team::Red, "melon").unwrap();
        assert_eq!(outcome.winner, Some(Team::Blue));
    }

    #[test]
    fn test_revealed_is_write_once() {
        let mut game = new_game();
        let mut seen_revealed = std::collections::HashSet::new();
        let moves = vec![
            Move::GiveClue {
                team: Team::Red,
                clue: clue("animal", 2),
            },
            Move::Guess {
                team: Team::Red,
                word: "dog".to_string(),
            },
            Move::Guess {
                team: Team::Red,
                word: "dog".to_string(),
            },
            Move::Guess {
                team: Team::Red,
                word: "car".to_string(),
            },
            Move::GiveClue {
                team: Team::Blue,
                clue: clue("fruit", 1),
            },
            Move::Guess {
                team: Team::Blue,
                word: "apple".to_string(),
            },
        ];

        for mv in moves {
            let _ = game.apply(mv);
            for card in &game.state().board.cards {
                if seen_revealed.contains(&card.word) {
                    assert!(card.revealed, "{} was un-revealed", card.word);
                }
                if card.revealed {
                    assert!(card.revealed_by.is_some());
                    seen_revealed.insert(card.word.clone());
                } else {
                    assert!(card.revealed_by.is_none());
                }
            }
        }
        assert_eq!(seen_revealed.len(), 3);
    }

    #[test]
    fn test_apply_guess_reports_flipped_card() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 1)).unwrap();

        let outcome = game
            .apply(Move::Guess {
                team: Team::Red,
                word: "Dog".to_string(),
            })
            .unwrap();
        let card = outcome.revealed.unwrap();
        assert_eq!(card.word, "dog");
        assert!(card.revealed);
        assert_eq!(card.revealed_by, Some(Team::Red));
    }

    #[test]
    fn test_redact_matches_state() {
        let mut game = new_game();
        game.give_clue(Team::Red, &clue("animal", 1)).unwrap();
        game.guess(Team::Red, "dog").unwrap();

        let redacted = game.redact();
        assert_eq!(redacted.active_team, game.state().active_team);
        assert_eq!(redacted.board.cards[0].affiliation, Affiliation::Red);
        assert_eq!(redacted.board.cards[1].affiliation, Affiliation::Unknown);
    }
}
