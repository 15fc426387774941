use super::GameError;
use crate::types::*;
use std::collections::{HashMap, HashSet};

/// How many cards of each affiliation a board dealt for `starting_team` holds.
/// The starting team gets the extra card.
pub fn target_counts(starting_team: Team) -> [(Affiliation, usize); 4] {
    [
        (starting_team.affiliation(), 9),
        (starting_team.other().affiliation(), 8),
        (Affiliation::Bystander, 7),
        (Affiliation::Assassin, 1),
    ]
}

/// Check that a freshly dealt board is playable
pub fn validate_board(board: &Board, starting_team: Team) -> Result<(), GameError> {
    if board.cards.len() != BOARD_SIZE {
        return Err(GameError::InvalidBoard(format!(
            "board must contain {} cards, found {}",
            BOARD_SIZE,
            board.cards.len()
        )));
    }

    let mut got: HashMap<Affiliation, usize> = HashMap::new();
    let mut seen = HashSet::new();
    for card in &board.cards {
        if card.revealed || card.revealed_by.is_some() {
            return Err(GameError::InvalidBoard(format!(
                "card {:?} is already revealed",
                card.word
            )));
        }
        if card.word.trim().is_empty() {
            return Err(GameError::InvalidBoard("card word cannot be empty".to_string()));
        }
        if !seen.insert(card.word.to_lowercase()) {
            return Err(GameError::InvalidBoard(format!(
                "duplicate word {:?}",
                card.word
            )));
        }
        *got.entry(card.affiliation).or_insert(0) += 1;
    }

    if let Some(n) = got.get(&Affiliation::Unknown) {
        return Err(GameError::InvalidBoard(format!(
            "{} cards have no affiliation",
            n
        )));
    }

    for (affiliation, want) in target_counts(starting_team) {
        let have = got.get(&affiliation).copied().unwrap_or(0);
        if have != want {
            return Err(GameError::InvalidBoard(format!(
                "got {} cards of type {:?}, want {}",
                have, affiliation, want
            )));
        }
    }

    Ok(())
}

impl Board {
    /// Copy of the board with the affiliation of every unrevealed card hidden
    pub fn redacted(&self) -> Board {
        Board {
            cards: self
                .cards
                .iter()
                .map(|card| {
                    let mut card = card.clone();
                    if !card.revealed {
                        card.affiliation = Affiliation::Unknown;
                    }
                    card
                })
                .collect(),
        }
    }

    /// Case-insensitive lookup
    pub fn find(&self, word: &str) -> Option<&Card> {
        let word = word.trim().to_lowercase();
        self.cards.iter().find(|c| c.word.to_lowercase() == word)
    }

    pub fn revealed_count(&self, affiliation: Affiliation) -> usize {
        self.cards
            .iter()
            .filter(|c| c.revealed && c.affiliation == affiliation)
            .count()
    }
}

impl GameState {
    /// Operative view of the state
    pub fn redacted(&self) -> GameState {
        GameState {
            board: self.board.redacted(),
            ..self.clone()
        }
    }
}

/// Deal a board from 25 words in order: the first 9 go to the starting team,
/// the next 8 to the other team, then 7 bystanders and the assassin.
/// Handy for tests and fixtures; real layouts come from the caller.
pub fn board_from_words(words: &[&str], starting_team: Team) -> Board {
    let mut affiliations = Vec::with_capacity(BOARD_SIZE);
    for (affiliation, n) in target_counts(starting_team) {
        affiliations.extend(std::iter::repeat(affiliation).take(n));
    }

    Board {
        cards: words
            .iter()
            .zip(affiliations)
            .map(|(word, affiliation)| Card::new(*word, affiliation))
            .collect(),
    }
}
