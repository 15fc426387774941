//! Majority voting for team guesses
//!
//! Several operatives on a team vote on a word; a guess is only submitted
//! once a strict majority of the eligible voters agree.

use crate::types::{PlayerId, SessionId};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub player_id: PlayerId,
    pub word: String,
}

/// Votes needed for a strict majority (> 50%) of `total_voters`.
///
/// total 2 -> 2, 3 -> 2, 4 -> 3, 5 -> 3, 6 -> 4
pub fn majority_threshold(total_voters: usize) -> usize {
    total_voters / 2 + 1
}

/// Per-session vote ledgers, one live vote per voter
#[derive(Debug, Default)]
pub struct ConsensusTracker {
    ledgers: Mutex<HashMap<SessionId, Vec<Vote>>>,
}

impl ConsensusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) a voter's choice and check for a strict majority.
    ///
    /// Returns the winning word once any word holds at least
    /// `total_voters / 2 + 1` votes. Words are compared trimmed and lowercased.
    pub fn record_vote(
        &self,
        session_id: &str,
        player_id: &str,
        word: &str,
        total_voters: usize,
    ) -> Option<String> {
        let word = normalize(word);
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let votes = ledgers.entry(session_id.to_string()).or_default();

        match votes.iter_mut().find(|v| v.player_id == player_id) {
            Some(existing) => existing.word = word,
            None => votes.push(Vote {
                player_id: player_id.to_string(),
                word,
            }),
        }

        let winner = reached_consensus(votes, total_voters);
        tracing::debug!(
            session_id,
            player_id,
            votes = votes.len(),
            total_voters,
            reached = winner.is_some(),
            "Vote recorded"
        );
        winner
    }

    /// Current vote count per word for a session
    pub fn tally(&self, session_id: &str) -> HashMap<String, usize> {
        let ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        ledgers
            .get(session_id)
            .map(|votes| count_words(votes).into_iter().collect())
            .unwrap_or_default()
    }

    /// Drop every vote for a session. Call once after a ratified guess is committed.
    pub fn clear(&self, session_id: &str) {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        if ledgers.remove(session_id).is_some() {
            tracing::debug!(session_id, "Cleared vote ledger");
        }
    }
}

fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Counts in first-vote order so ties resolve deterministically
fn count_words(votes: &[Vote]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(w, _)| *w == vote.word) {
            Some((_, n)) => *n += 1,
            None => counts.push((vote.word.clone(), 1)),
        }
    }
    counts
}

fn reached_consensus(votes: &[Vote], total_voters: usize) -> Option<String> {
    let majority = majority_threshold(total_voters);
    count_words(votes)
        .into_iter()
        .find(|(_, n)| *n >= majority)
        .map(|(word, _)| word)
}
