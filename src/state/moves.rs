use super::{seat_team, AppState, SessionError};
use crate::broadcast::broadcast_event;
use crate::game::{GameEngine, GameError, TurnPhase};
use crate::protocol::{GameEvent, GuessResponse};
use crate::types::*;

/// Operatives of `team`, the voters a guess needs a majority of
fn eligible_voters(seats: &[PlayerRole], team: Team) -> usize {
    seats.iter().filter(|s| s.is(team, Role::Operative)).count()
}

impl AppState {
    /// Give a clue as the active team's spymaster
    pub async fn give_clue(
        &self,
        session_id: &str,
        player_id: &str,
        clue: Clue,
    ) -> Result<Session, SessionError> {
        let _guard = self.lock_session(session_id).await?;

        let (mut session, seats, seat) = self.load_seated(session_id, player_id).await?;
        if session.status != SessionStatus::Playing {
            return Err(SessionError::NotPlaying);
        }
        let team = seat_team(&seat, Role::Spymaster, "give a clue")?;

        let mut engine = GameEngine::for_move(session.state);
        engine.give_clue(team, &clue)?;
        session.state = engine.into_state();
        self.storage.save_state(session_id, &session.state).await?;

        tracing::info!(session_id, %team, clue = %clue.word, count = clue.count, "Clue given");
        let event = GameEvent::ClueGiven {
            clue,
            team,
            game: session.clone(),
        };
        broadcast_event(&self.hub, session_id, &seats, &event).await;

        Ok(session)
    }

    /// Record an operative's vote. Tentative votes are only announced;
    /// confirmed votes count toward consensus, and once a strict majority of
    /// the team's operatives agree the guess is made.
    pub async fn submit_vote(
        &self,
        session_id: &str,
        player_id: &str,
        guess: &str,
        confirmed: bool,
    ) -> Result<GuessResponse, SessionError> {
        let guess = guess.trim();
        if guess.is_empty() {
            return Err(SessionError::EmptyGuess);
        }

        let _guard = self.lock_session(session_id).await?;

        let (mut session, seats, seat) = self.load_seated(session_id, player_id).await?;
        if session.status != SessionStatus::Playing {
            return Err(SessionError::NotPlaying);
        }
        let team = seat_team(&seat, Role::Operative, "guess")?;

        let mut engine = GameEngine::for_move(session.state);
        match engine.phase() {
            TurnPhase::AwaitingGuess { team: active, .. } if active == team => {}
            TurnPhase::Finished(_) => return Err(GameError::GameFinished.into()),
            _ => {
                return Err(GameError::WrongTurn {
                    team,
                    action: "guess",
                }
                .into())
            }
        }

        let vote = GameEvent::PlayerVote {
            player_id: player_id.to_string(),
            guess: guess.to_string(),
            confirmed,
        };
        broadcast_event(&self.hub, session_id, &seats, &vote).await;

        let not_yet = GuessResponse {
            reached: false,
            card: None,
            can_keep_guessing: None,
        };
        if !confirmed {
            return Ok(not_yet);
        }

        let voters = eligible_voters(&seats, team);
        let Some(word) = self
            .consensus
            .record_vote(session_id, player_id, guess, voters)
        else {
            return Ok(not_yet);
        };

        let outcome = match engine.guess(team, &word) {
            Ok(outcome) => outcome,
            Err(e) => {
                // Let the team vote again on something valid
                self.consensus.clear(session_id);
                tracing::warn!(session_id, %team, guess = %word, "Agreed guess rejected: {}", e);
                return Err(e.into());
            }
        };
        self.consensus.clear(session_id);

        session.state = engine.into_state();
        self.storage.save_state(session_id, &session.state).await?;
        if outcome.winner.is_some() {
            self.storage
                .set_status(session_id, SessionStatus::Finished)
                .await?;
            session.status = SessionStatus::Finished;
            self.release_session_lock(session_id);
        }

        let card = outcome.card;
        tracing::info!(
            session_id,
            %team,
            guess = %word,
            affiliation = ?card.affiliation,
            can_keep_guessing = outcome.can_keep_guessing,
            "Guess made"
        );

        let event = GameEvent::GuessGiven {
            guess: word,
            team,
            can_keep_guessing: outcome.can_keep_guessing,
            card: card.clone(),
            game: session.clone(),
        };
        broadcast_event(&self.hub, session_id, &seats, &event).await;

        if let Some(winning_team) = outcome.winner {
            tracing::info!(session_id, %winning_team, "Game over");
            broadcast_event(&self.hub, session_id, &seats, &GameEvent::GameEnd { winning_team })
                .await;
        }

        Ok(GuessResponse {
            reached: true,
            card: Some(card),
            can_keep_guessing: Some(outcome.can_keep_guessing),
        })
    }

    /// End the active team's guessing early
    pub async fn pass(&self, session_id: &str, player_id: &str) -> Result<Session, SessionError> {
        let _guard = self.lock_session(session_id).await?;

        let (mut session, seats, seat) = self.load_seated(session_id, player_id).await?;
        if session.status != SessionStatus::Playing {
            return Err(SessionError::NotPlaying);
        }
        let team = seat_team(&seat, Role::Operative, "pass")?;

        let mut engine = GameEngine::for_move(session.state);
        engine.pass(team)?;
        self.consensus.clear(session_id);
        session.state = engine.into_state();
        self.storage.save_state(session_id, &session.state).await?;

        tracing::info!(session_id, %team, "Turn passed");
        let event = GameEvent::TurnPassed {
            team,
            game: session.clone(),
        };
        broadcast_event(&self.hub, session_id, &seats, &event).await;

        Ok(session)
    }
}
