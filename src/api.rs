//! HTTP API over `AppState`.
//!
//! Every move goes through the same lock-apply-save-broadcast path the
//! orchestrator uses; handlers only translate bodies and errors.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::game::GameError;
use crate::protocol::*;
use crate::state::{AppState, SessionError, StorageError};
use crate::types::*;
use crate::ws;

/// Routes under `/api`, including the WebSocket upgrade
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/player", post(create_player))
        .route("/api/session", post(create_session))
        .route("/api/session/{id}", get(get_session))
        .route("/api/session/{id}/join", post(join_session))
        .route("/api/session/{id}/start", post(start_session))
        .route("/api/session/{id}/clue", post(give_clue))
        .route("/api/session/{id}/guess", post(submit_guess))
        .route("/api/session/{id}/pass", post(pass_turn))
        .route("/api/session/{id}/ws", get(ws::ws_handler))
}

/// POST /api/player
pub async fn create_player(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePlayerRequest>,
) -> Result<(StatusCode, Json<Player>), ApiError> {
    let player = state.create_player(&req.name).await?;
    Ok((StatusCode::CREATED, Json(player)))
}

/// POST /api/session
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state
        .create_session(&req.player_id, req.cards, req.starting_team)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/session/{id}?player=
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(q): Query<PlayerQuery>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(state.view(&id, &q.player).await?))
}

/// POST /api/session/{id}/join
pub async fn join_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<JoinRequest>,
) -> Result<Json<PlayerRole>, ApiError> {
    let seat = state.join(&id, &req.player_id, req.team, req.role).await?;
    Ok(Json(seat))
}

/// POST /api/session/{id}/start
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.start(&id, &req.player_id).await?;
    Ok(Json(state.view(&id, &req.player_id).await?))
}

/// POST /api/session/{id}/clue
pub async fn give_clue(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ClueRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let clue = Clue {
        word: req.word,
        count: req.count,
    };
    state.give_clue(&id, &req.player_id, clue).await?;
    Ok(Json(state.view(&id, &req.player_id).await?))
}

/// POST /api/session/{id}/guess
pub async fn submit_guess(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<GuessRequest>,
) -> Result<Json<GuessResponse>, ApiError> {
    let res = state
        .submit_vote(&id, &req.player_id, &req.guess, req.confirmed)
        .await?;
    Ok(Json(res))
}

/// POST /api/session/{id}/pass
pub async fn pass_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<SessionView>, ApiError> {
    state.pass(&id, &req.player_id).await?;
    Ok(Json(state.view(&id, &req.player_id).await?))
}

/// Error returned by API handlers, rendered as `{"error": {"code", "message"}}`
#[derive(Debug)]
pub struct ApiError(pub SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            SessionError::Game(err) => match err {
                GameError::WrongTurn { .. } => (StatusCode::CONFLICT, "WRONG_TURN"),
                GameError::UnknownCard(_) => (StatusCode::BAD_REQUEST, "UNKNOWN_CARD"),
                GameError::AlreadyRevealed(_) => (StatusCode::CONFLICT, "ALREADY_REVEALED"),
                GameError::EmptyClue => (StatusCode::BAD_REQUEST, "EMPTY_CLUE"),
                GameError::GameFinished => (StatusCode::CONFLICT, "GAME_FINISHED"),
                GameError::InvalidBoard(_) => (StatusCode::BAD_REQUEST, "INVALID_BOARD"),
            },
            SessionError::Storage(err) => match err {
                StorageError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND"),
                StorageError::PlayerNotFound(_) => (StatusCode::NOT_FOUND, "PLAYER_NOT_FOUND"),
                StorageError::AlreadyJoined { .. } => (StatusCode::CONFLICT, "ALREADY_JOINED"),
                StorageError::DuplicateSession(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
            SessionError::NotPlaying => (StatusCode::CONFLICT, "NOT_PLAYING"),
            SessionError::NotPending => (StatusCode::CONFLICT, "NOT_PENDING"),
            SessionError::RolesNotFilled => (StatusCode::CONFLICT, "ROLES_NOT_FILLED"),
            SessionError::NotCreator => (StatusCode::FORBIDDEN, "NOT_CREATOR"),
            SessionError::NotInSession => (StatusCode::FORBIDDEN, "NOT_IN_SESSION"),
            SessionError::WrongRole { .. } => (StatusCode::FORBIDDEN, "WRONG_ROLE"),
            SessionError::SpymasterTaken(_) => (StatusCode::CONFLICT, "SPYMASTER_TAKEN"),
            SessionError::TeamFull(_) => (StatusCode::CONFLICT, "TEAM_FULL"),
            SessionError::EmptyName => (StatusCode::BAD_REQUEST, "EMPTY_NAME"),
            SessionError::EmptyGuess => (StatusCode::BAD_REQUEST, "EMPTY_GUESS"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!(code, "Request rejected: {}", self.0);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code,
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn error_to_json(err: SessionError) -> (StatusCode, serde_json::Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_session_not_found_returns_404() {
        let (status, json) =
            error_to_json(StorageError::SessionNotFound("abc".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "SESSION_NOT_FOUND");
        assert_eq!(json["error"]["message"], "session abc not found");
    }

    #[tokio::test]
    async fn test_wrong_turn_returns_409() {
        let (status, json) = error_to_json(
            GameError::WrongTurn {
                team: Team::Blue,
                action: "guess",
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "WRONG_TURN");
    }

    #[tokio::test]
    async fn test_unknown_card_returns_400() {
        let (status, json) = error_to_json(GameError::UnknownCard("zebra".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "UNKNOWN_CARD");
    }

    #[tokio::test]
    async fn test_not_creator_returns_403() {
        let (status, json) = error_to_json(SessionError::NotCreator).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"]["code"], "NOT_CREATOR");
    }
}
