use crate::hub::{HubError, SessionHub};
use crate::protocol::GameEvent;
use crate::types::*;
use std::sync::Arc;

/// Deliver an event to everyone in a session.
///
/// Events that carry a game snapshot go out per player: spymasters get the
/// full board, everyone else gets the redacted one. Delivery failures are
/// logged and never fail the move that produced the event.
pub async fn broadcast_event(
    hub: &SessionHub,
    session_id: &str,
    seats: &[PlayerRole],
    event: &GameEvent,
) {
    let result = match event.game() {
        Some(_) => send_by_role(hub, session_id, seats, event).await,
        None => hub.broadcast(session_id, event).await,
    };

    if let Err(e) = result {
        tracing::warn!(session_id, "Failed to broadcast event: {}", e);
    }
}

async fn send_by_role(
    hub: &SessionHub,
    session_id: &str,
    seats: &[PlayerRole],
    event: &GameEvent,
) -> Result<(), HubError> {
    let full: Arc<str> = serde_json::to_string(event)?.into();
    let redacted: Arc<str> = serde_json::to_string(&event.redacted())?.into();

    for seat in seats {
        let payload = match seat.role {
            Some(Role::Spymaster) => full.clone(),
            _ => redacted.clone(),
        };
        hub.send_raw_to_player(session_id, &seat.player_id, payload)
            .await?;
    }
    Ok(())
}
