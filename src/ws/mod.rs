use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use std::sync::Arc;

use crate::api::ApiError;
use crate::hub::{Frame, FrameSink, FrameStream, Transport, TransportError};
use crate::protocol::PlayerQuery;
use crate::state::AppState;

/// WebSocket upgrade into a session's hub. Only seated players (or the
/// creator) may subscribe.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    Query(q): Query<PlayerQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    state.view(&session_id, &q.player).await?;

    tracing::info!(session_id = %session_id, player_id = %q.player, "WebSocket connection request");

    let max_message_bytes = state.hub.config().max_message_bytes;
    Ok(ws
        .max_message_size(max_message_bytes)
        .on_upgrade(move |socket| async move {
            if let Err(e) = state
                .hub
                .register(WsTransport(socket), &session_id, &q.player)
                .await
            {
                tracing::error!(session_id = %session_id, "Failed to register connection: {}", e);
            }
        })
        .into_response())
}

/// `Transport` over an axum WebSocket
pub struct WsTransport(pub WebSocket);

pub struct WsSink(SplitSink<WebSocket, Message>);

pub struct WsStream(SplitStream<WebSocket>);

impl Transport for WsTransport {
    type Sink = WsSink;
    type Stream = WsStream;

    fn split(self) -> (WsSink, WsStream) {
        let (sender, receiver) = self.0.split();
        (WsSink(sender), WsStream(receiver))
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let msg = match frame {
            Frame::Text(text) => Message::Text(text.to_string().into()),
            Frame::Binary(data) => Message::Binary(data.into()),
            Frame::Ping => Message::Ping(Default::default()),
            Frame::Pong => Message::Pong(Default::default()),
            Frame::Close => Message::Close(None),
        };
        self.0
            .send(msg)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.0.close().await;
    }
}

#[async_trait]
impl FrameStream for WsStream {
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>> {
        let msg = match self.0.next().await? {
            Ok(msg) => msg,
            Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
        };
        let frame = match msg {
            Message::Text(text) => Frame::Text(text.as_str().into()),
            Message::Binary(data) => Frame::Binary(data.to_vec()),
            Message::Ping(_) => Frame::Ping,
            Message::Pong(_) => Frame::Pong,
            Message::Close(_) => Frame::Close,
        };
        Some(Ok(frame))
    }
}
