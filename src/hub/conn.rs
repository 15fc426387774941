//! Per-connection pumps
//!
//! Each registered connection gets a writer task that drains its outbound
//! buffer onto the transport (and pings the peer), and a reader task that
//! exists only to notice when the peer goes away. Whichever finishes first
//! takes the other down with it.

use super::transport::{Frame, FrameSink, FrameStream, Transport, TransportError};
use super::SessionHub;
use crate::config::HubConfig;
use crate::types::{ConnectionId, PlayerId, SessionId};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

/// Hub-side handle for a live connection
#[derive(Debug)]
pub(super) struct Connection {
    pub id: ConnectionId,
    pub session_id: SessionId,
    pub player_id: PlayerId,
    pub send: mpsc::Sender<Arc<str>>,
}

/// What the pumps need to report back to the hub
#[derive(Clone)]
pub(super) struct PumpContext {
    pub id: ConnectionId,
    pub session_id: SessionId,
    pub hub: SessionHub,
    pub config: Arc<HubConfig>,
}

pub(super) fn spawn_pumps<T: Transport>(
    transport: T,
    outbound: mpsc::Receiver<Arc<str>>,
    ctx: PumpContext,
) {
    let (sink, stream) = transport.split();
    // Dropped when the writer exits, which stops the reader
    let (writer_alive, writer_gone) = oneshot::channel::<()>();

    tokio::spawn(write_pump(sink, outbound, writer_alive, ctx.clone()));
    tokio::spawn(read_pump(stream, writer_gone, ctx));
}

async fn write_frame<S: FrameSink>(
    sink: &mut S,
    frame: Frame,
    wait: Duration,
) -> Result<(), TransportError> {
    match tokio::time::timeout(wait, sink.send(frame)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Io(format!("write timed out after {:?}", wait))),
    }
}

async fn write_pump<S: FrameSink>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Arc<str>>,
    _writer_alive: oneshot::Sender<()>,
    ctx: PumpContext,
) {
    let period = ctx.config.ping_period;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(payload) => {
                    if let Err(e) = write_frame(&mut sink, Frame::Text(payload), ctx.config.write_wait).await {
                        tracing::warn!(connection_id = %ctx.id, "Failed to write message: {}", e);
                        ctx.hub.unregister(&ctx.session_id, &ctx.id).await;
                        break;
                    }
                }
                None => {
                    // Hub dropped us
                    let _ = write_frame(&mut sink, Frame::Close, ctx.config.write_wait).await;
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = write_frame(&mut sink, Frame::Ping, ctx.config.write_wait).await {
                    tracing::warn!(connection_id = %ctx.id, "Failed to write ping: {}", e);
                    ctx.hub.unregister(&ctx.session_id, &ctx.id).await;
                    break;
                }
            }
        }
    }

    sink.close().await;
    tracing::debug!(connection_id = %ctx.id, "Writer stopped");
}

async fn read_pump<R: FrameStream>(
    mut stream: R,
    mut writer_gone: oneshot::Receiver<()>,
    ctx: PumpContext,
) {
    let mut deadline = Instant::now() + ctx.config.pong_wait;

    loop {
        tokio::select! {
            _ = &mut writer_gone => break,
            next = tokio::time::timeout_at(deadline, stream.receive()) => match next {
                Err(_) => {
                    tracing::info!(connection_id = %ctx.id, "No pong within {:?}, dropping connection", ctx.config.pong_wait);
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::info!(connection_id = %ctx.id, "Failed to read from connection: {}", e);
                    break;
                }
                Ok(Some(Ok(frame))) => {
                    if frame.len() > ctx.config.max_message_bytes {
                        tracing::warn!(
                            connection_id = %ctx.id,
                            "Inbound frame of {} bytes exceeds limit of {}",
                            frame.len(),
                            ctx.config.max_message_bytes
                        );
                        break;
                    }
                    match frame {
                        Frame::Pong => deadline = Instant::now() + ctx.config.pong_wait,
                        Frame::Close => break,
                        // Game events are push-only; inbound data is ignored
                        Frame::Text(_) | Frame::Binary(_) | Frame::Ping => {}
                    }
                }
            }
        }
    }

    ctx.hub.unregister(&ctx.session_id, &ctx.id).await;
    tracing::debug!(connection_id = %ctx.id, "Reader stopped");
}
