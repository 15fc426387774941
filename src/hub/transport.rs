//! Wire-agnostic duplex connection used by the hub
//!
//! The hub only needs to push frames, watch for liveness, and close. A
//! transport is split into a sink and a stream so the writer and reader
//! pumps can run independently.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(Arc<str>),
    Binary(Vec<u8>),
    Ping,
    Pong,
    Close,
}

impl Frame {
    /// Payload size counted against the inbound frame limit
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(data) => data.len(),
            Frame::Ping | Frame::Pong | Frame::Close => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("transport failure: {0}")]
    Io(String),
}

#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    async fn close(&mut self);
}

#[async_trait]
pub trait FrameStream: Send + 'static {
    /// Next inbound frame, or `None` once the peer is gone
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>>;
}

pub trait Transport: Send + 'static {
    type Sink: FrameSink;
    type Stream: FrameStream;

    fn split(self) -> (Self::Sink, Self::Stream);
}

/// In-process transport backed by channels. The server side goes to the hub,
/// the `ChannelPeer` plays the remote client.
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

/// Client end of a `ChannelTransport`
pub struct ChannelPeer {
    /// Frames the server wrote
    pub received: mpsc::UnboundedReceiver<Frame>,
    /// Frames to deliver to the server's reader
    pub sender: mpsc::UnboundedSender<Frame>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                outbound: out_tx,
                inbound: in_rx,
            },
            ChannelPeer {
                received: out_rx,
                sender: in_tx,
            },
        )
    }
}

impl ChannelPeer {
    /// Next text frame from the server, skipping pings
    pub async fn next_text(&mut self) -> Option<String> {
        while let Some(frame) = self.received.recv().await {
            match frame {
                Frame::Text(text) => return Some(text.to_string()),
                Frame::Close => return None,
                _ => continue,
            }
        }
        None
    }

    pub fn pong(&self) -> bool {
        self.sender.send(Frame::Pong).is_ok()
    }
}

pub struct ChannelSink(Option<mpsc::UnboundedSender<Frame>>);

pub struct ChannelStream(mpsc::UnboundedReceiver<Frame>);

impl Transport for ChannelTransport {
    type Sink = ChannelSink;
    type Stream = ChannelStream;

    fn split(self) -> (ChannelSink, ChannelStream) {
        (ChannelSink(Some(self.outbound)), ChannelStream(self.inbound))
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        match &self.0 {
            Some(tx) => tx.send(frame).map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&mut self) {
        self.0 = None;
    }
}

#[async_trait]
impl FrameStream for ChannelStream {
    async fn receive(&mut self) -> Option<Result<Frame, TransportError>> {
        self.0.recv().await.map(Ok)
    }
}
