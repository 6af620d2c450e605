//! WebSocket connection handles
//!
//! Each accepted socket is represented inside the session by a
//! `ConnectionHandle`: an unbounded queue drained by that socket's writer
//! task. Enqueueing never waits on the socket, so a slow peer cannot hold up
//! a broadcast to everyone else.

use serde::Serialize;
use tokio::sync::mpsc;

use super::messages::ServerMessage;

/// Identifier of one live connection, allocated by the coordinator on accept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle for sending messages to a specific WebSocket connection
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Channel for sending messages to this connection
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self { sender }
    }

    /// Queue a message for this connection
    ///
    /// Fails once the writer task has gone away, which is how a dead socket
    /// is noticed during a broadcast.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .map_err(|_| SendError::ConnectionClosed)
    }
}

/// Error type for send operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    ConnectionClosed,
}
