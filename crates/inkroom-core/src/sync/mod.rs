//! Real-time channel to the relay server.
//!
//! Sessions exchange full canvas snapshots with the relay. The protocol is a
//! JSON object per WebSocket text frame, tagged by `type`:
//!
//! | direction | type | payload |
//! |---|---|---|
//! | out | `joinCanvas` | `canvasId` |
//! | out | `drawingUpdate` | `canvasId`, `elements` |
//! | out | `leaveCanvas` | `canvasId` |
//! | in | `loadCanvas` | `elements` |
//! | in | `receiveDrawingUpdate` | `elements` |
//! | in | `unauthorized` | `message` |
//!
//! Elements travel as raw JSON values so one malformed element cannot
//! poison a whole snapshot.

mod local;
mod native;

pub use local::{LocalChannel, LocalRelay};
pub use native::{NativeWebSocket, ReconnectPolicy};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Messages sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to a canvas room.
    JoinCanvas { canvas_id: String },
    /// Full snapshot of the sender's canvas.
    DrawingUpdate {
        canvas_id: String,
        elements: Vec<Value>,
    },
    /// Unsubscribe from a canvas room.
    LeaveCanvas { canvas_id: String },
}

/// Messages received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Stored snapshot, sent after a join.
    LoadCanvas { elements: Vec<Value> },
    /// Snapshot relayed from another member of the room.
    ReceiveDrawingUpdate { elements: Vec<Value> },
    /// The caller may not edit this canvas.
    Unauthorized { message: String },
    /// Protocol-level error reported by the server.
    Error { message: String },
}

/// Errors from a real-time channel.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

/// Events from a channel, drained by `Channel::poll_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Connected,
    Disconnected,
    /// The connection dropped; retry number `attempt` is scheduled.
    Reconnecting { attempt: u32 },
    Message(ServerMessage),
    Error { message: String },
}

impl ConnectionState {
    /// The state a channel is in after observing `event`.
    pub fn after(self, event: &SyncEvent) -> Self {
        match event {
            SyncEvent::Connected => ConnectionState::Connected,
            SyncEvent::Disconnected => ConnectionState::Disconnected,
            SyncEvent::Reconnecting { .. } => ConnectionState::Reconnecting,
            SyncEvent::Error { .. } => ConnectionState::Error,
            SyncEvent::Message(_) => self,
        }
    }
}

/// A bidirectional, non-blocking message channel to the relay.
pub trait Channel {
    /// Queue a message for the server.
    fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError>;

    /// Take every event received since the last poll.
    fn poll_events(&mut self) -> Vec<SyncEvent>;

    fn state(&self) -> ConnectionState;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// Parse one text frame from the server.
pub fn parse_server_frame(text: &str) -> Option<ServerMessage> {
    match serde_json::from_str(text) {
        Ok(message) => Some(message),
        Err(e) => {
            log::warn!("Failed to parse server message: {}", e);
            None
        }
    }
}
