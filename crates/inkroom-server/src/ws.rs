//! WebSocket relay.
//!
//! Each connection joins at most one canvas room. Snapshots sent by a member
//! are stored and relayed to every other member; the sender gets no echo.

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::{AppState, RoomMessage, SharedState};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use inkroom_core::sync::{ClientMessage, ServerMessage};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-socket relay state.
pub struct Connection {
    pub peer_id: String,
    pub email: String,
    room: Option<String>,
    rx: Option<broadcast::Receiver<RoomMessage>>,
}

impl Connection {
    pub fn new(email: String) -> Self {
        Self {
            peer_id: Uuid::new_v4().to_string(),
            email,
            room: None,
            rx: None,
        }
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    /// Apply one client message. Returns the reply for this peer, if any.
    pub fn apply(&mut self, state: &AppState, message: ClientMessage) -> Option<ServerMessage> {
        match message {
            ClientMessage::JoinCanvas { canvas_id } => {
                self.leave(state);
                match state.load(&canvas_id, &self.email) {
                    Ok(elements) => {
                        self.rx = Some(state.join_room(&canvas_id, &self.peer_id));
                        info!("Peer {} ({}) joined canvas {}", self.peer_id, self.email, canvas_id);
                        self.room = Some(canvas_id);
                        Some(ServerMessage::LoadCanvas { elements })
                    }
                    Err(e) => Some(rejection(e)),
                }
            }
            ClientMessage::DrawingUpdate {
                canvas_id,
                elements,
            } => match state.store_snapshot(&canvas_id, &self.email, elements.clone()) {
                Ok(()) => {
                    debug!(
                        "Peer {} updated canvas {} ({} elements)",
                        self.peer_id,
                        canvas_id,
                        elements.len()
                    );
                    state.broadcast(
                        &canvas_id,
                        &self.peer_id,
                        ServerMessage::ReceiveDrawingUpdate { elements },
                    );
                    None
                }
                Err(e) => Some(rejection(e)),
            },
            ClientMessage::LeaveCanvas { canvas_id } => {
                if self.room.as_deref() == Some(canvas_id.as_str()) {
                    self.leave(state);
                }
                None
            }
        }
    }

    pub fn leave(&mut self, state: &AppState) {
        if let Some(room) = self.room.take() {
            state.leave_room(&room, &self.peer_id);
            info!("Peer {} left canvas {}", self.peer_id, room);
        }
        self.rx = None;
    }

    /// Next message relayed from another member of the room.
    async fn next_relayed(&mut self) -> Option<ServerMessage> {
        loop {
            let Some(rx) = self.rx.as_mut() else {
                return std::future::pending().await;
            };
            match rx.recv().await {
                Ok((from, message)) if from != self.peer_id => return Some(message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Peer {} lagged, {} messages skipped", self.peer_id, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.rx = None;
                }
            }
        }
    }
}

fn rejection(error: ApiError) -> ServerMessage {
    match error {
        ApiError::Forbidden(message) => ServerMessage::Unauthorized { message },
        other => ServerMessage::Error {
            message: other.to_string(),
        },
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    AuthUser(email): AuthUser,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, email))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: SharedState, email: String) {
    let mut connection = Connection::new(email);
    info!("New connection: {} ({})", connection.peer_id, connection.email);

    let (mut sender, mut receiver) = socket.split();

    loop {
        let outgoing = tokio::select! {
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(message) => connection.apply(&state, message),
                        Err(e) => {
                            warn!("Invalid message from {}: {}", connection.peer_id, e);
                            Some(ServerMessage::Error {
                                message: format!("Invalid message: {}", e),
                            })
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => None, // Ignore binary/ping/pong
                Some(Err(e)) => {
                    warn!("WebSocket error for {}: {}", connection.peer_id, e);
                    break;
                }
            },
            relayed = connection.next_relayed() => relayed,
        };

        if let Some(frame) = outgoing.as_ref().and_then(encode) {
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    }

    connection.leave(&state);
    info!("Connection closed: {}", connection.peer_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CanvasRecord;
    use serde_json::json;
    use std::collections::HashMap;

    fn state() -> AppState {
        let users: HashMap<String, String> =
            [("t-a", "a@x.io"), ("t-b", "b@x.io"), ("t-c", "c@x.io")]
                .into_iter()
                .map(|(t, e)| (t.to_string(), e.to_string()))
                .collect();
        let state = AppState::new(users);
        state.insert_canvas(
            "c1",
            CanvasRecord {
                owner: "a@x.io".to_string(),
                shared_with: vec!["b@x.io".to_string()],
                elements: vec![json!({"type": "LINE", "id": "x"})],
            },
        );
        state
    }

    fn join(connection: &mut Connection, state: &AppState) -> Option<ServerMessage> {
        connection.apply(
            state,
            ClientMessage::JoinCanvas {
                canvas_id: "c1".to_string(),
            },
        )
    }

    fn update(elements: Vec<serde_json::Value>) -> ClientMessage {
        ClientMessage::DrawingUpdate {
            canvas_id: "c1".to_string(),
            elements,
        }
    }

    #[test]
    fn test_join_loads_snapshot() {
        let state = state();
        let mut a = Connection::new("a@x.io".to_string());
        let reply = join(&mut a, &state).unwrap();
        assert!(matches!(reply, ServerMessage::LoadCanvas { ref elements } if elements.len() == 1));
        assert_eq!(a.room(), Some("c1"));
        assert_eq!(state.peer_count("c1"), 1);
    }

    #[test]
    fn test_update_relayed_without_echo() {
        let state = state();
        let mut a = Connection::new("a@x.io".to_string());
        let mut b = Connection::new("b@x.io".to_string());
        join(&mut a, &state);
        join(&mut b, &state);

        let snapshot = vec![json!({"type": "CIRCLE"})];
        assert_eq!(a.apply(&state, update(snapshot.clone())), None);
        assert_eq!(state.load("c1", "a@x.io").unwrap(), snapshot);

        let (from, message) = b.rx.as_mut().unwrap().try_recv().unwrap();
        assert_eq!(from, a.peer_id);
        assert_eq!(message, ServerMessage::ReceiveDrawingUpdate { elements: snapshot });
        // a's own receiver sees its message tagged with its id; next_relayed
        // filters it out.
        let (own, _) = a.rx.as_mut().unwrap().try_recv().unwrap();
        assert_eq!(own, a.peer_id);
    }

    #[test]
    fn test_stranger_is_unauthorized() {
        let state = state();
        let mut c = Connection::new("c@x.io".to_string());
        assert!(matches!(join(&mut c, &state), Some(ServerMessage::Unauthorized { .. })));
        assert_eq!(c.room(), None);
        assert!(matches!(
            c.apply(&state, update(vec![])),
            Some(ServerMessage::Unauthorized { .. })
        ));
        assert_eq!(state.load("c1", "a@x.io").unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_canvas_is_error() {
        let state = state();
        let mut a = Connection::new("a@x.io".to_string());
        let reply = a.apply(
            &state,
            ClientMessage::JoinCanvas {
                canvas_id: "missing".to_string(),
            },
        );
        assert!(matches!(reply, Some(ServerMessage::Error { .. })));
    }

    #[test]
    fn test_leave() {
        let state = state();
        let mut a = Connection::new("a@x.io".to_string());
        join(&mut a, &state);
        a.apply(
            &state,
            ClientMessage::LeaveCanvas {
                canvas_id: "other".to_string(),
            },
        );
        assert_eq!(a.room(), Some("c1"));
        a.apply(
            &state,
            ClientMessage::LeaveCanvas {
                canvas_id: "c1".to_string(),
            },
        );
        assert_eq!(a.room(), None);
        assert_eq!(state.peer_count("c1"), 0);
    }

    #[tokio::test]
    async fn test_next_relayed_skips_own_messages() {
        let state = state();
        let mut a = Connection::new("a@x.io".to_string());
        let mut b = Connection::new("b@x.io".to_string());
        join(&mut a, &state);
        join(&mut b, &state);
        a.apply(&state, update(vec![json!({"type": "LINE"})]));
        b.apply(&state, update(vec![json!({"type": "ARROW"})]));
        let relayed = a.next_relayed().await.unwrap();
        assert_eq!(
            relayed,
            ServerMessage::ReceiveDrawingUpdate {
                elements: vec![json!({"type": "ARROW"})]
            }
        );
    }
}
