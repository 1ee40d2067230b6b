//! Shared server state: canvases, rooms and the token table.

use crate::error::ApiError;
use dashmap::DashMap;
use inkroom_core::storage::{CanvasOwner, CanvasSummary};
use inkroom_core::sync::ServerMessage;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

pub type SharedState = Arc<AppState>;

/// Message fanned out to a room, tagged with the sending peer.
pub type RoomMessage = (String, ServerMessage);

#[derive(Debug, Clone)]
pub struct CanvasRecord {
    pub owner: String,
    pub shared_with: Vec<String>,
    /// Last stored snapshot, kept as raw wire values.
    pub elements: Vec<Value>,
}

impl CanvasRecord {
    fn new(owner: &str) -> Self {
        Self {
            owner: owner.to_string(),
            shared_with: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Owners and users the canvas was shared with may view and edit.
    pub fn can_access(&self, email: &str) -> bool {
        self.owner == email || self.shared_with.iter().any(|e| e == email)
    }

    fn summary(&self, id: &str) -> CanvasSummary {
        CanvasSummary {
            id: id.to_string(),
            owner: Some(CanvasOwner {
                email: self.owner.clone(),
            }),
            shared_with: self.shared_with.clone(),
        }
    }
}

/// Room state
struct Room {
    /// Broadcast channel for this room
    tx: broadcast::Sender<RoomMessage>,
    /// Connected peer IDs
    peers: HashSet<String>,
}

impl Room {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

fn not_found(canvas_id: &str) -> ApiError {
    ApiError::NotFound(format!("Canvas {} not found", canvas_id))
}

/// Shared application state
pub struct AppState {
    canvases: DashMap<String, CanvasRecord>,
    rooms: DashMap<String, Room>,
    /// token -> email
    users: HashMap<String, String>,
}

impl AppState {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self {
            canvases: DashMap::new(),
            rooms: DashMap::new(),
            users,
        }
    }

    /// Resolve a bearer token to the user's email.
    pub fn user_for(&self, token: &str) -> Option<String> {
        self.users.get(token).cloned()
    }

    pub fn user_exists(&self, email: &str) -> bool {
        self.users.values().any(|u| u == email)
    }

    pub fn create_canvas(&self, owner: &str) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.canvases.insert(id.clone(), CanvasRecord::new(owner));
        id
    }

    pub fn insert_canvas(&self, id: &str, record: CanvasRecord) {
        self.canvases.insert(id.to_string(), record);
    }

    /// Stored snapshot of a canvas the caller may access.
    pub fn load(&self, canvas_id: &str, email: &str) -> Result<Vec<Value>, ApiError> {
        let canvas = self.canvases.get(canvas_id).ok_or_else(|| not_found(canvas_id))?;
        if !canvas.can_access(email) {
            return Err(ApiError::Forbidden(
                "You don't have permission to access this canvas".to_string(),
            ));
        }
        Ok(canvas.elements.clone())
    }

    /// Replace the stored snapshot.
    pub fn store_snapshot(
        &self,
        canvas_id: &str,
        email: &str,
        elements: Vec<Value>,
    ) -> Result<(), ApiError> {
        let mut canvas = self
            .canvases
            .get_mut(canvas_id)
            .ok_or_else(|| not_found(canvas_id))?;
        if !canvas.can_access(email) {
            return Err(ApiError::Forbidden(
                "You are not authorized to edit this canvas".to_string(),
            ));
        }
        canvas.elements = elements;
        Ok(())
    }

    fn summaries(&self, keep: impl Fn(&CanvasRecord) -> bool) -> Vec<CanvasSummary> {
        let mut list: Vec<CanvasSummary> = self
            .canvases
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().summary(entry.key()))
            .collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        list
    }

    pub fn list_owned(&self, email: &str) -> Vec<CanvasSummary> {
        self.summaries(|c| c.owner == email)
    }

    pub fn list_shared(&self, email: &str) -> Vec<CanvasSummary> {
        self.summaries(|c| c.shared_with.iter().any(|e| e == email))
    }

    pub fn delete(&self, canvas_id: &str, email: &str) -> Result<(), ApiError> {
        let owner = self
            .canvases
            .get(canvas_id)
            .map(|c| c.owner.clone())
            .ok_or_else(|| not_found(canvas_id))?;
        if owner != email {
            return Err(ApiError::Forbidden(
                "Only the owner can delete this canvas".to_string(),
            ));
        }
        self.canvases.remove(canvas_id);
        Ok(())
    }

    pub fn share(&self, canvas_id: &str, email: &str, with: &str) -> Result<(), ApiError> {
        if !self.user_exists(with) {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        let mut canvas = self
            .canvases
            .get_mut(canvas_id)
            .ok_or_else(|| not_found(canvas_id))?;
        if canvas.owner != email {
            return Err(ApiError::Forbidden(
                "Only the owner can share this canvas".to_string(),
            ));
        }
        if canvas.owner != with && !canvas.shared_with.iter().any(|e| e == with) {
            canvas.shared_with.push(with.to_string());
        }
        Ok(())
    }

    /// Add peer to room
    pub fn join_room(&self, canvas_id: &str, peer_id: &str) -> broadcast::Receiver<RoomMessage> {
        let mut room = self
            .rooms
            .entry(canvas_id.to_string())
            .or_insert_with(Room::new);
        room.peers.insert(peer_id.to_string());
        room.tx.subscribe()
    }

    /// Remove peer from room
    pub fn leave_room(&self, canvas_id: &str, peer_id: &str) {
        let empty = match self.rooms.get_mut(canvas_id) {
            Some(mut room) => {
                room.peers.remove(peer_id);
                room.peers.is_empty()
            }
            None => false,
        };
        if empty {
            self.rooms.remove_if(canvas_id, |_, room| room.peers.is_empty());
        }
    }

    pub fn peer_count(&self, canvas_id: &str) -> usize {
        self.rooms.get(canvas_id).map_or(0, |room| room.peers.len())
    }

    /// Broadcast message to room
    pub fn broadcast(&self, canvas_id: &str, from: &str, message: ServerMessage) {
        if let Some(room) = self.rooms.get(canvas_id) {
            // No receivers is fine: nobody else is in the room.
            let _ = room.tx.send((from.to_string(), message));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> AppState {
        let users = [("t-a", "a@x.io"), ("t-b", "b@x.io")]
            .into_iter()
            .map(|(t, e)| (t.to_string(), e.to_string()))
            .collect();
        AppState::new(users)
    }

    #[test]
    fn test_access_rules() {
        let state = state();
        let id = state.create_canvas("a@x.io");
        assert!(state.load(&id, "a@x.io").unwrap().is_empty());
        assert!(matches!(state.load(&id, "b@x.io"), Err(ApiError::Forbidden(_))));
        assert!(matches!(state.load("nope", "a@x.io"), Err(ApiError::NotFound(_))));

        state.share(&id, "a@x.io", "b@x.io").unwrap();
        state
            .store_snapshot(&id, "b@x.io", vec![json!({"type": "LINE"})])
            .unwrap();
        assert_eq!(state.load(&id, "a@x.io").unwrap().len(), 1);
        assert_eq!(state.list_shared("b@x.io").len(), 1);
        assert!(state.list_owned("b@x.io").is_empty());
    }

    #[test]
    fn test_share_and_delete_are_owner_only() {
        let state = state();
        let id = state.create_canvas("a@x.io");
        assert!(matches!(
            state.share(&id, "a@x.io", "ghost@x.io"),
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            state.share(&id, "b@x.io", "a@x.io"),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(state.delete(&id, "b@x.io"), Err(ApiError::Forbidden(_))));
        state.delete(&id, "a@x.io").unwrap();
        assert!(state.list_owned("a@x.io").is_empty());
    }

    #[test]
    fn test_rooms_cleaned_up() {
        let state = state();
        let _rx1 = state.join_room("c", "p1");
        let mut rx2 = state.join_room("c", "p2");
        assert_eq!(state.peer_count("c"), 2);
        state.broadcast(
            "c",
            "p1",
            ServerMessage::ReceiveDrawingUpdate { elements: vec![] },
        );
        let (from, _) = rx2.try_recv().unwrap();
        assert_eq!(from, "p1");
        state.leave_room("c", "p1");
        state.leave_room("c", "p2");
        assert_eq!(state.peer_count("c"), 0);
    }
}
