//! In-process relay with the same room semantics as the server.
//!
//! Used to run several sessions against one another without a network, in
//! tests and offline mode. Everything is single-threaded.

use super::{Channel, ClientMessage, ConnectionState, ServerMessage, SyncError, SyncEvent};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

type ClientId = usize;

#[derive(Debug, Default)]
struct Room {
    snapshot: Vec<Value>,
    members: Vec<ClientId>,
}

#[derive(Debug)]
struct Client {
    can_edit: bool,
    room: Option<String>,
    inbox: VecDeque<SyncEvent>,
}

#[derive(Debug, Default)]
struct Hub {
    rooms: HashMap<String, Room>,
    clients: HashMap<ClientId, Client>,
    next_id: ClientId,
}

impl Hub {
    fn deliver(&mut self, to: ClientId, message: ServerMessage) {
        if let Some(client) = self.clients.get_mut(&to) {
            client.inbox.push_back(SyncEvent::Message(message));
        }
    }

    fn leave(&mut self, id: ClientId) {
        let Some(room_id) = self.clients.get_mut(&id).and_then(|c| c.room.take()) else {
            return;
        };
        if let Some(room) = self.rooms.get_mut(&room_id) {
            room.members.retain(|&m| m != id);
        }
    }

    fn handle(&mut self, from: ClientId, frame: &str) -> Result<(), SyncError> {
        let message: ClientMessage = serde_json::from_str(frame)?;
        let can_edit = match self.clients.get(&from) {
            Some(client) => client.can_edit,
            None => return Err(SyncError::NotConnected),
        };

        match message {
            ClientMessage::JoinCanvas { canvas_id } => {
                self.leave(from);
                let room = self.rooms.entry(canvas_id.clone()).or_default();
                room.members.push(from);
                let elements = room.snapshot.clone();
                if let Some(client) = self.clients.get_mut(&from) {
                    client.room = Some(canvas_id);
                }
                self.deliver(from, ServerMessage::LoadCanvas { elements });
            }
            ClientMessage::DrawingUpdate {
                canvas_id,
                elements,
            } => {
                if !can_edit {
                    self.deliver(
                        from,
                        ServerMessage::Unauthorized {
                            message: "You are not authorized to edit this canvas".to_string(),
                        },
                    );
                    return Ok(());
                }
                let room = self.rooms.entry(canvas_id).or_default();
                room.snapshot = elements.clone();
                let others: Vec<ClientId> =
                    room.members.iter().copied().filter(|&m| m != from).collect();
                for other in others {
                    self.deliver(
                        other,
                        ServerMessage::ReceiveDrawingUpdate {
                            elements: elements.clone(),
                        },
                    );
                }
            }
            ClientMessage::LeaveCanvas { .. } => self.leave(from),
        }
        Ok(())
    }
}

/// Shared handle to an in-process relay.
#[derive(Debug, Clone, Default)]
pub struct LocalRelay {
    hub: Rc<RefCell<Hub>>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a channel for a user who may edit.
    pub fn connect(&self) -> LocalChannel {
        self.open(true)
    }

    /// Open a channel for a user who may only view; their drawing updates are
    /// answered with `unauthorized`.
    pub fn connect_read_only(&self) -> LocalChannel {
        self.open(false)
    }

    fn open(&self, can_edit: bool) -> LocalChannel {
        let mut hub = self.hub.borrow_mut();
        let id = hub.next_id;
        hub.next_id += 1;
        let mut inbox = VecDeque::new();
        inbox.push_back(SyncEvent::Connected);
        hub.clients.insert(
            id,
            Client {
                can_edit,
                room: None,
                inbox,
            },
        );
        LocalChannel {
            hub: Rc::clone(&self.hub),
            id,
            state: ConnectionState::Connecting,
        }
    }

    /// Last snapshot stored for a canvas.
    pub fn snapshot(&self, canvas_id: &str) -> Option<Vec<Value>> {
        self.hub
            .borrow()
            .rooms
            .get(canvas_id)
            .map(|room| room.snapshot.clone())
    }

    /// Seed the stored snapshot of a canvas.
    pub fn set_snapshot(&self, canvas_id: &str, elements: Vec<Value>) {
        self.hub
            .borrow_mut()
            .rooms
            .entry(canvas_id.to_string())
            .or_default()
            .snapshot = elements;
    }

    pub fn member_count(&self, canvas_id: &str) -> usize {
        self.hub
            .borrow()
            .rooms
            .get(canvas_id)
            .map_or(0, |room| room.members.len())
    }
}

/// One client's end of a `LocalRelay`.
#[derive(Debug)]
pub struct LocalChannel {
    hub: Rc<RefCell<Hub>>,
    id: ClientId,
    state: ConnectionState,
}

impl Channel for LocalChannel {
    fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError> {
        if self.state == ConnectionState::Disconnected {
            return Err(SyncError::NotConnected);
        }
        let frame = serde_json::to_string(message)?;
        self.hub.borrow_mut().handle(self.id, &frame)
    }

    fn poll_events(&mut self) -> Vec<SyncEvent> {
        let events: Vec<SyncEvent> = match self.hub.borrow_mut().clients.get_mut(&self.id) {
            Some(client) => client.inbox.drain(..).collect(),
            None => Vec::new(),
        };
        for event in &events {
            self.state = self.state.after(event);
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn disconnect(&mut self) {
        let mut hub = self.hub.borrow_mut();
        hub.leave(self.id);
        hub.clients.remove(&self.id);
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}
