//! A mounted canvas view: board, channel and collaborators wired together.
//!
//! The session is driven from a single event loop. Local input goes through
//! [`CanvasSession::handle_input`], channel traffic through
//! [`CanvasSession::poll_channel`], and the initial snapshot fetch through
//! [`CanvasSession::begin_initial_load`] / [`CanvasSession::complete_initial_load`].
//!
//! Replication is last-write-wins on whole snapshots: every broadcast carries
//! the sender's full element list and every receiver replaces its own. Two
//! users finishing strokes at the same time can therefore lose one of them.

use crate::canvas::{Board, Mutation, TextOverlay};
use crate::config::SessionConfig;
use crate::elements::{Element, decode_snapshot, encode_snapshot};
use crate::input::{InputEvent, PointerEvent, Shortcut};
use crate::storage::{BoxFuture, CanvasStore, CredentialStore, StoreError, StoreResult};
use crate::sync::{Channel, ClientMessage, ConnectionState, ServerMessage, SyncEvent};
use crate::tools::{ToolKind, Toolbox};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// User-facing messages raised by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The server refused an edit, or the store refused to load the canvas.
    /// The session is read-only from now on.
    AccessDenied { message: String },
    /// The initial snapshot could not be fetched; the canvas starts empty.
    LoadFailed { message: String },
}

/// Rate limit for updates sent while the pointer moves.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether more than one interval has passed since the last mark.
    pub fn ready(&self, now: Instant) -> bool {
        self.last
            .is_none_or(|last| now.saturating_duration_since(last) > self.interval)
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

pub struct CanvasSession<C: Channel> {
    canvas_id: Option<String>,
    board: Board,
    channel: C,
    store: Arc<dyn CanvasStore>,
    credentials: Arc<dyn CredentialStore>,
    config: SessionConfig,
    throttle: Throttle,
    authorized: bool,
    mounted: bool,
    needs_rejoin: bool,
    initial_load_started: bool,
    notices: Vec<Notice>,
}

impl<C: Channel> CanvasSession<C> {
    pub fn new(
        canvas_id: Option<String>,
        channel: C,
        store: Arc<dyn CanvasStore>,
        credentials: Arc<dyn CredentialStore>,
        config: SessionConfig,
    ) -> Self {
        let mut toolbox = Toolbox::default();
        toolbox.set_size(ToolKind::Text, config.default_text_size);
        Self {
            canvas_id,
            board: Board::with_toolbox(toolbox, config.eraser_tolerance),
            channel,
            store,
            credentials,
            throttle: Throttle::new(config.throttle_interval()),
            config,
            authorized: true,
            mounted: false,
            needs_rejoin: false,
            initial_load_started: false,
            notices: Vec::new(),
        }
    }

    /// Start the view: join the canvas room if a canvas is selected.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        log::info!("Mounting canvas session {:?}", self.canvas_id);
        self.join();
    }

    /// Stop the view: leave the room, close the channel, and ignore every
    /// later event.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        if let Some(canvas_id) = self.canvas_id.clone() {
            self.emit(ClientMessage::LeaveCanvas { canvas_id });
        }
        self.channel.disconnect();
        self.mounted = false;
        log::info!("Unmounted canvas session {:?}", self.canvas_id);
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_read_only(&self) -> bool {
        !self.authorized
    }

    pub fn canvas_id(&self) -> Option<&str> {
        self.canvas_id.as_deref()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn elements(&self) -> &[Element] {
        self.board.elements()
    }

    pub fn text_overlay(&self) -> Option<TextOverlay> {
        self.board.text_overlay()
    }

    /// Style defaults for new elements.
    pub fn toolbox_mut(&mut self) -> &mut Toolbox {
        &mut self.board.tools.toolbox
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Take the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn join(&mut self) {
        if let Some(canvas_id) = self.canvas_id.clone() {
            self.emit(ClientMessage::JoinCanvas { canvas_id });
        }
        self.needs_rejoin = false;
    }

    fn emit(&mut self, message: ClientMessage) {
        if let Err(e) = self.channel.send(&message) {
            log::warn!("Failed to send message: {}", e);
        }
    }

    /// Send the full current snapshot to the room.
    fn broadcast(&mut self) {
        let Some(canvas_id) = self.canvas_id.clone() else {
            return;
        };
        let elements = encode_snapshot(self.board.elements());
        self.emit(ClientMessage::DrawingUpdate {
            canvas_id,
            elements,
        });
    }

    fn deny(&mut self, message: String) {
        if self.authorized {
            log::warn!("Canvas is read-only: {}", message);
        }
        self.authorized = false;
        self.notices.push(Notice::AccessDenied { message });
    }

    /// Apply one local input event. Ignored while unmounted or read-only.
    pub fn handle_input(&mut self, event: InputEvent, now: Instant) -> Mutation {
        if !self.mounted || !self.authorized {
            return Mutation::Unchanged;
        }

        match event {
            InputEvent::Pointer(PointerEvent::Down { position }) => {
                self.board.pointer_down(position)
            }
            InputEvent::Pointer(PointerEvent::Move { position }) => {
                let mutation = self.board.pointer_move(position);
                if mutation.changed() && self.throttle.ready(now) {
                    self.broadcast();
                    self.throttle.mark(now);
                }
                mutation
            }
            InputEvent::Pointer(PointerEvent::Up { .. }) => {
                let mutation = self.board.pointer_up();
                self.broadcast();
                mutation
            }
            InputEvent::TextBlur(text) => {
                let mutation = self.board.text_blur(&text);
                self.broadcast();
                mutation
            }
            // Shortcuts apply document-wide, even while the text overlay has
            // focus.
            InputEvent::Key(key) => match key.shortcut() {
                Some(Shortcut::Undo) => self.board.undo(),
                Some(Shortcut::Redo) => self.board.redo(),
                None => Mutation::Unchanged,
            },
            InputEvent::SelectTool(tool) => self.board.select_tool(tool),
        }
    }

    /// Drain the channel and apply what arrived. Returns the number of events
    /// handled.
    pub fn poll_channel(&mut self, now: Instant) -> usize {
        if !self.mounted {
            return 0;
        }
        let events = self.channel.poll_events();
        let count = events.len();
        for event in events {
            self.handle_event(event, now);
        }
        count
    }

    fn handle_event(&mut self, event: SyncEvent, now: Instant) {
        match event {
            SyncEvent::Connected => {
                log::info!("Connected to relay");
                if self.needs_rejoin {
                    self.join();
                }
            }
            SyncEvent::Disconnected => {
                log::info!("Disconnected from relay");
                self.needs_rejoin = true;
            }
            SyncEvent::Reconnecting { attempt } => {
                log::info!("Reconnecting to relay, attempt {}", attempt);
                self.needs_rejoin = true;
            }
            SyncEvent::Error { message } => log::warn!("Channel error: {}", message),
            SyncEvent::Message(message) => self.handle_message(message, now),
        }
    }

    fn handle_message(&mut self, message: ServerMessage, now: Instant) {
        match message {
            ServerMessage::LoadCanvas { elements } => {
                let elements = decode_snapshot(&elements);
                log::debug!("Loaded {} elements from relay", elements.len());
                self.board.load(elements);
            }
            ServerMessage::ReceiveDrawingUpdate { elements } => {
                self.board.replace(decode_snapshot(&elements));
                self.throttle.mark(now);
            }
            ServerMessage::Unauthorized { message } => self.deny(message),
            ServerMessage::Error { message } => log::warn!("Relay error: {}", message),
        }
    }

    /// Start fetching the saved snapshot. Returns None when there is nothing
    /// to fetch: no canvas, no credential, not mounted, or already started.
    pub fn begin_initial_load(
        &mut self,
    ) -> Option<BoxFuture<'static, StoreResult<Vec<Value>>>> {
        if !self.mounted || self.initial_load_started {
            return None;
        }
        let canvas_id = self.canvas_id.clone()?;
        let token = match self.credentials.get(&self.config.credential_key) {
            Ok(Some(token)) => token,
            Ok(None) => {
                log::info!("No credential stored; skipping initial load");
                return None;
            }
            Err(e) => {
                log::error!("Failed to read credential: {}", e);
                return None;
            }
        };
        self.initial_load_started = true;
        let store = Arc::clone(&self.store);
        Some(Box::pin(async move { store.load(&canvas_id, &token).await }))
    }

    /// Apply the result of the initial fetch in one step.
    pub fn complete_initial_load(&mut self, result: StoreResult<Vec<Value>>) {
        if !self.mounted {
            return;
        }
        match result {
            Ok(values) => {
                let elements = decode_snapshot(&values);
                log::info!("Initial load: {} elements", elements.len());
                self.board.load(elements);
            }
            Err(StoreError::PermissionDenied) => {
                self.deny("You don't have permission to view this canvas.".to_string());
            }
            Err(e) => {
                log::error!("Error loading canvas: {}", e);
                self.notices.push(Notice::LoadFailed {
                    message: e.to_string(),
                });
            }
        }
    }
}

impl<C: Channel> Drop for CanvasSession<C> {
    fn drop(&mut self) {
        self.unmount();
    }
}
