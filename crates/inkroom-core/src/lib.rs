//! Inkroom Core Library
//!
//! Platform-agnostic element model, drawing state machine, history and
//! snapshot sync for the Inkroom shared whiteboard.

pub mod canvas;
pub mod config;
pub mod elements;
pub mod history;
pub mod input;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tools;

pub use canvas::{Board, Mutation, TextOverlay};
pub use config::{ConfigError, SessionConfig};
pub use elements::{Element, ElementId, ElementKind, ElementStyle, SerializableColor};
pub use history::History;
pub use input::{InputEvent, KeyPress, Modifiers, PointerEvent, Shortcut};
pub use session::{CanvasSession, Notice, Throttle};
pub use storage::{CanvasStore, CredentialStore, StoreError};
pub use sync::{Channel, ClientMessage, ConnectionState, ServerMessage, SyncEvent};
pub use tools::{ActionState, ToolKind, Toolbox};
