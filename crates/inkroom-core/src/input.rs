//! Input events delivered to a canvas session.

use crate::tools::ToolKind;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event on the canvas surface, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point },
    Move { position: Point },
    Up { position: Point },
}

/// A key pressed anywhere in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }

    /// Map the key to a document-level shortcut.
    pub fn shortcut(&self) -> Option<Shortcut> {
        if !self.modifiers.command() {
            return None;
        }
        match self.key.to_ascii_lowercase().as_str() {
            "z" if self.modifiers.shift => Some(Shortcut::Redo),
            "z" => Some(Shortcut::Undo),
            "y" => Some(Shortcut::Redo),
            _ => None,
        }
    }
}

/// Document-level keyboard shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
}

/// Everything a canvas session reacts to from the local user.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Key(KeyPress),
    /// The text overlay lost focus with this content.
    TextBlur(String),
    SelectTool(ToolKind),
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        InputEvent::Pointer(event)
    }
}

impl From<KeyPress> for InputEvent {
    fn from(key: KeyPress) -> Self {
        InputEvent::Key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcuts() {
        assert_eq!(KeyPress::new("z", Modifiers::ctrl()).shortcut(), Some(Shortcut::Undo));
        assert_eq!(KeyPress::new("y", Modifiers::ctrl()).shortcut(), Some(Shortcut::Redo));
        let ctrl_shift = Modifiers {
            shift: true,
            ..Modifiers::ctrl()
        };
        assert_eq!(KeyPress::new("Z", ctrl_shift).shortcut(), Some(Shortcut::Redo));
        let cmd = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert_eq!(KeyPress::new("z", cmd).shortcut(), Some(Shortcut::Undo));
    }

    #[test]
    fn test_plain_keys_are_not_shortcuts() {
        assert_eq!(KeyPress::new("z", Modifiers::NONE).shortcut(), None);
        assert_eq!(KeyPress::new("x", Modifiers::ctrl()).shortcut(), None);
    }
}
