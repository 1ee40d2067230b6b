//! Tool system for the whiteboard.

mod toolbox;

pub use toolbox::{ToolStyle, Toolbox};

use crate::elements::{ElementId, ElementKind};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolKind {
    #[default]
    Brush,
    Line,
    Rectangle,
    Circle,
    Arrow,
    Eraser,
    Text,
}

impl ToolKind {
    pub const ALL: [ToolKind; 7] = [
        ToolKind::Brush,
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Arrow,
        ToolKind::Eraser,
        ToolKind::Text,
    ];

    /// The element kind this tool creates, if any.
    pub fn element_kind(self) -> Option<ElementKind> {
        match self {
            ToolKind::Brush => Some(ElementKind::Brush),
            ToolKind::Line => Some(ElementKind::Line),
            ToolKind::Rectangle => Some(ElementKind::Rectangle),
            ToolKind::Circle => Some(ElementKind::Circle),
            ToolKind::Arrow => Some(ElementKind::Arrow),
            ToolKind::Text => Some(ElementKind::Text),
            ToolKind::Eraser => None,
        }
    }

    /// Whether the tool's elements are dragged out between two points.
    pub fn is_drawing(self) -> bool {
        !matches!(self, ToolKind::Eraser | ToolKind::Text)
    }
}

/// What the pointer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    /// Dragging out the element with this id.
    Drawing(ElementId),
    /// The text overlay is open for the element with this id.
    Writing(ElementId),
    /// Eraser held down; counts elements removed since the press.
    Erasing { removed: usize },
}

impl ActionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ActionState::Idle)
    }

    /// The id of the element being drawn or written, if any.
    pub fn in_progress(&self) -> Option<ElementId> {
        match self {
            ActionState::Drawing(id) | ActionState::Writing(id) => Some(*id),
            _ => None,
        }
    }
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the pointer interaction.
    pub state: ActionState,
    /// Per-tool style defaults applied to new elements.
    pub toolbox: Toolbox,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_toolbox(toolbox: Toolbox) -> Self {
        Self {
            toolbox,
            ..Self::default()
        }
    }

    /// Select a tool. Returns the interaction that was interrupted, if any.
    pub fn set_tool(&mut self, tool: ToolKind) -> ActionState {
        self.current_tool = tool;
        std::mem::take(&mut self.state)
    }
}
