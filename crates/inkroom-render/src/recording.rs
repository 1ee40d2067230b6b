//! Surface that records drawing commands instead of rasterizing them.

use crate::renderer::{RenderResult, Surface, TextRun};
use inkroom_core::elements::SerializableColor;
use kurbo::{BezPath, Point};
use peniko::Color;

/// One recorded call on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(SerializableColor),
    Stroke {
        path: BezPath,
        width: f64,
        color: SerializableColor,
    },
    Fill {
        path: BezPath,
        color: SerializableColor,
    },
    Text {
        text: String,
        origin: Point,
        size: f64,
        color: SerializableColor,
        family: String,
    },
}

/// Command-list surface. Two renders of the same elements record the same
/// commands.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    element_start: Option<usize>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the surface empty.
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, background: Color) {
        self.commands.clear();
        self.element_start = None;
        self.commands.push(DrawCommand::Clear(background.into()));
    }

    fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color) -> RenderResult<()> {
        self.commands.push(DrawCommand::Stroke {
            path: path.clone(),
            width,
            color: color.into(),
        });
        Ok(())
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) -> RenderResult<()> {
        self.commands.push(DrawCommand::Fill {
            path: path.clone(),
            color: color.into(),
        });
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()> {
        self.commands.push(DrawCommand::Text {
            text: run.text.to_string(),
            origin: run.origin,
            size: run.size,
            color: run.color.into(),
            family: run.family.to_string(),
        });
        Ok(())
    }

    fn begin_element(&mut self) {
        self.element_start = Some(self.commands.len());
    }

    fn end_element(&mut self, keep: bool) {
        if let Some(start) = self.element_start.take() {
            if !keep {
                self.commands.truncate(start);
            }
        }
    }
}
