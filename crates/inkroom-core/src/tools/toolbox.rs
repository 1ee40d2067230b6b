//! Per-tool style defaults.

use super::ToolKind;
use crate::elements::{DEFAULT_TEXT_SIZE, ElementStyle, SerializableColor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Style remembered for one tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolStyle {
    pub stroke: SerializableColor,
    #[serde(default)]
    pub fill: Option<SerializableColor>,
    pub size: f64,
}

impl ToolStyle {
    fn for_tool(tool: ToolKind) -> Self {
        let size = match tool {
            ToolKind::Brush => 16.0,
            ToolKind::Text => DEFAULT_TEXT_SIZE,
            ToolKind::Eraser => 0.0,
            ToolKind::Line | ToolKind::Rectangle | ToolKind::Circle | ToolKind::Arrow => 1.0,
        };
        Self {
            stroke: SerializableColor::black(),
            fill: None,
            size,
        }
    }
}

/// Style defaults keyed by tool. Changing a value only affects elements
/// created afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolbox {
    styles: HashMap<ToolKind, ToolStyle>,
}

impl Default for Toolbox {
    fn default() -> Self {
        Self {
            styles: ToolKind::ALL
                .iter()
                .map(|&tool| (tool, ToolStyle::for_tool(tool)))
                .collect(),
        }
    }
}

impl Toolbox {
    pub fn get(&self, tool: ToolKind) -> ToolStyle {
        self.styles
            .get(&tool)
            .copied()
            .unwrap_or_else(|| ToolStyle::for_tool(tool))
    }

    pub fn set_stroke(&mut self, tool: ToolKind, stroke: SerializableColor) {
        self.entry(tool).stroke = stroke;
    }

    /// Only closed shapes keep a fill.
    pub fn set_fill(&mut self, tool: ToolKind, fill: Option<SerializableColor>) {
        if matches!(tool, ToolKind::Rectangle | ToolKind::Circle) {
            self.entry(tool).fill = fill;
        }
    }

    pub fn set_size(&mut self, tool: ToolKind, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.entry(tool).size = size;
        }
    }

    /// Style for a new element created with `tool`. The seed is left at zero
    /// and derived from the new element's id.
    pub fn element_style(&self, tool: ToolKind) -> ElementStyle {
        let style = self.get(tool);
        ElementStyle {
            stroke: style.stroke,
            fill: style.fill,
            size: style.size,
            seed: 0,
        }
    }

    fn entry(&mut self, tool: ToolKind) -> &mut ToolStyle {
        self.styles
            .entry(tool)
            .or_insert_with(|| ToolStyle::for_tool(tool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let toolbox = Toolbox::default();
        assert_eq!(toolbox.get(ToolKind::Text).size, DEFAULT_TEXT_SIZE);
        assert_eq!(toolbox.get(ToolKind::Rectangle).fill, None);
        assert_eq!(toolbox.get(ToolKind::Line).stroke, SerializableColor::black());
    }

    #[test]
    fn test_fill_only_for_closed_shapes() {
        let mut toolbox = Toolbox::default();
        let red = SerializableColor::new(255, 0, 0, 255);
        toolbox.set_fill(ToolKind::Line, Some(red));
        toolbox.set_fill(ToolKind::Circle, Some(red));
        assert_eq!(toolbox.get(ToolKind::Line).fill, None);
        assert_eq!(toolbox.get(ToolKind::Circle).fill, Some(red));
    }

    #[test]
    fn test_rejects_bad_size() {
        let mut toolbox = Toolbox::default();
        toolbox.set_size(ToolKind::Brush, f64::NAN);
        toolbox.set_size(ToolKind::Brush, -3.0);
        assert_eq!(toolbox.get(ToolKind::Brush).size, 16.0);
        toolbox.set_size(ToolKind::Brush, 4.0);
        assert_eq!(toolbox.element_style(ToolKind::Brush).size, 4.0);
    }
}
