//! Text element.

use super::{ElementId, ElementStyle, ElementTrait};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Font size used when the toolbox does not say otherwise.
pub const DEFAULT_TEXT_SIZE: f64 = 32.0;

/// Family every text element is drawn with.
pub const TEXT_FONT_FAMILY: &str = "Caveat";

/// Average glyph advance as a fraction of the font size, for hit testing
/// without a layout engine.
const GLYPH_WIDTH_RATIO: f64 = 0.5;

/// A single line of text anchored at its top-left corner.
/// The font size is `style.size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: ElementId,
    pub x1: f64,
    pub y1: f64,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub style: ElementStyle,
}

impl Text {
    pub fn new(id: ElementId, anchor: Point, text: String, style: ElementStyle) -> Self {
        Self {
            id,
            x1: anchor.x,
            y1: anchor.y,
            text,
            style,
        }
    }

    pub fn anchor(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn font_size(&self) -> f64 {
        if self.style.size > 0.0 {
            self.style.size
        } else {
            DEFAULT_TEXT_SIZE
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl ElementTrait for Text {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let size = self.font_size();
        let width = self.text.chars().count() as f64 * size * GLYPH_WIDTH_RATIO;
        Rect::from_origin_size(self.anchor(), (width, size))
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    /// Text does not follow the pointer.
    fn drag_to(&mut self, _point: Point) {}

    /// Text is laid out by the renderer.
    fn refresh(&mut self) {}
}
