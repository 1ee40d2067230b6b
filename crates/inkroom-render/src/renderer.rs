//! Surface trait abstraction.

use inkroom_core::elements::TEXT_FONT_FAMILY;
use kurbo::{BezPath, Point};
use peniko::Color;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Initialization failed: {0}")]
    InitFailed(String),
    #[error("Render failed: {0}")]
    RenderFailed(String),
    #[error("Surface error: {0}")]
    Surface(String),
    #[error("Element has non-finite geometry")]
    NonFinite,
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// A string to draw, anchored at its top-left corner.
#[derive(Debug, Clone)]
pub struct TextRun<'a> {
    pub text: &'a str,
    /// Top-left of the first line.
    pub origin: Point,
    pub size: f64,
    pub color: Color,
    pub family: &'a str,
}

impl<'a> TextRun<'a> {
    /// A run in the handwriting family.
    pub fn new(text: &'a str, origin: Point, size: f64, color: Color) -> Self {
        Self {
            text,
            origin,
            size,
            color,
            family: TEXT_FONT_FAMILY,
        }
    }
}

/// Drawing backend the render pipeline paints into.
///
/// Implementations can record commands, build a Vello scene, or drive any
/// other 2D engine. Coordinates are canvas units.
pub trait Surface {
    /// Wipe everything drawn so far and paint the background.
    fn clear(&mut self, background: Color);

    /// Stroke `path` with round caps and joins.
    fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color) -> RenderResult<()>;

    /// Fill `path` with the non-zero rule.
    fn fill_path(&mut self, path: &BezPath, color: Color) -> RenderResult<()>;

    fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()>;

    /// Start painting one element. Calls up to the matching
    /// [`Surface::end_element`] belong to it.
    fn begin_element(&mut self);

    /// Finish the current element. With `keep == false` everything it
    /// painted is discarded, leaving the surface as it was before
    /// [`Surface::begin_element`].
    fn end_element(&mut self, keep: bool);
}
