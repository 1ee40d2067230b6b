//! Turns canvas elements into surface calls.
//!
//! Every frame is a full redraw: clear, then paint each element in order.
//! One element failing to draw never stops the rest of the frame.

use crate::renderer::{RenderResult, RendererError, Surface, TextRun};
use inkroom_core::canvas::Board;
use inkroom_core::elements::{Element, ElementStyle, Sketch};
use peniko::Color;

/// Outcome of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Elements that produced drawing calls.
    pub drawn: usize,
    /// Elements with nothing to draw (empty text).
    pub empty: usize,
    /// Elements that failed and were skipped.
    pub skipped: usize,
}

/// Full-redraw render pipeline.
#[derive(Debug, Clone)]
pub struct RenderPipeline {
    background: Color,
    last_revision: Option<u64>,
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::with_background(Color::WHITE)
    }

    pub fn with_background(background: Color) -> Self {
        Self {
            background,
            last_revision: None,
        }
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Force the next [`RenderPipeline::render_board`] to redraw.
    pub fn invalidate(&mut self) {
        self.last_revision = None;
    }

    /// Redraw the board if it changed since the last frame.
    pub fn render_board(
        &mut self,
        board: &Board,
        surface: &mut impl Surface,
    ) -> Option<FrameReport> {
        if self.last_revision == Some(board.revision()) {
            return None;
        }
        self.last_revision = Some(board.revision());
        Some(self.render(board.elements(), surface))
    }

    /// Clear the surface and paint `elements` in order.
    pub fn render(&self, elements: &[Element], surface: &mut impl Surface) -> FrameReport {
        surface.clear(self.background);
        let mut report = FrameReport::default();
        for element in elements {
            surface.begin_element();
            let result = draw_element(element, surface);
            surface.end_element(result.is_ok());
            match result {
                Ok(true) => report.drawn += 1,
                Ok(false) => report.empty += 1,
                Err(e) => {
                    log::warn!("Skipping {:?} element {}: {}", element.kind(), element.id(), e);
                    report.skipped += 1;
                }
            }
        }
        if report.skipped > 0 {
            log::debug!("Frame skipped {} of {} elements", report.skipped, elements.len());
        }
        report
    }
}

/// Paint one element. Returns false when there was nothing to paint.
pub fn draw_element(element: &Element, surface: &mut impl Surface) -> RenderResult<bool> {
    if !element.is_finite() {
        return Err(RendererError::NonFinite);
    }
    match element {
        Element::Line(line) => draw_sketch(line.sketch(), &line.style, false, surface)?,
        Element::Arrow(arrow) => draw_sketch(arrow.sketch(), &arrow.style, false, surface)?,
        Element::Rectangle(rect) => draw_sketch(rect.sketch(), &rect.style, true, surface)?,
        Element::Circle(circle) => draw_sketch(circle.sketch(), &circle.style, true, surface)?,
        Element::Brush(brush) => surface.fill_path(brush.outline(), brush.style.stroke())?,
        Element::Text(text) => {
            if text.is_empty() {
                return Ok(false);
            }
            let color = text.style.stroke();
            let run = TextRun::new(&text.text, text.anchor(), text.font_size(), color);
            surface.draw_text(&run)?;
        }
    }
    Ok(true)
}

fn draw_sketch(
    sketch: &Sketch,
    style: &ElementStyle,
    fillable: bool,
    surface: &mut impl Surface,
) -> RenderResult<()> {
    if let Some(fill) = style.fill().filter(|_| fillable) {
        surface.fill_path(&sketch.fill, fill)?;
    }
    for stroke in &sketch.strokes {
        surface.stroke_path(stroke, style.size, style.stroke())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, RecordingSurface};
    use inkroom_core::elements::{Brush, ElementKind, Line, Rectangle, SerializableColor, Text};
    use inkroom_core::tools::ToolKind;
    use kurbo::{BezPath, Point};
    use uuid::Uuid;

    fn style() -> ElementStyle {
        let _ = env_logger::builder().is_test(true).try_init();
        ElementStyle {
            seed: 7,
            ..Default::default()
        }
    }

    fn rect(fill: Option<SerializableColor>) -> Element {
        let style = ElementStyle { fill, ..style() };
        Element::Rectangle(Rectangle::new(
            Uuid::new_v4(),
            Point::new(10.0, 10.0),
            Point::new(50.0, 50.0),
            style,
        ))
    }

    /// Surface failing every call that paints with `poison`.
    struct Failing {
        inner: RecordingSurface,
        poison: SerializableColor,
    }

    impl Surface for Failing {
        fn clear(&mut self, background: Color) {
            self.inner.clear(background)
        }

        fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color) -> RenderResult<()> {
            if SerializableColor::from(color) == self.poison {
                return Err(RendererError::RenderFailed("poisoned".to_string()));
            }
            self.inner.stroke_path(path, width, color)
        }

        fn fill_path(&mut self, path: &BezPath, color: Color) -> RenderResult<()> {
            self.inner.fill_path(path, color)
        }

        fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()> {
            self.inner.draw_text(run)
        }

        fn begin_element(&mut self) {
            self.inner.begin_element()
        }

        fn end_element(&mut self, keep: bool) {
            self.inner.end_element(keep)
        }
    }

    #[test]
    fn test_shape_draws_sketch_strokes() {
        let element = rect(None);
        let mut surface = RecordingSurface::new();
        let report = RenderPipeline::new().render(std::slice::from_ref(&element), &mut surface);
        assert_eq!(report, FrameReport { drawn: 1, empty: 0, skipped: 0 });

        let Element::Rectangle(r) = &element else { unreachable!() };
        let commands = surface.commands();
        assert!(matches!(commands[0], DrawCommand::Clear(_)));
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[1],
            DrawCommand::Stroke {
                path: r.sketch().strokes[0].clone(),
                width: 1.0,
                color: SerializableColor::black(),
            }
        );
    }

    #[test]
    fn test_fill_painted_under_strokes() {
        let red = SerializableColor::new(255, 0, 0, 255);
        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&[rect(Some(red))], &mut surface);
        assert!(matches!(
            &surface.commands()[1],
            DrawCommand::Fill { color, .. } if *color == red
        ));
        assert_eq!(surface.commands().len(), 4);
    }

    #[test]
    fn test_line_ignores_fill() {
        let style = ElementStyle {
            fill: Some(SerializableColor::new(0, 255, 0, 255)),
            ..style()
        };
        let line = Line::new(Uuid::new_v4(), Point::ZERO, Point::new(5.0, 5.0), style);
        let line = Element::Line(line);
        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&[line], &mut surface);
        assert!(surface
            .commands()
            .iter()
            .all(|c| !matches!(c, DrawCommand::Fill { .. })));
    }

    #[test]
    fn test_brush_fills_outline_with_stroke_color() {
        let blue = SerializableColor::new(0, 0, 255, 255);
        let style = ElementStyle {
            stroke: blue,
            size: 16.0,
            ..style()
        };
        let brush = Brush::from_points(
            Uuid::new_v4(),
            vec![Point::new(0.0, 0.0), Point::new(20.0, 5.0), Point::new(40.0, 0.0)],
            style,
        );
        let outline = brush.outline().clone();
        let mut surface = RecordingSurface::new();
        RenderPipeline::new().render(&[Element::Brush(brush)], &mut surface);
        assert_eq!(
            surface.commands()[1],
            DrawCommand::Fill {
                path: outline,
                color: blue
            }
        );
    }

    #[test]
    fn test_text_run() {
        let style = ElementStyle {
            size: 32.0,
            ..style()
        };
        let text = Text::new(Uuid::new_v4(), Point::new(20.0, 30.0), "hi".to_string(), style);
        let empty = Text::new(Uuid::new_v4(), Point::new(0.0, 0.0), "  ".to_string(), style);
        let mut surface = RecordingSurface::new();
        let report = RenderPipeline::new().render(
            &[Element::Text(text), Element::Text(empty)],
            &mut surface,
        );
        assert_eq!(report.drawn, 1);
        assert_eq!(report.empty, 1);
        assert_eq!(
            surface.commands()[1],
            DrawCommand::Text {
                text: "hi".to_string(),
                origin: Point::new(20.0, 30.0),
                size: 32.0,
                color: SerializableColor::black(),
                family: "Caveat".to_string(),
            }
        );
    }

    #[test]
    fn test_non_finite_element_is_skipped() {
        let mut line = Line::new(Uuid::new_v4(), Point::ZERO, Point::new(5.0, 5.0), style());
        line.x2 = f64::NAN;
        let elements = [rect(None), Element::Line(line), rect(None)];
        let mut surface = RecordingSurface::new();
        let report = RenderPipeline::new().render(&elements, &mut surface);
        assert_eq!(report, FrameReport { drawn: 2, empty: 0, skipped: 1 });
        assert_eq!(surface.commands().len(), 5);
    }

    #[test]
    fn test_surface_error_isolated_to_element() {
        let poison = SerializableColor::new(1, 2, 3, 255);
        let bad = ElementStyle {
            stroke: poison,
            ..style()
        };
        let elements = [
            rect(None),
            Element::create(ElementKind::Arrow, Point::new(3.0, 3.0), bad),
            rect(None),
        ];
        let mut surface = Failing {
            inner: RecordingSurface::new(),
            poison,
        };
        let report = RenderPipeline::new().render(&elements, &mut surface);
        assert_eq!(report.drawn, 2);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_failed_element_leaves_no_partial_paint() {
        let red = SerializableColor::new(255, 0, 0, 255);
        let poison = SerializableColor::new(1, 2, 3, 255);
        let failing = ElementStyle {
            stroke: poison,
            fill: Some(red),
            ..style()
        };
        let filled = Rectangle::new(Uuid::new_v4(), Point::ZERO, Point::new(40.0, 40.0), failing);
        let elements = [Element::Rectangle(filled), rect(None)];
        let mut surface = Failing {
            inner: RecordingSurface::new(),
            poison,
        };
        let report = RenderPipeline::new().render(&elements, &mut surface);
        assert_eq!(report, FrameReport { drawn: 1, empty: 0, skipped: 1 });

        let commands = surface.inner.commands();
        assert!(commands.iter().all(|c| !matches!(c, DrawCommand::Fill { .. })));
        // Clear plus the two sketch strokes of the surviving rectangle.
        assert_eq!(commands.len(), 3);
    }

    #[test]
    fn test_render_board_only_on_change() {
        let mut board = Board::new();
        let mut pipeline = RenderPipeline::new();
        let mut surface = RecordingSurface::new();
        assert!(pipeline.render_board(&board, &mut surface).is_some());
        assert!(pipeline.render_board(&board, &mut surface).is_none());

        board.select_tool(ToolKind::Circle);
        board.pointer_down(Point::new(0.0, 0.0));
        board.pointer_move(Point::new(30.0, 20.0));
        let report = pipeline.render_board(&board, &mut surface).unwrap();
        assert_eq!(report.drawn, 1);

        pipeline.invalidate();
        assert!(pipeline.render_board(&board, &mut surface).is_some());
    }

    #[test]
    fn test_same_elements_same_commands() {
        let elements = vec![rect(None), rect(Some(SerializableColor::black()))];
        let decoded = inkroom_core::elements::decode_snapshot(
            &inkroom_core::elements::encode_snapshot(&elements),
        );
        let pipeline = RenderPipeline::new();
        let (mut a, mut b) = (RecordingSurface::new(), RecordingSurface::new());
        pipeline.render(&elements, &mut a);
        pipeline.render(&decoded, &mut b);
        assert_eq!(a.commands(), b.commands());
    }
}
