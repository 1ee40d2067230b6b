//! Vello-based surface implementation.

use crate::renderer::{RenderResult, RendererError, Surface, TextRun};
use kurbo::{Affine, BezPath, Cap, Join, Rect, Stroke};
use parley::layout::PositionedLayoutItem;
use parley::{FontContext, LayoutContext, StyleProperty};
use peniko::{Brush, Color, Fill};
use vello::Scene;

/// Surface that builds a Vello scene for GPU rasterization.
pub struct VelloSurface {
    /// The Vello scene being built.
    scene: Scene,
    /// Frame scene set aside while a single element is painted into `scene`.
    frame: Option<Scene>,
    /// Font context for text rendering (cached across frames).
    font_cx: FontContext,
    layout_cx: LayoutContext<Brush>,
    /// Canvas-to-screen transform applied to everything drawn.
    transform: Affine,
    /// Area painted by `clear`, in canvas units.
    viewport: Rect,
    background: Color,
}

impl Default for VelloSurface {
    fn default() -> Self {
        Self::new(Rect::new(0.0, 0.0, 1920.0, 1080.0))
    }
}

impl VelloSurface {
    pub fn new(viewport: Rect) -> Self {
        Self {
            scene: Scene::new(),
            frame: None,
            font_cx: FontContext::new(),
            layout_cx: LayoutContext::new(),
            transform: Affine::IDENTITY,
            viewport,
            background: Color::WHITE,
        }
    }

    /// Register an extra font, e.g. the handwriting face.
    pub fn register_font(&mut self, data: Vec<u8>) {
        self.font_cx
            .collection
            .register_fonts(vello::peniko::Blob::new(std::sync::Arc::new(data)), None);
    }

    pub fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Background of the last `clear`, for the render pass base color.
    pub fn background(&self) -> Color {
        self.background
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        std::mem::take(&mut self.scene)
    }
}

impl Surface for VelloSurface {
    fn clear(&mut self, background: Color) {
        self.frame = None;
        self.scene.reset();
        self.background = background;
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, background, None, &self.viewport);
    }

    fn stroke_path(&mut self, path: &BezPath, width: f64, color: Color) -> RenderResult<()> {
        let stroke = Stroke::new(width).with_caps(Cap::Round).with_join(Join::Round);
        self.scene.stroke(&stroke, self.transform, color, None, path);
        Ok(())
    }

    fn fill_path(&mut self, path: &BezPath, color: Color) -> RenderResult<()> {
        self.scene
            .fill(Fill::NonZero, self.transform, color, None, path);
        Ok(())
    }

    fn draw_text(&mut self, run: &TextRun<'_>) -> RenderResult<()> {
        let brush = Brush::Solid(run.color);

        let mut builder = self
            .layout_cx
            .ranged_builder(&mut self.font_cx, run.text, 1.0, false);
        builder.push_default(StyleProperty::FontSize(run.size as f32));
        builder.push_default(StyleProperty::Brush(brush.clone()));
        builder.push_default(StyleProperty::FontStack(parley::FontStack::Single(
            parley::FontFamily::Named(run.family.into()),
        )));
        let mut layout = builder.build(run.text);
        layout.break_all_lines(None);
        layout.align(None, parley::Alignment::Start, parley::AlignmentOptions::default());

        // Parley lays out with y=0 at the top of the first line.
        let text_transform = self.transform * Affine::translate((run.origin.x, run.origin.y));
        let mut glyph_count = 0;

        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(glyph_run) = item else {
                    continue;
                };
                let mut x = glyph_run.offset();
                let y = glyph_run.baseline();
                let glyph_font_run = glyph_run.run();
                let synthesis = glyph_font_run.synthesis();
                let glyph_xform = synthesis
                    .skew()
                    .map(|angle| Affine::skew(angle.to_radians().tan() as f64, 0.0));

                let glyphs: Vec<vello::Glyph> = glyph_run
                    .glyphs()
                    .map(|glyph| {
                        let gx = x + glyph.x;
                        let gy = y - glyph.y;
                        x += glyph.advance;
                        vello::Glyph {
                            id: glyph.id,
                            x: gx,
                            y: gy,
                        }
                    })
                    .collect();
                glyph_count += glyphs.len();

                if !glyphs.is_empty() {
                    self.scene
                        .draw_glyphs(glyph_font_run.font())
                        .brush(&brush)
                        .hint(true)
                        .transform(text_transform)
                        .glyph_transform(glyph_xform)
                        .font_size(glyph_font_run.font_size())
                        .normalized_coords(glyph_font_run.normalized_coords())
                        .draw(Fill::NonZero, glyphs.into_iter());
                }
            }
        }

        if glyph_count == 0 {
            return Err(RendererError::RenderFailed(format!(
                "no glyphs for {:?} in font family {}",
                run.text, run.family
            )));
        }
        Ok(())
    }

    fn begin_element(&mut self) {
        if self.frame.is_some() {
            self.end_element(true);
        }
        self.frame = Some(std::mem::take(&mut self.scene));
    }

    fn end_element(&mut self, keep: bool) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        let element = std::mem::replace(&mut self.scene, frame);
        if keep {
            self.scene.append(&element, None);
        }
    }
}
