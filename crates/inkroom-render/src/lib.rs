//! Inkroom Render Library
//!
//! Render pipeline for canvas elements and the surfaces it paints into.
//! The Vello surface is behind the `vello-renderer` feature.

mod pipeline;
mod recording;
mod renderer;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use pipeline::{FrameReport, RenderPipeline, draw_element};
pub use recording::{DrawCommand, RecordingSurface};
pub use renderer::{RenderResult, RendererError, Surface, TextRun};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloSurface;
