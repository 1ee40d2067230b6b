//! Element definitions for the shared canvas.

mod arrow;
mod brush;
mod circle;
mod line;
mod outline;
mod rectangle;
mod sketch;
mod text;

pub use arrow::{ARROW_HEAD_ANGLE, ARROW_HEAD_LENGTH, Arrow};
pub use brush::Brush;
pub use circle::Circle;
pub use line::Line;
pub use outline::{OutlineOptions, outline_path, stroke_outline};
pub use rectangle::Rectangle;
pub use sketch::{DEFAULT_ROUGHNESS, Sketch};
pub use text::{DEFAULT_TEXT_SIZE, TEXT_FONT_FAMILY, Text};

use kurbo::{Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for elements.
pub type ElementId = Uuid;

/// Errors raised while decoding elements from the wire.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("invalid color `{0}`")]
    InvalidColor(String),
    #[error("malformed element: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("element {0} has non-finite geometry")]
    NonFinite(ElementId),
}

/// RGBA8 color, encoded on the wire as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn parse(hex: &str) -> Result<Self, ElementError> {
        let invalid = || ElementError::InvalidColor(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.is_ascii() {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
        match digits.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&digits[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::new(nibble(0)?, nibble(1)?, nibble(2)?, 255))
            }
            6 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, 255)),
            8 => Ok(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(invalid()),
        }
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl TryFrom<String> for SerializableColor {
    type Error = ElementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SerializableColor> for String {
    fn from(color: SerializableColor) -> Self {
        color.to_hex()
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Style properties carried by every element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    /// Stroke color (also the brush fill and the text color).
    #[serde(default = "SerializableColor::black")]
    pub stroke: SerializableColor,
    /// Fill color for closed shapes (None = no fill).
    #[serde(default)]
    pub fill: Option<SerializableColor>,
    /// Stroke width; brush diameter; font size for text.
    pub size: f64,
    /// Seed for the hand-drawn effect. Zero means "derive from the id".
    #[serde(default)]
    pub seed: u32,
}

impl ElementStyle {
    pub fn stroke(&self) -> Color {
        self.stroke.into()
    }

    pub fn fill(&self) -> Option<Color> {
        self.fill.map(Color::from)
    }
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self {
            stroke: SerializableColor::black(),
            fill: None,
            size: 1.0,
            seed: 0,
        }
    }
}

/// Derive a stable sketch seed from an element id (splitmix32 mixing).
///
/// Every session decoding the same snapshot gets the same seed, so sketches
/// render identically everywhere.
pub fn seed_from_id(id: ElementId) -> u32 {
    let (hi, lo) = id.as_u64_pair();
    let folded = (hi ^ lo.rotate_left(32)) as u32 ^ ((hi ^ lo) >> 32) as u32;
    let mut x = folded.wrapping_add(0x9E3779B9);
    x ^= x >> 16;
    x = x.wrapping_mul(0x85EBCA6B);
    x ^= x >> 13;
    x = x.wrapping_mul(0xC2B2AE35);
    x ^= x >> 16;
    x.max(1)
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (point - (a + seg * t)).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [single] => (point - *single).hypot(),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Element kinds, matching the `type` tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementKind {
    Line,
    Rectangle,
    Circle,
    Arrow,
    Brush,
    Text,
}

/// Common behaviour of every element kind.
pub trait ElementTrait {
    /// Get the unique identifier.
    fn id(&self) -> ElementId;

    /// Get the bounding box in canvas coordinates.
    fn bounds(&self) -> Rect;

    /// Check if a point hits this element, for the eraser.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    fn style(&self) -> &ElementStyle;

    /// Move the geometry to follow the pointer while drawing.
    fn drag_to(&mut self, point: Point);

    /// Rebuild the derived render artifact from geometry and style.
    fn refresh(&mut self);
}

/// A drawable element of the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Element {
    Line(Line),
    Rectangle(Rectangle),
    Circle(Circle),
    Arrow(Arrow),
    Brush(Brush),
    Text(Text),
}

macro_rules! dispatch {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            Element::Line($e) => $body,
            Element::Rectangle($e) => $body,
            Element::Circle($e) => $body,
            Element::Arrow($e) => $body,
            Element::Brush($e) => $body,
            Element::Text($e) => $body,
        }
    };
}

impl Element {
    /// Create a new element of `kind` anchored at `anchor`.
    pub fn create(kind: ElementKind, anchor: Point, style: ElementStyle) -> Self {
        Self::create_with_id(Uuid::new_v4(), kind, anchor, style)
    }

    pub fn create_with_id(
        id: ElementId,
        kind: ElementKind,
        anchor: Point,
        mut style: ElementStyle,
    ) -> Self {
        if style.seed == 0 {
            style.seed = seed_from_id(id);
        }
        match kind {
            ElementKind::Line => Element::Line(Line::new(id, anchor, anchor, style)),
            ElementKind::Rectangle => {
                Element::Rectangle(Rectangle::new(id, anchor, anchor, style))
            }
            ElementKind::Circle => Element::Circle(Circle::new(id, anchor, anchor, style)),
            ElementKind::Arrow => Element::Arrow(Arrow::new(id, anchor, anchor, style)),
            ElementKind::Brush => Element::Brush(Brush::new(id, anchor, style)),
            ElementKind::Text => Element::Text(Text::new(id, anchor, String::new(), style)),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Line(_) => ElementKind::Line,
            Element::Rectangle(_) => ElementKind::Rectangle,
            Element::Circle(_) => ElementKind::Circle,
            Element::Arrow(_) => ElementKind::Arrow,
            Element::Brush(_) => ElementKind::Brush,
            Element::Text(_) => ElementKind::Text,
        }
    }

    pub fn id(&self) -> ElementId {
        dispatch!(self, e => e.id())
    }

    pub fn bounds(&self) -> Rect {
        dispatch!(self, e => e.bounds())
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        dispatch!(self, e => e.hit_test(point, tolerance))
    }

    pub fn style(&self) -> &ElementStyle {
        dispatch!(self, e => e.style())
    }

    /// Apply a pointer move to the in-progress element.
    pub fn update(&mut self, point: Point) {
        dispatch!(self, e => {
            e.drag_to(point);
            e.refresh();
        })
    }

    /// Freeze the geometry once the pointer is released.
    pub fn finalize(&mut self) {
        if let Element::Brush(brush) = self {
            brush.dedup_samples();
        }
        self.refresh();
    }

    pub fn refresh(&mut self) {
        dispatch!(self, e => e.refresh())
    }

    /// Whether every coordinate of the element is finite.
    pub fn is_finite(&self) -> bool {
        let bounds = self.bounds();
        bounds.is_finite() && self.style().size.is_finite()
    }

    /// Encode the element as a raw JSON value for the wire.
    pub fn to_value(&self) -> Result<serde_json::Value, ElementError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a single element and rebuild its render artifact.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ElementError> {
        let mut element: Element = serde_json::from_value(value.clone())?;
        element.normalize();
        if !element.is_finite() {
            return Err(ElementError::NonFinite(element.id()));
        }
        Ok(element)
    }

    fn normalize(&mut self) {
        let id = self.id();
        let style = dispatch!(self, e => &mut e.style);
        if style.seed == 0 {
            style.seed = seed_from_id(id);
        }
        self.refresh();
    }
}

/// Decode a wire snapshot, skipping malformed, unknown or duplicate entries.
pub fn decode_snapshot(values: &[serde_json::Value]) -> Vec<Element> {
    let mut seen = HashSet::with_capacity(values.len());
    let mut elements = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        match Element::from_value(&with_positional_id(value, index)) {
            Ok(element) => {
                if seen.insert(element.id()) {
                    elements.push(element);
                } else {
                    log::warn!("Skipping duplicate element {} at index {}", element.id(), index);
                }
            }
            Err(e) => log::warn!("Skipping element at index {}: {}", index, e),
        }
    }
    elements
}

/// Entries written without an id (or with a numeric one) get an id derived
/// from their position, so every session decoding the snapshot agrees on it.
fn with_positional_id(value: &serde_json::Value, index: usize) -> Cow<'_, serde_json::Value> {
    match value.as_object() {
        Some(map) if map.get("id").is_none_or(|id| id.is_null() || id.is_number()) => {
            let mut map = map.clone();
            let id = Uuid::from_u128(index as u128 + 1);
            map.insert("id".to_string(), serde_json::Value::String(id.to_string()));
            Cow::Owned(serde_json::Value::Object(map))
        }
        _ => Cow::Borrowed(value),
    }
}

/// Encode a canvas state for the wire.
pub fn encode_snapshot(elements: &[Element]) -> Vec<serde_json::Value> {
    elements
        .iter()
        .filter_map(|element| match element.to_value() {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("Failed to encode element {}: {}", element.id(), e);
                None
            }
        })
        .collect()
}
