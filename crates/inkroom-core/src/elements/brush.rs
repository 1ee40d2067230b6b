//! Freehand brush stroke.

use super::{
    ElementId, ElementStyle, ElementTrait, OutlineOptions, outline_path, point_to_polyline_dist,
    stroke_outline,
};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A freehand stroke: insertion-ordered pointer samples rendered as a filled
/// outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub(crate) id: ElementId,
    pub points: Vec<Point>,
    #[serde(flatten)]
    pub style: ElementStyle,
    #[serde(skip)]
    outline: BezPath,
}

impl Brush {
    pub fn new(id: ElementId, start: Point, style: ElementStyle) -> Self {
        Self::from_points(id, vec![start], style)
    }

    pub fn from_points(id: ElementId, points: Vec<Point>, style: ElementStyle) -> Self {
        let mut brush = Self {
            id,
            points,
            style,
            outline: BezPath::new(),
        };
        brush.refresh();
        brush
    }

    /// The filled outline path.
    pub fn outline(&self) -> &BezPath {
        &self.outline
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub(crate) fn dedup_samples(&mut self) {
        self.points.dedup();
    }

    fn options(&self) -> OutlineOptions {
        OutlineOptions::with_size(self.style.size)
    }
}

impl ElementTrait for Brush {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        if self.outline.elements().is_empty() {
            return self
                .points
                .first()
                .map(|p| Rect::from_points(*p, *p))
                .unwrap_or(Rect::ZERO);
        }
        self.outline.bounding_box()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.outline.contains(point) || point_to_polyline_dist(point, &self.points) <= tolerance
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn drag_to(&mut self, point: Point) {
        self.points.push(point);
    }

    fn refresh(&mut self) {
        self.outline = outline_path(&stroke_outline(&self.points, &self.options()));
    }
}
