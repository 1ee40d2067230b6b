//! Rectangle element.

use super::{
    DEFAULT_ROUGHNESS, ElementId, ElementStyle, ElementTrait, Sketch, point_to_segment_dist,
};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle spanned by two corner points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: ElementId,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(flatten)]
    pub style: ElementStyle,
    #[serde(skip)]
    sketch: Sketch,
}

impl Rectangle {
    pub fn new(id: ElementId, corner: Point, opposite: Point, style: ElementStyle) -> Self {
        let mut rect = Self {
            id,
            x1: corner.x,
            y1: corner.y,
            x2: opposite.x,
            y2: opposite.y,
            style,
            sketch: Sketch::default(),
        };
        rect.refresh();
        rect
    }

    /// Get the rectangle as a kurbo Rect, whatever the drag direction.
    pub fn as_rect(&self) -> Rect {
        Rect::new(self.x1, self.y1, self.x2, self.y2).abs()
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    fn corners(&self) -> [Point; 4] {
        let r = self.as_rect();
        [
            Point::new(r.x0, r.y0),
            Point::new(r.x1, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        ]
    }

    fn to_path(&self) -> BezPath {
        let corners = self.corners();
        let mut path = BezPath::new();
        path.move_to(corners[0]);
        for corner in &corners[1..] {
            path.line_to(*corner);
        }
        path.line_to(corners[0]);
        path.close_path();
        path
    }
}

impl ElementTrait for Rectangle {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    /// Only the border counts, filled or not.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.size / 2.0;
        let c = self.corners();
        (0..4).any(|i| point_to_segment_dist(point, c[i], c[(i + 1) % 4]) <= reach)
    }

    fn style(&self) -> &ElementStyle {
        &self.style
    }

    fn drag_to(&mut self, point: Point) {
        self.x2 = point.x;
        self.y2 = point.y;
    }

    fn refresh(&mut self) {
        self.sketch = Sketch::generate(&self.to_path(), DEFAULT_ROUGHNESS, self.style.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn rect(a: Point, b: Point) -> Rectangle {
        Rectangle::new(Uuid::new_v4(), a, b, ElementStyle::default())
    }

    #[test]
    fn test_as_rect_from_any_drag_direction() {
        let r = rect(Point::new(100.0, 100.0), Point::new(50.0, 50.0));
        assert_eq!(r.as_rect(), Rect::new(50.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn test_hit_test_edges_only() {
        let r = rect(Point::ZERO, Point::new(100.0, 100.0));
        assert!(r.hit_test(Point::new(0.0, 50.0), 5.0));
        assert!(r.hit_test(Point::new(103.0, 50.0), 5.0));
        assert!(r.hit_test(Point::new(50.0, 98.0), 5.0));
        assert!(!r.hit_test(Point::new(50.0, 50.0), 5.0));
        assert!(!r.hit_test(Point::new(150.0, 50.0), 5.0));
    }

    #[test]
    fn test_sketch_is_closed_path() {
        let r = rect(Point::ZERO, Point::new(10.0, 10.0));
        assert!(!r.sketch().is_empty());
        assert_eq!(r.sketch().strokes[0].elements().len(), 6);
    }
}
