//! Arrow element: a shaft with a two-stroke head at the far end.

use super::{
    DEFAULT_ROUGHNESS, ElementId, ElementStyle, ElementTrait, Sketch, point_to_segment_dist,
};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Length of each head stroke.
pub const ARROW_HEAD_LENGTH: f64 = 20.0;
/// Angle between the shaft and each head stroke.
pub const ARROW_HEAD_ANGLE: f64 = PI / 6.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
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

impl Arrow {
    pub fn new(id: ElementId, start: Point, end: Point, style: ElementStyle) -> Self {
        let mut arrow = Self {
            id,
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            style,
            sketch: Sketch::default(),
        };
        arrow.refresh();
        arrow
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    /// The two outer points of the head.
    pub fn head_points(&self) -> (Point, Point) {
        let (start, end) = (self.start(), self.end());
        let angle = (end.y - start.y).atan2(end.x - start.x);
        let barb = |theta: f64| {
            Point::new(
                end.x - ARROW_HEAD_LENGTH * theta.cos(),
                end.y - ARROW_HEAD_LENGTH * theta.sin(),
            )
        };
        (barb(angle - ARROW_HEAD_ANGLE), barb(angle + ARROW_HEAD_ANGLE))
    }

    fn to_path(&self) -> BezPath {
        let (left, right) = self.head_points();
        let mut path = BezPath::new();
        path.move_to(self.start());
        path.line_to(self.end());
        path.move_to(left);
        path.line_to(self.end());
        path.line_to(right);
        path
    }
}

impl ElementTrait for Arrow {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let (left, right) = self.head_points();
        Rect::from_points(self.start(), self.end())
            .union_pt(left)
            .union_pt(right)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_segment_dist(point, self.start(), self.end()) <= tolerance + self.style.size / 2.0
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

    #[test]
    fn test_head_points() {
        let arrow = Arrow::new(
            Uuid::new_v4(),
            Point::ZERO,
            Point::new(100.0, 0.0),
            ElementStyle::default(),
        );
        let (left, right) = arrow.head_points();
        let expected_x = 100.0 - ARROW_HEAD_LENGTH * ARROW_HEAD_ANGLE.cos();
        assert!((left.x - expected_x).abs() < 1e-9);
        assert!((right.x - expected_x).abs() < 1e-9);
        assert!((left.y + right.y).abs() < 1e-9);
        assert!((left.y.abs() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test_shaft() {
        let arrow = Arrow::new(
            Uuid::new_v4(),
            Point::ZERO,
            Point::new(0.0, 100.0),
            ElementStyle::default(),
        );
        assert!(arrow.hit_test(Point::new(2.0, 50.0), 5.0));
        assert!(!arrow.hit_test(Point::new(30.0, 50.0), 5.0));
    }
}
