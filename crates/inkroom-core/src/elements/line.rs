//! Straight line element.

use super::{
    DEFAULT_ROUGHNESS, ElementId, ElementStyle, ElementTrait, Sketch, point_to_segment_dist,
};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// A line between two corner points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
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

impl Line {
    pub fn new(id: ElementId, start: Point, end: Point, style: ElementStyle) -> Self {
        let mut line = Self {
            id,
            x1: start.x,
            y1: start.y,
            x2: end.x,
            y2: end.y,
            style,
            sketch: Sketch::default(),
        };
        line.refresh();
        line
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

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(self.start());
        path.line_to(self.end());
        path
    }
}

impl ElementTrait for Line {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_points(self.start(), self.end())
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

    fn line(x2: f64, y2: f64) -> Line {
        Line::new(Uuid::new_v4(), Point::ZERO, Point::new(x2, y2), ElementStyle::default())
    }

    #[test]
    fn test_hit_test() {
        let line = line(100.0, 0.0);
        assert!(line.hit_test(Point::new(50.0, 3.0), 5.0));
        assert!(!line.hit_test(Point::new(50.0, 20.0), 5.0));
        assert!(!line.hit_test(Point::new(120.0, 0.0), 5.0));
    }

    #[test]
    fn test_bounds_normalized() {
        let line = line(-10.0, 20.0);
        let b = line.bounds();
        assert_eq!(b, Rect::new(-10.0, 0.0, 0.0, 20.0));
    }

    #[test]
    fn test_drag_rebuilds_sketch() {
        let mut line = line(10.0, 10.0);
        let before = line.sketch().clone();
        line.drag_to(Point::new(80.0, 40.0));
        line.refresh();
        assert_ne!(&before, line.sketch());
    }
}
