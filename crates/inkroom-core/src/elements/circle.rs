//! Circle element: the ellipse inscribed in the dragged box.

use super::{DEFAULT_ROUGHNESS, ElementId, ElementStyle, ElementTrait, Sketch};
use kurbo::{BezPath, Ellipse, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
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

impl Circle {
    pub fn new(id: ElementId, corner: Point, opposite: Point, style: ElementStyle) -> Self {
        let mut circle = Self {
            id,
            x1: corner.x,
            y1: corner.y,
            x2: opposite.x,
            y2: opposite.y,
            style,
            sketch: Sketch::default(),
        };
        circle.refresh();
        circle
    }

    pub fn as_ellipse(&self) -> Ellipse {
        Ellipse::from_rect(self.bounds())
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    fn to_path(&self) -> BezPath {
        self.as_ellipse().to_path(0.1)
    }
}

impl ElementTrait for Circle {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.x1, self.y1, self.x2, self.y2).abs()
    }

    /// Proximity to the outline, measured along the ellipse's normalized radius.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let rect = self.bounds();
        let center = rect.center();
        let rx = rect.width() / 2.0;
        let ry = rect.height() / 2.0;
        let reach = tolerance + self.style.size / 2.0;
        if rx < f64::EPSILON || ry < f64::EPSILON {
            // Degenerate: treat as the segment it collapsed to.
            return super::point_to_segment_dist(
                point,
                Point::new(rect.x0, rect.y0),
                Point::new(rect.x1, rect.y1),
            ) <= reach;
        }
        let d = point - center;
        let norm = ((d.x / rx).powi(2) + (d.y / ry).powi(2)).sqrt();
        let radius_along = if norm > f64::EPSILON {
            d.hypot() / norm
        } else {
            rx.min(ry)
        };
        (d.hypot() - radius_along).abs() <= reach
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

    fn circle() -> Circle {
        Circle::new(
            Uuid::new_v4(),
            Point::ZERO,
            Point::new(100.0, 50.0),
            ElementStyle::default(),
        )
    }

    #[test]
    fn test_ellipse_inscribed() {
        let e = circle().as_ellipse();
        assert_eq!(e.center(), Point::new(50.0, 25.0));
        assert!((e.radii().x - 50.0).abs() < 1e-9);
        assert!((e.radii().y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test_outline() {
        let c = circle();
        assert!(c.hit_test(Point::new(0.0, 25.0), 3.0));
        assert!(c.hit_test(Point::new(50.0, 2.0), 3.0));
        assert!(!c.hit_test(Point::new(50.0, 25.0), 3.0));
        assert!(!c.hit_test(Point::new(120.0, 25.0), 3.0));
    }

    #[test]
    fn test_degenerate_circle() {
        let style = ElementStyle::default();
        let c = Circle::new(Uuid::new_v4(), Point::ZERO, Point::new(0.0, 40.0), style);
        assert!(c.hit_test(Point::new(1.0, 20.0), 3.0));
        assert!(!c.hit_test(Point::new(10.0, 20.0), 3.0));
    }
}
