//! Hand-drawn rendering artifact for shapes.

use kurbo::{BezPath, PathEl, Point};

/// Roughness used for every shape on the canvas.
pub const DEFAULT_ROUGHNESS: f64 = 1.0;

/// Simple seeded random number generator (xorshift32).
struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    fn new(seed: u32) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Random float in range [-1, 1]
    fn next_f64(&mut self) -> f64 {
        (self.next_u32() as f64 / u32::MAX as f64) * 2.0 - 1.0
    }

    fn offset(&mut self, amount: f64) -> f64 {
        self.next_f64() * amount
    }

    fn wobble(&mut self, p: Point, amount: f64) -> Point {
        Point::new(p.x + self.offset(amount), p.y + self.offset(amount))
    }
}

/// Pre-computed sketchy paths for a shape: two jittered strokes drawn on top
/// of each other plus a slightly jittered fill region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sketch {
    pub strokes: [BezPath; 2],
    pub fill: BezPath,
}

impl Sketch {
    /// Generate the sketch of `path`. The same inputs always produce the same
    /// output.
    pub fn generate(path: &BezPath, roughness: f64, seed: u32) -> Self {
        Self {
            strokes: [
                jitter(path, roughness, seed, 0),
                jitter(path, roughness, seed, 1),
            ],
            fill: jitter(path, roughness * 0.3, seed, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strokes[0].elements().is_empty()
    }
}

/// Endpoints are offset so lines overshoot at corners, straight segments get
/// a bow proportional to their length. `stroke_index` selects an independent
/// random sequence.
fn jitter(path: &BezPath, roughness: f64, seed: u32, stroke_index: u32) -> BezPath {
    if roughness <= 0.0 {
        return path.clone();
    }

    let max_offset = roughness * 2.0;
    let bowing = roughness;

    let mut rng = SimpleRng::new(seed.wrapping_add(stroke_index.wrapping_mul(99991)));
    let mut result = BezPath::new();
    let mut last = Point::ZERO;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                result.move_to(rng.wobble(p, max_offset));
                last = p;
            }
            PathEl::LineTo(p) => {
                let d = p - last;
                let len = d.hypot();
                let bow = rng.offset(bowing * roughness * len / 200.0);
                let perp = if len > 0.001 {
                    kurbo::Vec2::new(-d.y / len, d.x / len)
                } else {
                    kurbo::Vec2::ZERO
                };
                let ctrl = last.midpoint(p) + perp * bow;
                result.quad_to(ctrl, rng.wobble(p, max_offset));
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                result.quad_to(rng.wobble(p1, max_offset * 0.7), rng.wobble(p2, max_offset));
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                result.curve_to(
                    rng.wobble(p1, max_offset * 0.5),
                    rng.wobble(p2, max_offset * 0.5),
                    rng.wobble(p3, max_offset),
                );
                last = p3;
            }
            PathEl::ClosePath => result.close_path(),
        }
    }

    result
}
