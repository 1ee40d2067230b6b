//! Stroke-to-outline conversion for brush strokes.
//!
//! Samples are streamlined, pressure is simulated from the distance between
//! consecutive samples (faster strokes get thinner), and both ends get round
//! caps. The outline is then smoothed into a closed path with quadratic
//! segments through the midpoints of consecutive outline points. Everything
//! here is a pure function of its inputs.

use kurbo::{BezPath, Point, Vec2};
use std::f64::consts::PI;

/// How quickly simulated pressure follows the stroke speed.
const RATE_OF_PRESSURE_CHANGE: f64 = 0.275;

/// Shape of the outline around a brush stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineOptions {
    /// Base diameter of the stroke.
    pub size: f64,
    /// How much pressure affects the width, 0..1.
    pub thinning: f64,
    /// How much the samples are pulled towards their predecessors, 0..1.
    pub streamline: f64,
    /// Segments per round cap.
    pub cap_segments: usize,
}

impl OutlineOptions {
    pub fn with_size(size: f64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            size: 16.0,
            thinning: 0.5,
            streamline: 0.5,
            cap_segments: 8,
        }
    }
}

fn streamline(samples: &[Point], amount: f64) -> Vec<Point> {
    let t = 0.15 + (1.0 - amount.clamp(0.0, 1.0)) * 0.85;
    let mut points: Vec<Point> = Vec::with_capacity(samples.len());
    for &sample in samples {
        let next = match points.last() {
            Some(prev) => prev.lerp(sample, t),
            None => sample,
        };
        if points.last() != Some(&next) {
            points.push(next);
        }
    }
    points
}

fn radii(points: &[Point], options: &OutlineOptions) -> Vec<f64> {
    let size = options.size.max(f64::EPSILON);
    let mut pressure = 0.5;
    let mut radii = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            let distance = (*point - points[i - 1]).hypot();
            let speed = (distance / size).min(1.0);
            let target = 1.0 - speed;
            pressure = (pressure + (target - pressure) * speed * RATE_OF_PRESSURE_CHANGE).min(1.0);
        }
        let radius = size * (0.5 - options.thinning * (0.5 - pressure));
        radii.push(radius.max(0.01));
    }
    radii
}

fn direction_at(points: &[Point], i: usize) -> Vec2 {
    let prev = points[i.saturating_sub(1)];
    let next = points[(i + 1).min(points.len() - 1)];
    let d = next - prev;
    let len = d.hypot();
    if len > f64::EPSILON { d / len } else { Vec2::new(1.0, 0.0) }
}

/// Compute the outline polygon around a stroke.
pub fn stroke_outline(samples: &[Point], options: &OutlineOptions) -> Vec<Point> {
    let points = streamline(samples, options.streamline);
    let segments = options.cap_segments.max(2);
    match points.as_slice() {
        [] => Vec::new(),
        [dot] => {
            let radius = options.size.max(f64::EPSILON) / 2.0;
            let count = segments * 2;
            (0..count)
                .map(|k| {
                    let theta = 2.0 * PI * k as f64 / count as f64;
                    *dot + Vec2::new(theta.cos(), theta.sin()) * radius
                })
                .collect()
        }
        _ => {
            let radii = radii(&points, options);
            let normals: Vec<Vec2> = (0..points.len())
                .map(|i| direction_at(&points, i).turn_90())
                .collect();

            let last = points.len() - 1;
            let mut outline = Vec::with_capacity(points.len() * 2 + segments * 2);

            // Left side, forward.
            for i in 0..points.len() {
                outline.push(points[i] + normals[i] * radii[i]);
            }
            // End cap, from left to right around the tip.
            let end_dir = direction_at(&points, last);
            for k in 1..segments {
                let theta = PI * k as f64 / segments as f64;
                let offset = (normals[last] * theta.cos() + end_dir * theta.sin()) * radii[last];
                outline.push(points[last] + offset);
            }
            // Right side, backward.
            for i in (0..points.len()).rev() {
                outline.push(points[i] - normals[i] * radii[i]);
            }
            // Start cap, from right to left around the tail.
            let start_dir = direction_at(&points, 0);
            for k in 1..segments {
                let theta = PI * k as f64 / segments as f64;
                let offset = (-normals[0] * theta.cos() - start_dir * theta.sin()) * radii[0];
                outline.push(points[0] + offset);
            }
            outline
        }
    }
}

/// Smooth an outline polygon into a closed path, with quadratic segments
/// through the midpoints of consecutive outline points.
pub fn outline_path(outline: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = outline.first() else {
        return path;
    };
    path.move_to(first);
    for (i, &point) in outline.iter().enumerate() {
        let next = outline[(i + 1) % outline.len()];
        path.quad_to(point, point.midpoint(next));
    }
    path.close_path();
    path
}
