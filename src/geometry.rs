//! Circle generation and viewport framing for overlay rendering

use crate::core::{
    DEFAULT_VIEWPORT_HALF_EXTENT_M, MIN_VIEWPORT_PADDING_M, VIEWPORT_PADDING_FRACTION,
};
use nalgebra::Point2;
use serde::Serialize;
use std::f64::consts::PI;

/// Axis-aligned viewport for rendering a set of overlay primitives
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Viewport {
    /// Fallback viewport used when there is nothing to frame.
    /// Callers treat "no data" as a valid, renderable state.
    pub fn default_box() -> Self {
        Self {
            x_min: -DEFAULT_VIEWPORT_HALF_EXTENT_M,
            x_max: DEFAULT_VIEWPORT_HALF_EXTENT_M,
            y_min: -DEFAULT_VIEWPORT_HALF_EXTENT_M,
            y_max: DEFAULT_VIEWPORT_HALF_EXTENT_M,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn contains(&self, point: &Point2<f64>) -> bool {
        point.x >= self.x_min
            && point.x <= self.x_max
            && point.y >= self.y_min
            && point.y <= self.y_max
    }
}

/// Generates `segments` points evenly spaced by angle on the circle of the
/// given radius around `center`. Point `i` sits at angle `2π·i/segments`.
///
/// # Panics
///
/// Panics if `segments < 3`; anything smaller does not describe a circle.
pub fn circle_points(center: Point2<f64>, radius: f64, segments: usize) -> Vec<Point2<f64>> {
    assert!(segments >= 3, "a circle needs at least 3 segments");

    (0..segments)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / segments as f64;
            Point2::new(
                center.x + radius * theta.cos(),
                center.y + radius * theta.sin(),
            )
        })
        .collect()
}

/// Computes the tight bounding box of `points` and expands each axis
/// symmetrically by `max(min_padding, range_fraction · axis_range)`.
///
/// A single point (or coincident points) therefore still yields a box of
/// positive area, and wide spreads get padding proportional to their range.
/// An empty input returns [`Viewport::default_box`].
pub fn bounding_box_with_padding(
    points: &[Point2<f64>],
    min_padding: f64,
    range_fraction: f64,
) -> Viewport {
    if points.is_empty() {
        return Viewport::default_box();
    }

    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for p in points {
        x_min = x_min.min(p.x);
        x_max = x_max.max(p.x);
        y_min = y_min.min(p.y);
        y_max = y_max.max(p.y);
    }

    let x_pad = min_padding.max(range_fraction * (x_max - x_min));
    let y_pad = min_padding.max(range_fraction * (y_max - y_min));

    Viewport {
        x_min: x_min - x_pad,
        x_max: x_max + x_pad,
        y_min: y_min - y_pad,
        y_max: y_max + y_pad,
    }
}

/// Bounding box with the default padding parameters.
pub fn bounding_box(points: &[Point2<f64>]) -> Viewport {
    bounding_box_with_padding(points, MIN_VIEWPORT_PADDING_M, VIEWPORT_PADDING_FRACTION)
}
