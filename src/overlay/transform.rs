use super::{Point, Rect};

/// Independent per-axis mapping from source-video pixels to canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f64,
    pub y: f64,
}

impl Scale {
    pub fn new(canvas: (f64, f64), source: (f64, f64)) -> Self {
        Self {
            x: canvas.0 / non_zero(source.0),
            y: canvas.1 / non_zero(source.1),
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.x, p.y * self.y)
    }

    /// Corners may come in either order; the rect is anchored at the min corner.
    pub fn rect(&self, x1: f64, y1: f64, x2: f64, y2: f64) -> Rect {
        Rect {
            x: x1.min(x2) * self.x,
            y: y1.min(y2) * self.y,
            width: (x2 - x1).abs() * self.x,
            height: (y2 - y1).abs() * self.y,
        }
    }
}

/// First positive candidate, else 1.
pub fn source_dimension(declared: Option<f64>, native: Option<f64>) -> f64 {
    [declared, native]
        .into_iter()
        .flatten()
        .find(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(1.0)
}

fn non_zero(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 1.0 }
}
