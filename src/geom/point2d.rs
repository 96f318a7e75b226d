use crate::geom::EPS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// Point in the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EPS && (self.y - other.y).abs() < EPS
    }

    pub fn distance(&self, other: &Self) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Distance to the closed segment `a`-`b`.
    pub fn distance_to_segment(&self, a: Self, b: Self) -> f64 {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let len2 = dx * dx + dy * dy;
        if len2 < EPS {
            return self.distance(&a);
        }
        let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / len2).clamp(0.0, 1.0);
        self.distance(&Self::new(a.x + t * dx, a.y + t * dy))
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2);
        write!(f, "Point2D({:.prec$}, {:.prec$})", self.x, self.y, prec = prec)
    }
}

/// Componentwise difference, returned as a point.
impl Sub for Point2D {
    type Output = Point2D;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point2D::new(0., 0.);
        let b = Point2D::new(3., 4.);
        assert!((a.distance(&b) - 5.).abs() < 1e-12);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point2D::new(0., 0.);
        let b = Point2D::new(10., 0.);
        assert!((Point2D::new(5., 2.).distance_to_segment(a, b) - 2.).abs() < 1e-12);
        // Beyond the end the distance is measured to the endpoint.
        assert!((Point2D::new(13., 4.).distance_to_segment(a, b) - 5.).abs() < 1e-12);
        assert!(Point2D::new(3., 0.).distance_to_segment(a, b) < 1e-12);
    }
}
