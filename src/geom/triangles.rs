use crate::geom::point2d::Point2D;
use serde::{Deserialize, Serialize};

/// Type for holding vertex indices for a triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriangleIndex(pub usize, pub usize, pub usize);

impl TriangleIndex {
    pub fn as_array(&self) -> [usize; 3] {
        [self.0, self.1, self.2]
    }
}

/// Signed area of a planar triangle; positive for counter-clockwise order.
pub fn triangle_signed_area(p0: Point2D, p1: Point2D, p2: Point2D) -> f64 {
    0.5 * ((p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y))
}

pub fn triangle_centroid(p0: Point2D, p1: Point2D, p2: Point2D) -> Point2D {
    Point2D::new((p0.x + p1.x + p2.x) / 3., (p0.y + p1.y + p2.y) / 3.)
}
