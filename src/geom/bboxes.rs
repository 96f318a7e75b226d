use crate::geom::point::Point;
use crate::geom::point2d::Point2D;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the horizontal plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox2D {
    pub min: Point2D,
    pub max: Point2D,
}

impl BoundingBox2D {
    pub fn new(min: Point2D, max: Point2D) -> Self {
        Self { min, max }
    }

    /// Smallest box holding all points. Returns None for an empty slice.
    pub fn from_points(pts: &[Point2D]) -> Option<Self> {
        let first = pts.first()?;
        let mut bbox = Self::new(*first, *first);
        for p in &pts[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Checks containment, boundary included, with tolerance `tol`.
    pub fn contains(&self, p: Point2D, tol: f64) -> bool {
        p.x >= self.min.x - tol
            && p.x <= self.max.x + tol
            && p.y >= self.min.y - tol
            && p.y <= self.max.y + tol
    }

    /// Checks whether `other` lies fully inside this box.
    pub fn contains_box(&self, other: &Self, tol: f64) -> bool {
        self.contains(other.min, tol) && self.contains(other.max, tol)
    }

    /// Checks whether two boxes overlap (touching included).
    pub fn overlaps(&self, other: &Self, tol: f64) -> bool {
        !(self.max.x < other.min.x - tol
            || self.min.x > other.max.x + tol
            || self.max.y < other.min.y - tol
            || self.min.y > other.max.y + tol)
    }

    /// Which sides `p` lies on (within `tol`), in the order
    /// `[min.x, max.x, min.y, max.y]`. A corner lies on two sides.
    pub fn sides_at(&self, p: Point2D, tol: f64) -> [bool; 4] {
        [
            (p.x - self.min.x).abs() <= tol,
            (p.x - self.max.x).abs() <= tol,
            (p.y - self.min.y).abs() <= tol,
            (p.y - self.max.y).abs() <= tol,
        ]
    }

    /// True if `p` lies on one of the four sides (within `tol`).
    pub fn is_on_boundary(&self, p: Point2D, tol: f64) -> bool {
        self.sides_at(p, tol).contains(&true)
    }
}

/// Returns the min and max corners of the box holding all points `pts`.
///
/// Returns None for an empty slice.
pub fn bounding_box(pts: &[Point]) -> Option<(Point, Point)> {
    let first = *pts.first()?;
    Some(pts[1..].iter().fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
        )
    }))
}
