//! Planar polygons used as building footprints and domain boundaries.

use crate::MeshError;
use crate::geom::EPS;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::Point2D;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Simple polygon, implicitly closed (the last vertex connects to the first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point2D>,
}

impl Polygon {
    /// Creates a polygon, dropping a repeated closing vertex if present.
    ///
    /// Fails with [`MeshError::Geometry`] for fewer than 3 distinct vertices
    /// or a zero-area outline.
    pub fn new(mut vertices: Vec<Point2D>) -> Result<Self> {
        if vertices.len() > 1 && vertices[0].is_close(&vertices[vertices.len() - 1]) {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(MeshError::Geometry(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            ))
            .into());
        }
        let poly = Self { vertices };
        if poly.signed_area().abs() < EPS {
            return Err(MeshError::Geometry("polygon has zero area".to_string()).into());
        }
        Ok(poly)
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(bbox: &BoundingBox2D) -> Self {
        Self {
            vertices: vec![
                Point2D::new(bbox.min.x, bbox.min.y),
                Point2D::new(bbox.max.x, bbox.min.y),
                Point2D::new(bbox.max.x, bbox.max.y),
                Point2D::new(bbox.min.x, bbox.max.y),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterates over the closed chain of edges.
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area; positive for counter-clockwise orientation.
    pub fn signed_area(&self) -> f64 {
        0.5 * self
            .edges()
            .map(|(a, b)| a.x * b.y - b.x * a.y)
            .sum::<f64>()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounding_box(&self) -> BoundingBox2D {
        // A polygon always has at least one vertex
        BoundingBox2D::from_points(&self.vertices).unwrap_or_default()
    }

    /// Winding number of the outline around `p`, computed by summing
    /// quadrant transitions. Non-zero means `p` is inside.
    pub fn winding_number(&self, p: Point2D) -> i32 {
        let Some(&first) = self.vertices.first() else {
            return 0;
        };
        let mut q0 = first;
        let mut v0 = quadrant(q0, p);
        let mut total = 0;
        for i in 1..=self.vertices.len() {
            let q1 = self.vertices[i % self.vertices.len()];
            let v1 = quadrant(q1, p);
            let mut dv = v1 - v0;
            if dv == 3 {
                dv = -1;
            } else if dv == -3 {
                dv = 1;
            } else if dv == 2 || dv == -2 {
                // Diagonal jump: the edge crosses the horizontal through p
                // and its intersection decides the direction.
                let xx = q1.x - (q1.y - p.y) * ((q0.x - q1.x) / (q0.y - q1.y));
                if xx > p.x {
                    dv = -dv;
                }
            }
            total += dv;
            q0 = q1;
            v0 = v1;
        }
        total
    }

    /// Point-in-polygon test. Points exactly on an edge may go either way.
    pub fn contains(&self, p: Point2D) -> bool {
        self.winding_number(p) != 0
    }

    /// Distance from `p` to the nearest edge.
    pub fn distance_to_boundary(&self, p: Point2D) -> f64 {
        self.edges()
            .map(|(a, b)| p.distance_to_segment(a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// True if `p` is inside or within `tol` of the outline.
    pub fn contains_or_touches(&self, p: Point2D, tol: f64) -> bool {
        self.contains(p) || self.distance_to_boundary(p) <= tol
    }
}

/// Quadrant of `q` as seen from `p`, counted counter-clockwise from +x+y.
fn quadrant(q: Point2D, p: Point2D) -> i32 {
    if q.x > p.x {
        if q.y > p.y { 0 } else { 3 }
    } else if q.y > p.y {
        1
    } else {
        2
    }
}

/// True if the open segments `a0`-`a1` and `b0`-`b1` cross at a single
/// interior point.
pub fn segments_cross(a0: Point2D, a1: Point2D, b0: Point2D, b1: Point2D) -> bool {
    let orient = |p: Point2D, q: Point2D, r: Point2D| {
        (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
    };
    let d1 = orient(b0, b1, a0);
    let d2 = orient(b0, b1, a1);
    let d3 = orient(a0, a1, b0);
    let d4 = orient(a0, a1, b1);
    ((d1 > EPS && d2 < -EPS) || (d1 < -EPS && d2 > EPS))
        && ((d3 > EPS && d4 < -EPS) || (d3 < -EPS && d4 > EPS))
}
