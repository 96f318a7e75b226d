use crate::MeshError;
use crate::TriangleIndex;
use crate::geom::mesh::GROUND;
use crate::geom::point2d::Point2D;
use crate::geom::triangles::{triangle_centroid, triangle_signed_area};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Planar triangulation with one domain marker per triangle.
///
/// Markers are the building index (`>= 0`), [`crate::geom::mesh::HALO`]
/// or [`GROUND`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh2D {
    pub vertices: Vec<Point2D>,
    pub triangles: Vec<TriangleIndex>,
    pub markers: Vec<i32>,
}

impl Mesh2D {
    /// Creates a mesh with every triangle marked as ground.
    pub fn new(vertices: Vec<Point2D>, triangles: Vec<TriangleIndex>) -> Self {
        let markers = vec![GROUND; triangles.len()];
        Self {
            vertices,
            triangles,
            markers,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangle_points(&self, t: usize) -> [Point2D; 3] {
        let tri = self.triangles[t];
        [
            self.vertices[tri.0],
            self.vertices[tri.1],
            self.vertices[tri.2],
        ]
    }

    pub fn centroid(&self, t: usize) -> Point2D {
        let [p0, p1, p2] = self.triangle_points(t);
        triangle_centroid(p0, p1, p2)
    }

    pub fn area(&self, t: usize) -> f64 {
        let [p0, p1, p2] = self.triangle_points(t);
        triangle_signed_area(p0, p1, p2).abs()
    }

    pub fn total_area(&self) -> f64 {
        (0..self.triangles.len()).map(|t| self.area(t)).sum()
    }

    /// Checks index bounds, marker count and triangle areas.
    pub fn validate(&self, min_area: f64) -> Result<()> {
        if self.markers.len() != self.triangles.len() {
            return Err(MeshError::Config(format!(
                "{} markers for {} triangles",
                self.markers.len(),
                self.triangles.len()
            ))
            .into());
        }
        let n = self.vertices.len();
        for (t, tri) in self.triangles.iter().enumerate() {
            if tri.as_array().iter().any(|&v| v >= n) {
                return Err(MeshError::Geometry(format!(
                    "triangle {t} references a vertex out of range ({n} vertices)"
                ))
                .into());
            }
            let area = self.area(t);
            if area <= min_area {
                return Err(MeshError::DegenerateTriangle { triangle: t, area }.into());
            }
        }
        Ok(())
    }
}
