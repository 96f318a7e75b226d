//! Mesh representations: planar triangulations, surface meshes and
//! layered tetrahedral volume meshes.

pub mod mesh2d;
pub mod volume;

use crate::Point;
use crate::TriangleIndex;
use serde::{Deserialize, Serialize};

pub use mesh2d::Mesh2D;
pub use volume::VolumeMesh;

/// Cell marker of halo triangles (ground touching a building).
pub const HALO: i32 = -1;
/// Cell marker of plain ground triangles.
pub const GROUND: i32 = -2;
/// Cell marker of volume cells not attached to the ground surface.
pub const INTERIOR: i32 = -3;

/// A triangulated surface in 3D.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Point>,
    pub faces: Vec<TriangleIndex>,
}

impl Mesh {
    pub fn new(vertices: Vec<Point>, faces: Vec<TriangleIndex>) -> Self {
        Self { vertices, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Total area of all faces.
    pub fn area(&self) -> f64 {
        self.faces
            .iter()
            .map(|f| {
                let p0 = self.vertices[f.0];
                let v1 = self.vertices[f.1] - p0;
                let v2 = self.vertices[f.2] - p0;
                0.5 * v1.cross(v2).length()
            })
            .sum()
    }
}
