use crate::MeshError;
use crate::Point;
use crate::geom::bboxes::bounding_box;
use crate::geom::tetrahedron::{TetrahedronIndex, tetrahedron_signed_volume};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Layered tetrahedral mesh with one domain marker per cell.
///
/// Only the first tetrahedron of each prism on the ground surface carries
/// the 2D marker of its triangle; every other cell is
/// [`crate::geom::mesh::INTERIOR`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeMesh {
    pub vertices: Vec<Point>,
    pub cells: Vec<TetrahedronIndex>,
    pub markers: Vec<i32>,
    pub num_layers: usize,
    pub layer_height: f64,
}

impl VolumeMesh {
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_points(&self, c: usize) -> [Point; 4] {
        let t = self.cells[c];
        [
            self.vertices[t.0],
            self.vertices[t.1],
            self.vertices[t.2],
            self.vertices[t.3],
        ]
    }

    pub fn cell_volume(&self, c: usize) -> f64 {
        let [p0, p1, p2, p3] = self.cell_points(c);
        tetrahedron_signed_volume(p0, p1, p2, p3).abs()
    }

    /// Returns the total volume of the mesh.
    pub fn volume(&self) -> f64 {
        (0..self.cells.len()).map(|c| self.cell_volume(c)).sum()
    }

    /// Min and max corners of the vertex cloud, or None if empty.
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        bounding_box(&self.vertices)
    }

    /// Number of cells referencing each vertex.
    pub fn vertex_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.vertices.len()];
        for cell in &self.cells {
            for v in cell.as_array() {
                degrees[v] += 1;
            }
        }
        degrees
    }

    /// Checks index bounds, marker count and that no vertex is orphaned.
    pub fn validate(&self) -> Result<()> {
        if self.markers.len() != self.cells.len() {
            return Err(MeshError::Config(format!(
                "{} markers for {} cells",
                self.markers.len(),
                self.cells.len()
            ))
            .into());
        }
        let n = self.vertices.len();
        if let Some(c) = self
            .cells
            .iter()
            .position(|cell| cell.as_array().iter().any(|&v| v >= n))
        {
            return Err(MeshError::Geometry(format!(
                "cell {c} references a vertex out of range ({n} vertices)"
            ))
            .into());
        }
        if let Some(v) = self.vertex_degrees().iter().position(|&d| d == 0) {
            return Err(MeshError::Geometry(format!("vertex {v} is not used by any cell")).into());
        }
        Ok(())
    }
}
