//! Vertex classification and Dirichlet values for mesh smoothing.

use crate::MeshError;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::city::City;
use crate::geom::grid::GridField;
use crate::geom::mesh::{GROUND, HALO, VolumeMesh};
use crate::sim::smoothing::stiffness::StiffnessMatrix;
use anyhow::Result;
use log::debug;
use std::collections::HashMap;

/// Role of a vertex in the smoothing problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexMarker {
    /// Unconstrained; interior and top vertices.
    Free,
    /// Bottom of a ground or halo column, follows the elevation field.
    Ground,
    /// On a vertical side of the domain, moves with its ground vertex.
    Side,
    /// Bottom of the first cell above building `b`, placed on its roof.
    Roof(usize),
    /// On or inside the footprint of building `b`, below its roof, and
    /// held in place.
    FixedBuilding(usize),
}

impl VertexMarker {
    pub fn is_constrained(&self) -> bool {
        !matches!(self, VertexMarker::Free)
    }
}

/// Per-vertex markers and Dirichlet displacements (target z minus
/// current z).
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditions {
    pub markers: Vec<VertexMarker>,
    pub values: Vec<f64>,
}

impl BoundaryConditions {
    /// Classifies every vertex of `volume`.
    ///
    /// Precedence is roof, ground, side, fixed building (only with
    /// `fix_buildings`), then free.
    pub fn new(
        volume: &VolumeMesh,
        city: &City,
        dem: &GridField,
        fix_buildings: bool,
    ) -> Result<Self> {
        let n = volume.num_vertices();
        let mut markers = vec![VertexMarker::Free; n];
        let mut values = vec![0.0; n];
        let Some((lo, hi)) = volume.bounding_box() else {
            return Ok(Self { markers, values });
        };
        let tol = 1e-9 * (hi - lo).length().max(1.0);
        let domain = BoundingBox2D::new(lo.xy(), hi.xy());

        // The first three vertices of a marked cell form its bottom face
        for (cell, &marker) in volume.cells.iter().zip(&volume.markers) {
            if marker < 0 {
                continue;
            }
            let b = marker as usize;
            let building = city.building(b).ok_or_else(|| {
                MeshError::Config(format!(
                    "cell marker {b} refers to a missing building ({} buildings)",
                    city.len()
                ))
            })?;
            for v in [cell.0, cell.1, cell.2] {
                markers[v] = VertexMarker::Roof(b);
                values[v] = building.roof_height() - volume.vertices[v].z;
            }
        }

        for (cell, &marker) in volume.cells.iter().zip(&volume.markers) {
            if marker != HALO && marker != GROUND {
                continue;
            }
            for v in [cell.0, cell.1, cell.2] {
                if markers[v] == VertexMarker::Free {
                    let p = volume.vertices[v];
                    markers[v] = VertexMarker::Ground;
                    values[v] = dem.evaluate(p.xy()) - p.z;
                }
            }
        }

        // Side vertices copy the displacement of the ground vertex below
        let mut column_ground: HashMap<(i64, i64), f64> = HashMap::new();
        for (v, p) in volume.vertices.iter().enumerate() {
            if markers[v] == VertexMarker::Ground {
                column_ground.insert(column_key(p.x, p.y, tol), values[v]);
            }
        }
        for (v, p) in volume.vertices.iter().enumerate() {
            if markers[v] != VertexMarker::Free {
                continue;
            }
            if domain.is_on_boundary(p.xy(), tol) {
                markers[v] = VertexMarker::Side;
                values[v] = column_ground
                    .get(&column_key(p.x, p.y, tol))
                    .copied()
                    .unwrap_or_else(|| dem.evaluate(p.xy()) - lo.z);
            }
        }

        if fix_buildings {
            for (v, p) in volume.vertices.iter().enumerate() {
                if markers[v] != VertexMarker::Free {
                    continue;
                }
                if let Some(b) = city.find_building_or_touching(p.xy(), tol) {
                    if p.z <= city.buildings()[b].roof_height() + tol {
                        markers[v] = VertexMarker::FixedBuilding(b);
                    }
                }
            }
        }

        let bcs = Self { markers, values };
        debug!(
            "Boundary conditions: {} of {} vertices constrained",
            bcs.num_constrained(),
            n
        );
        Ok(bcs)
    }

    pub fn num_constrained(&self) -> usize {
        self.markers.iter().filter(|m| m.is_constrained()).count()
    }

    pub fn is_constrained(&self, v: usize) -> bool {
        self.markers[v].is_constrained()
    }

    /// Zeroes the off-diagonal entries of constrained rows in every block
    /// and sets their global diagonal to 1.
    pub fn apply(&self, stiffness: &mut StiffnessMatrix, volume: &VolumeMesh) {
        for (cell, block) in volume.cells.iter().zip(stiffness.blocks.iter_mut()) {
            for (i, v) in cell.as_array().into_iter().enumerate() {
                if self.is_constrained(v) {
                    for (j, entry) in block[i].iter_mut().enumerate() {
                        if j != i {
                            *entry = 0.0;
                        }
                    }
                }
            }
        }
        for (v, d) in stiffness.diagonal.iter_mut().enumerate() {
            if self.is_constrained(v) {
                *d = 1.0;
            }
        }
    }

    /// Right-hand side: Dirichlet values on constrained vertices, zero
    /// elsewhere.
    pub fn load_vector(&self) -> Vec<f64> {
        self.markers
            .iter()
            .zip(&self.values)
            .map(|(m, &value)| if m.is_constrained() { value } else { 0.0 })
            .collect()
    }
}

fn column_key(x: f64, y: f64, tol: f64) -> (i64, i64) {
    ((x / tol).round() as i64, (y / tol).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TriangleIndex;
    use crate::geom::building::Building;
    use crate::geom::grid::Grid;
    use crate::geom::mesh::Mesh2D;
    use crate::geom::point2d::Point2D;
    use crate::geom::polygon::Polygon;
    use crate::mesher::extrude::extrude;

    /// 2x1 strip of four triangles; the right square holds a building
    fn setup(height: f64) -> (VolumeMesh, City, GridField) {
        let footprint = Polygon::new(vec![
            Point2D::new(1., 0.),
            Point2D::new(2., 0.),
            Point2D::new(2., 1.),
            Point2D::new(1., 1.),
        ])
        .unwrap();
        let city = City::new(vec![Building::new(footprint, height, 0.).unwrap()]);
        let mut mesh2d = Mesh2D::new(
            vec![
                Point2D::new(0., 0.),
                Point2D::new(1., 0.),
                Point2D::new(2., 0.),
                Point2D::new(0., 1.),
                Point2D::new(1., 1.),
                Point2D::new(2., 1.),
            ],
            vec![
                TriangleIndex(0, 1, 4),
                TriangleIndex(0, 4, 3),
                TriangleIndex(1, 2, 5),
                TriangleIndex(1, 5, 4),
            ],
        );
        mesh2d.markers = vec![HALO, HALO, 0, 0];
        let volume = extrude(&mesh2d, &city, 0., 4., 1.).unwrap();
        let bbox = BoundingBox2D::new(Point2D::new(0., 0.), Point2D::new(2., 1.));
        let dem = GridField::from_fn(Grid::new(bbox, 3, 2).unwrap(), |p| 0.5 * p.x);
        (volume, city, dem)
    }

    #[test]
    fn test_markers_and_values() {
        let (volume, city, dem) = setup(2.);
        let bcs = BoundaryConditions::new(&volume, &city, &dem, false).unwrap();

        for (v, p) in volume.vertices.iter().enumerate() {
            let marker = bcs.markers[v];
            if p.x > 0.5 && (p.z - 2.).abs() < 1e-12 {
                // Building column starts at layer 2
                assert_eq!(marker, VertexMarker::Roof(0), "v={v} p={p}");
                assert!((bcs.values[v] - 0.).abs() < 1e-12);
            } else if p.x < 1.5 && p.z.abs() < 1e-12 {
                assert_eq!(marker, VertexMarker::Ground, "v={v} p={p}");
                assert!((bcs.values[v] - 0.5 * p.x).abs() < 1e-12);
            } else {
                // Every remaining vertex lies on the domain sides
                assert_eq!(marker, VertexMarker::Side, "v={v} p={p}");
            }
        }
    }

    #[test]
    fn test_side_follows_column_ground() {
        let (volume, city, dem) = setup(2.);
        let bcs = BoundaryConditions::new(&volume, &city, &dem, false).unwrap();
        for (v, p) in volume.vertices.iter().enumerate() {
            if bcs.markers[v] == VertexMarker::Side && p.x.abs() < 1e-12 {
                assert!(bcs.values[v].abs() < 1e-12);
            }
            if bcs.markers[v] == VertexMarker::Side && (p.x - 1.).abs() < 1e-12 {
                assert!((bcs.values[v] - 0.5).abs() < 1e-12, "v={v} p={p}");
            }
        }
    }

    #[test]
    fn test_roof_value_is_displacement() {
        let (volume, city, dem) = setup(2.6);
        let bcs = BoundaryConditions::new(&volume, &city, &dem, false).unwrap();
        let roof: Vec<usize> = (0..volume.num_vertices())
            .filter(|&v| bcs.markers[v] == VertexMarker::Roof(0))
            .collect();
        assert!(!roof.is_empty());
        for v in roof {
            let target = volume.vertices[v].z + bcs.values[v];
            assert!((target - 2.6).abs() < 1e-12);
        }
    }

    #[test]
    fn test_load_vector_and_apply() {
        let (volume, city, dem) = setup(2.);
        let bcs = BoundaryConditions::new(&volume, &city, &dem, false).unwrap();
        let b = bcs.load_vector();
        let mut stiffness = StiffnessMatrix::new(&volume).unwrap();
        bcs.apply(&mut stiffness, &volume);
        for v in 0..volume.num_vertices() {
            if bcs.is_constrained(v) {
                assert_eq!(stiffness.diagonal[v], 1.0);
                assert_eq!(b[v], bcs.values[v]);
            } else {
                assert_eq!(b[v], 0.0);
            }
        }
        for (cell, block) in volume.cells.iter().zip(&stiffness.blocks) {
            for (i, v) in cell.as_array().into_iter().enumerate() {
                if bcs.is_constrained(v) {
                    for j in (0..4).filter(|&j| j != i) {
                        assert_eq!(block[i][j], 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_missing_building_is_config_error() {
        let (volume, _, dem) = setup(2.);
        let err = BoundaryConditions::new(&volume, &City::default(), &dem, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::Config(_))
        ));
    }
}
