//! End-to-end meshing of a city.
//!
//! ```text
//! build_mesh_2d ─► layer_mesh ─► smooth (buildings free) ─► trim
//!                                                            │
//!                    extract_boundary_3d ◄─ smooth (buildings fixed)
//! ```
//!
//! The first smoothing pass bends the full layer stack over the buildings
//! so that the cells left after trimming are already close to their final
//! shape. The second pass moves the trimmed mesh onto the terrain and the
//! roofs while holding the building walls in place.

use crate::MeshError;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::city::City;
use crate::geom::grid::GridField;
use crate::geom::mesh::{Mesh, Mesh2D, VolumeMesh};
use crate::mesher::extrude::layer_mesh;
use crate::mesher::surface::{build_surfaces_3d, extract_boundary_3d, merge_surfaces_3d};
use crate::mesher::triangulate::{SpadeTriangulator, Triangulator, build_mesh_2d};
use crate::mesher::trim::trim_volume_mesh;
use crate::sim::smoothing::{SmootherKind, SmoothingConfig, SmoothingReport, smooth_volume_mesh};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};

/// Parameters of a meshing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshingConfig {
    /// Target edge length of the ground triangulation and layer height.
    pub mesh_resolution: f64,
    /// Height of the domain above `ground_elevation`.
    pub domain_height: f64,
    /// Elevation of the bottom of the unsmoothed mesh.
    pub ground_elevation: f64,
    /// Minimum triangle angle of the quality triangulation, in degrees.
    pub min_angle_deg: f64,
    pub max_iterations: usize,
    pub relative_tolerance: f64,
    pub solver: SmootherKind,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            mesh_resolution: 10.0,
            domain_height: 100.0,
            ground_elevation: 0.0,
            min_angle_deg: 25.0,
            max_iterations: 1000,
            relative_tolerance: 1e-3,
            solver: SmootherKind::Unassembled,
        }
    }
}

impl MeshingConfig {
    pub fn new(mesh_resolution: f64, domain_height: f64) -> Self {
        Self {
            mesh_resolution,
            domain_height,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mesh_resolution.is_nan() || self.mesh_resolution <= 0.0 {
            return Err(MeshError::Config(format!(
                "mesh resolution must be > 0, got {}",
                self.mesh_resolution
            ))
            .into());
        }
        if self.domain_height.is_nan() || self.domain_height <= 0.0 {
            return Err(MeshError::Config(format!(
                "domain height must be > 0, got {}",
                self.domain_height
            ))
            .into());
        }
        if self.relative_tolerance.is_nan() || self.relative_tolerance <= 0.0 {
            return Err(MeshError::Config(format!(
                "relative tolerance must be > 0, got {}",
                self.relative_tolerance
            ))
            .into());
        }
        Ok(())
    }

    /// Quality triangulator with this configuration's angle bound.
    pub fn triangulator(&self) -> SpadeTriangulator {
        SpadeTriangulator::new(self.min_angle_deg)
    }

    fn smoothing(&self, top_height: f64, fix_buildings: bool) -> SmoothingConfig {
        SmoothingConfig {
            top_height,
            fix_buildings,
            max_iterations: self.max_iterations,
            relative_tolerance: self.relative_tolerance,
            solver: self.solver,
        }
    }
}

/// Everything produced by [`build_volume_mesh`].
#[derive(Debug, Clone)]
pub struct CityVolumeMesh {
    pub mesh2d: Mesh2D,
    pub volume: VolumeMesh,
    /// Exterior surface of `volume`, oriented outwards.
    pub boundary: Mesh,
    /// Reports of the first (buildings free) and second (buildings fixed)
    /// smoothing passes.
    pub smoothing: [SmoothingReport; 2],
}

/// Meshes the domain `bbox` around the buildings of `city`, following the
/// ground elevation `dem`.
pub fn build_volume_mesh<T: Triangulator + ?Sized>(
    city: &City,
    dem: &GridField,
    bbox: &BoundingBox2D,
    config: &MeshingConfig,
    triangulator: &T,
) -> Result<CityVolumeMesh> {
    config.validate()?;
    let h = config.mesh_resolution;

    let mesh2d = build_mesh_2d(city, bbox, h, triangulator)?;
    let mut layered = layer_mesh(&mesh2d, config.ground_elevation, config.domain_height, h)?;

    let top_height = config.domain_height + dem.mean();
    info!("Smoothing layered mesh, top of domain at {top_height:.2}");
    let first = smooth_volume_mesh(
        &mut layered,
        city,
        dem,
        &config.smoothing(top_height, false),
    )?;

    let mut volume = trim_volume_mesh(&layered, &mesh2d, city)?;
    info!("Smoothing trimmed mesh with buildings held in place");
    let second = smooth_volume_mesh(&mut volume, city, dem, &config.smoothing(top_height, true))?;

    let boundary = extract_boundary_3d(&volume);
    info!(
        "City mesh: {} vertices, {} cells, {} boundary faces",
        volume.num_vertices(),
        volume.num_cells(),
        boundary.face_count()
    );
    Ok(CityVolumeMesh {
        mesh2d,
        volume,
        boundary,
        smoothing: [first, second],
    })
}

/// Builds a single non-conforming surface of the ground and all buildings.
pub fn build_city_surface<T: Triangulator + ?Sized>(
    city: &City,
    dem: &GridField,
    bbox: &BoundingBox2D,
    config: &MeshingConfig,
    flat_ground: bool,
    triangulator: &T,
) -> Result<Mesh> {
    config.validate()?;
    let surfaces = build_surfaces_3d(
        city,
        dem,
        bbox,
        config.mesh_resolution,
        flat_ground,
        triangulator,
    )?;
    Ok(merge_surfaces_3d(&surfaces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::building::Building;
    use crate::geom::grid::Grid;
    use crate::geom::point2d::Point2D;
    use crate::geom::polygon::Polygon;
    use crate::mesher::triangulate::GridTriangulator;

    fn setup() -> (City, GridField, BoundingBox2D) {
        let footprint = Polygon::new(vec![
            Point2D::new(10., 10.),
            Point2D::new(20., 10.),
            Point2D::new(20., 20.),
            Point2D::new(10., 20.),
        ])
        .unwrap();
        let city = City::new(vec![Building::new(footprint, 7.5, 0.).unwrap()]);
        let bbox = BoundingBox2D::new(Point2D::new(0., 0.), Point2D::new(40., 40.));
        let dem = GridField::constant(Grid::new(bbox, 5, 5).unwrap(), 0.);
        (city, dem, bbox)
    }

    fn config() -> MeshingConfig {
        MeshingConfig {
            relative_tolerance: 1e-6,
            ..MeshingConfig::new(5., 20.)
        }
    }

    #[test]
    fn test_defaults() {
        let config = MeshingConfig::default();
        assert_eq!(config.mesh_resolution, 10.);
        assert_eq!(config.domain_height, 100.);
        assert_eq!(config.max_iterations, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let (city, dem, bbox) = setup();
        let config = MeshingConfig::new(0., 20.);
        let err = build_volume_mesh(&city, &dem, &bbox, &config, &GridTriangulator::new(8, 8))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MeshError>(),
            Some(MeshError::Config(_))
        ));
    }

    #[test]
    fn test_volume_mesh_on_grid() {
        let (city, dem, bbox) = setup();
        let result =
            build_volume_mesh(&city, &dem, &bbox, &config(), &GridTriangulator::new(8, 8)).unwrap();
        assert!(result.smoothing.iter().all(|r| r.converged));
        result.volume.validate().unwrap();
        assert!(result.volume.volume() > 0.);
        assert!(result.boundary.face_count() > 0);

        let mut roof_z = f64::INFINITY;
        let mut corner_z = f64::INFINITY;
        for p in &result.volume.vertices {
            if p.xy().is_close(&Point2D::new(15., 15.)) {
                roof_z = roof_z.min(p.z);
            }
            if p.xy().is_close(&Point2D::new(10., 10.)) {
                corner_z = corner_z.min(p.z);
            }
        }
        assert!((roof_z - 7.5).abs() < 1e-9);
        assert!(corner_z.abs() < 1e-9);
    }

    #[test]
    fn test_city_surface() {
        let (city, dem, bbox) = setup();
        let surface = build_city_surface(
            &city,
            &dem,
            &bbox,
            &config(),
            true,
            &SpadeTriangulator::default(),
        )
        .unwrap();
        // Ground, plus roof and four walls of the building
        assert!((surface.area() - (1600. + 100. + 4. * 75.)).abs() < 1e-6);
    }
}
