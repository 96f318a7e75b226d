//! Volume meshing of urban domains.
//!
//! A [`City`] of extruded building footprints and a ground elevation
//! [`GridField`] are turned into a layered tetrahedral [`VolumeMesh`] whose
//! bottom follows the terrain and the roofs. See [`pipeline`] for the full
//! chain of stages.

pub mod error;
pub mod geom;
pub mod mesher;
pub mod pipeline;
pub mod sim;
mod uid;

// Prelude
pub use error::MeshError;
pub use geom::bboxes::BoundingBox2D;
pub use geom::building::Building;
pub use geom::city::City;
pub use geom::grid::{Grid, GridField};
pub use geom::mesh::{GROUND, HALO, INTERIOR, Mesh, Mesh2D, VolumeMesh};
pub use geom::point::Point;
pub use geom::point2d::Point2D;
pub use geom::polygon::Polygon;
pub use geom::tetrahedron::TetrahedronIndex;
pub use geom::triangles::TriangleIndex;
pub use geom::vector::Vector;
pub use uid::UID;

pub use mesher::{
    GridTriangulator, SpadeTriangulator, Triangulator, build_mesh_2d, build_surfaces_3d, extrude,
    extract_boundary_3d, extract_open_surface_3d, layer_mesh, merge_surfaces_3d,
    trim_volume_mesh,
};
pub use pipeline::{CityVolumeMesh, MeshingConfig, build_city_surface, build_volume_mesh};
pub use sim::smoothing::{SmoothingConfig, SmoothingReport, smooth_volume_mesh};
