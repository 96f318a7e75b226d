//! Mesh generation: constrained planar triangulation, extrusion into a
//! layered tetrahedral volume, trimming and surface extraction.
//!
//! # Architecture
//!
//! ```text
//! City + domain bbox ──► build_mesh_2d() ──► Mesh2D (building / halo / ground)
//!                                               │
//!                        ┌──────────────────────┴──────────────────────┐
//!                        ▼                                             ▼
//!              extrude() (skips building layers)          layer_mesh() (full stack)
//!                        │                                             │
//!                        │                                 trim_volume_mesh()
//!                        ▼                                             ▼
//!                    VolumeMesh ──► extract_boundary_3d() ──► Mesh
//! ```

pub mod extrude;
pub mod markers;
pub mod surface;
pub mod triangulate;
pub mod trim;

pub use extrude::{PointCompaction, extrude, layer_count, layer_mesh};
pub use markers::compute_domain_markers;
pub use surface::{
    build_surfaces_3d, extract_boundary_3d, extract_open_surface_3d, merge_surfaces_3d,
};
pub use triangulate::{GridTriangulator, SpadeTriangulator, Triangulator, build_mesh_2d};
pub use trim::trim_volume_mesh;
