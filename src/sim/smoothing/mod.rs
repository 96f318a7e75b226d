//! Height smoothing of layered volume meshes.
//!
//! Vertex heights are relaxed towards a discrete harmonic displacement field
//! so that the bottom of the mesh follows the terrain and the roofs while
//! the rest of the mesh deforms smoothly.
//!
//! # Architecture
//!
//! ```text
//! VolumeMesh ──► BoundaryConditions::new() ──► markers + Dirichlet values
//!     │                                               │
//!     └──► StiffnessMatrix::new() ──► apply() ◄───────┘
//!                                        │
//!                       solve_unassembled_gauss_seidel()  (default)
//!                       solve_assembled_gauss_seidel()    (cross-check)
//!                                        │
//!                                   z += u per vertex
//! ```
//!
//! Only z coordinates change; the topology of the mesh is left untouched.

pub mod boundary;
pub mod config;
pub mod solver;
pub mod solver_sparse;
pub mod stiffness;

pub use boundary::{BoundaryConditions, VertexMarker};
pub use config::{SmootherKind, SmoothingConfig};
pub use solver::{SmoothingReport, solve_unassembled_gauss_seidel};
pub use solver_sparse::{AssembledStiffness, solve_assembled_gauss_seidel};
pub use stiffness::{LocalStiffness, StiffnessMatrix, local_stiffness};

use crate::geom::city::City;
use crate::geom::grid::GridField;
use crate::geom::mesh::VolumeMesh;
use anyhow::Result;
use log::info;

/// Smooths the z coordinates of `volume` in place.
///
/// Roof, ground and side vertices are moved to their targets, and with
/// `config.fix_buildings` vertices on or below a roof are held still. All
/// other vertices get the solution of the Laplace problem.
pub fn smooth_volume_mesh(
    volume: &mut VolumeMesh,
    city: &City,
    dem: &GridField,
    config: &SmoothingConfig,
) -> Result<SmoothingReport> {
    if volume.num_vertices() == 0 {
        return Ok(SmoothingReport::not_started());
    }
    info!(
        "Smoothing {} vertices in {} cells ({:?}, fix_buildings={})",
        volume.num_vertices(),
        volume.num_cells(),
        config.solver,
        config.fix_buildings
    );

    let bcs = BoundaryConditions::new(volume, city, dem, config.fix_buildings)?;
    let mut stiffness = StiffnessMatrix::new(volume)?;
    bcs.apply(&mut stiffness, volume);

    let mut u = initial_guess(volume, &bcs, dem, config);
    let report = match config.solver {
        SmootherKind::Unassembled => solve_unassembled_gauss_seidel(
            volume,
            &stiffness,
            &bcs,
            &mut u,
            config.max_iterations,
            config.relative_tolerance,
        ),
        SmootherKind::Assembled => solve_assembled_gauss_seidel(
            volume,
            &stiffness,
            &bcs,
            &mut u,
            config.max_iterations,
            config.relative_tolerance,
        ),
    };

    for (p, du) in volume.vertices.iter_mut().zip(&u) {
        p.z += du;
    }
    info!(
        "Smoothing finished after {} sweeps (max update {:.3e}, converged={})",
        report.iterations, report.residual, report.converged
    );
    Ok(report)
}

/// Starting displacement for the sweeps.
///
/// In fix mode this is the load vector. Otherwise free vertices blend the
/// ground displacement below them with the displacement that moves the top
/// of the mesh to `top_height`, by relative height in the mesh.
fn initial_guess(
    volume: &VolumeMesh,
    bcs: &BoundaryConditions,
    dem: &GridField,
    config: &SmoothingConfig,
) -> Vec<f64> {
    let mut u = bcs.load_vector();
    if config.fix_buildings {
        return u;
    }
    let Some((lo, hi)) = volume.bounding_box() else {
        return u;
    };
    let (z_min, z_top) = (lo.z, hi.z);
    let span = z_top - z_min;
    let top = config.top_height - z_top;

    for (v, p) in volume.vertices.iter().enumerate() {
        if bcs.is_constrained(v) {
            continue;
        }
        let s = if span > 0.0 { (p.z - z_min) / span } else { 0.0 };
        let ground = dem.evaluate(p.xy()) - z_min;
        u[v] = (1.0 - s) * ground + s * top;
    }
    u
}
