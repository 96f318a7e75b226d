//! Gauss-Seidel relaxation on the unassembled stiffness.
//!
//! The global matrix is never formed. Each sweep walks the cells in order
//! and subtracts the off-diagonal contributions of every cell block from a
//! per-vertex accumulator. A vertex is updated as soon as its last cell has
//! been visited, so later cells in the same sweep already see the new value.

use crate::geom::mesh::VolumeMesh;
use crate::sim::smoothing::boundary::BoundaryConditions;
use crate::sim::smoothing::stiffness::StiffnessMatrix;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Outcome of a smoothing solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingReport {
    /// Number of sweeps performed.
    pub iterations: usize,
    /// Largest update of the last sweep.
    pub residual: f64,
    pub converged: bool,
    /// Largest update of every sweep, in order.
    pub residual_history: Vec<f64>,
}

impl SmoothingReport {
    pub(crate) fn not_started() -> Self {
        Self {
            iterations: 0,
            residual: f64::INFINITY,
            converged: false,
            residual_history: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, residual: f64) {
        self.iterations += 1;
        self.residual = residual;
        self.residual_history.push(residual);
    }
}

/// True once the largest update is small relative to the solution.
pub(crate) fn has_converged(residual: f64, u: &[f64], relative_tolerance: f64) -> bool {
    let scale = u.iter().fold(1.0_f64, |acc, x| acc.max(x.abs()));
    residual < relative_tolerance * scale
}

/// Solves `K u = b` for the free vertices, starting from `u`.
///
/// `stiffness` must already have the boundary conditions applied.
/// Constrained entries of `u` are never written.
pub fn solve_unassembled_gauss_seidel(
    volume: &VolumeMesh,
    stiffness: &StiffnessMatrix,
    bcs: &BoundaryConditions,
    u: &mut [f64],
    max_iterations: usize,
    relative_tolerance: f64,
) -> SmoothingReport {
    assert_eq!(
        u.len(),
        volume.num_vertices(),
        "solution vector length does not match the vertex count"
    );
    assert_eq!(
        stiffness.blocks.len(),
        volume.num_cells(),
        "one stiffness block per cell is required"
    );

    let b = bcs.load_vector();
    let degrees = volume.vertex_degrees();
    let mut report = SmoothingReport::not_started();

    for iter in 0..max_iterations {
        let mut c = b.clone();
        let mut remaining = degrees.clone();
        let mut residual = 0.0_f64;

        for (cell, block) in volume.cells.iter().zip(&stiffness.blocks) {
            let idx = cell.as_array();
            for i in 0..4 {
                let v = idx[i];
                if bcs.is_constrained(v) {
                    continue;
                }
                for k in 1..4 {
                    let j = (i + k) % 4;
                    c[v] -= block[i][j] * u[idx[j]];
                }
                remaining[v] -= 1;
                if remaining[v] == 0 {
                    let new = c[v] / stiffness.diagonal[v];
                    residual = residual.max((new - u[v]).abs());
                    u[v] = new;
                }
            }
        }

        report.record(residual);
        debug!("Gauss-Seidel sweep {}: max update {:.3e}", iter + 1, residual);
        if has_converged(residual, u, relative_tolerance) {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        warn!(
            "Smoothing did not converge after {} sweeps (max update {:.3e})",
            report.iterations, report.residual
        );
    }
    report
}
