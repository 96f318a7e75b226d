//! Gauss-Seidel on the assembled global stiffness matrix.
//!
//! Sweeps the free vertices in index order over a CSR matrix merged from
//! the per-cell blocks. Used to cross-check the unassembled solver, which
//! converges to the same solution along a different update order.

use crate::geom::mesh::VolumeMesh;
use crate::sim::smoothing::boundary::BoundaryConditions;
use crate::sim::smoothing::solver::{SmoothingReport, has_converged};
use crate::sim::smoothing::stiffness::StiffnessMatrix;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Global stiffness in compressed sparse row form, diagonal kept apart.
///
/// Built from the cell blocks for comparison with
/// [`crate::sim::smoothing::solver::solve_unassembled_gauss_seidel`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledStiffness {
    pub diagonal: Vec<f64>,
    row_offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
}

impl AssembledStiffness {
    /// Sums the off-diagonal block entries per (row, column) pair.
    pub fn new(volume: &VolumeMesh, stiffness: &StiffnessMatrix) -> Self {
        let n = volume.num_vertices();
        let mut rows = vec![BTreeMap::<usize, f64>::new(); n];
        for (cell, block) in volume.cells.iter().zip(&stiffness.blocks) {
            let idx = cell.as_array();
            for i in 0..4 {
                for j in (0..4).filter(|&j| j != i) {
                    *rows[idx[i]].entry(idx[j]).or_insert(0.0) += block[i][j];
                }
            }
        }

        let mut row_offsets = Vec::with_capacity(n + 1);
        let mut columns = Vec::new();
        let mut values = Vec::new();
        row_offsets.push(0);
        for row in rows {
            for (col, value) in row {
                columns.push(col);
                values.push(value);
            }
            row_offsets.push(columns.len());
        }

        Self {
            diagonal: stiffness.diagonal.clone(),
            row_offsets,
            columns,
            values,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.diagonal.len()
    }

    pub fn num_nonzeros(&self) -> usize {
        self.values.len() + self.diagonal.len()
    }

    fn off_diagonal_dot(&self, row: usize, u: &[f64]) -> f64 {
        let range = self.row_offsets[row]..self.row_offsets[row + 1];
        self.columns[range.clone()]
            .iter()
            .zip(&self.values[range])
            .map(|(&col, &value)| value * u[col])
            .sum()
    }

    /// Max norm of `b - A u`.
    pub fn residual_norm(&self, u: &[f64], b: &[f64]) -> f64 {
        (0..self.num_rows())
            .map(|row| (b[row] - self.diagonal[row] * u[row] - self.off_diagonal_dot(row, u)).abs())
            .fold(0.0, f64::max)
    }
}

/// Classic Gauss-Seidel on the assembled matrix, visiting vertices in index
/// order. Same stopping rule and report as the unassembled solver.
pub fn solve_assembled_gauss_seidel(
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
    let matrix = AssembledStiffness::new(volume, stiffness);
    let b = bcs.load_vector();
    let mut report = SmoothingReport::not_started();

    for iter in 0..max_iterations {
        let mut residual = 0.0_f64;
        for v in 0..matrix.num_rows() {
            if bcs.is_constrained(v) {
                continue;
            }
            let new = (b[v] - matrix.off_diagonal_dot(v, u)) / matrix.diagonal[v];
            residual = residual.max((new - u[v]).abs());
            u[v] = new;
        }

        report.record(residual);
        debug!("Assembled sweep {}: max update {:.3e}", iter + 1, residual);
        if has_converged(residual, u, relative_tolerance) {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        warn!(
            "Assembled smoothing did not converge after {} sweeps (max update {:.3e})",
            report.iterations, report.residual
        );
    }
    report
}
