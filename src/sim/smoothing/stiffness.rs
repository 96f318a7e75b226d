//! Per-cell P1 Laplacian stiffness blocks.

use crate::MeshError;
use crate::Point;
use crate::Vector;
use crate::geom::mesh::VolumeMesh;
use anyhow::Result;
use rayon::prelude::*;

/// Local stiffness block of one tetrahedron.
pub type LocalStiffness = [[f64; 4]; 4];

/// Relative threshold on `|det| / max_edge^3` below which a cell is
/// considered flat.
const DEGENERATE_TOL: f64 = 1e-12;

/// Unassembled stiffness: one block per cell plus the assembled diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct StiffnessMatrix {
    pub blocks: Vec<LocalStiffness>,
    pub diagonal: Vec<f64>,
}

impl StiffnessMatrix {
    /// Computes the blocks of all cells in parallel and sums their
    /// diagonals per vertex.
    pub fn new(volume: &VolumeMesh) -> Result<Self> {
        let blocks = (0..volume.num_cells())
            .into_par_iter()
            .map(|c| {
                local_stiffness(volume.cell_points(c)).ok_or_else(|| {
                    MeshError::DegenerateCell {
                        cell: c,
                        volume: volume.cell_volume(c),
                    }
                })
            })
            .collect::<Result<Vec<_>, MeshError>>()?;

        let mut diagonal = vec![0.0; volume.num_vertices()];
        for (cell, block) in volume.cells.iter().zip(&blocks) {
            for (i, v) in cell.as_array().into_iter().enumerate() {
                diagonal[v] += block[i][i];
            }
        }
        Ok(Self { blocks, diagonal })
    }
}

/// Stiffness of the linear Laplacian on a tetrahedron:
/// `K_ij = |T| grad(phi_i) . grad(phi_j)`.
///
/// Returns None if the tetrahedron is degenerate.
pub fn local_stiffness(points: [Point; 4]) -> Option<LocalStiffness> {
    let [p0, p1, p2, p3] = points;
    let e1 = p1 - p0;
    let e2 = p2 - p0;
    let e3 = p3 - p0;
    let det = e1.dot(e2.cross(e3));

    let max_edge = [e1, e2, e3, p2 - p1, p3 - p1, p3 - p2]
        .iter()
        .map(Vector::length)
        .fold(0.0, f64::max);
    if det.is_nan() || det.abs() <= DEGENERATE_TOL * max_edge.powi(3) {
        return None;
    }

    let g1 = e2.cross(e3) * (1.0 / det);
    let g2 = e3.cross(e1) * (1.0 / det);
    let g3 = e1.cross(e2) * (1.0 / det);
    let g0 = -(g1 + g2 + g3);
    let grads = [g0, g1, g2, g3];

    let vol = det.abs() / 6.0;
    let mut k = [[0.0; 4]; 4];
    for i in 0..4 {
        for j in i..4 {
            let kij = vol * grads[i].dot(grads[j]);
            k[i][j] = kij;
            k[j][i] = kij;
        }
    }
    Some(k)
}
