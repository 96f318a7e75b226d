//! Regular 2D grids and scalar fields sampled on their vertices.
//!
//! Field values are stored in an `ndarray::Array2` of shape `(ysize, xsize)`,
//! so the flat row-major index of vertex `(ix, iy)` is `iy * xsize + ix`.

use crate::MeshError;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::point2d::Point2D;
use anyhow::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether a point lies inside the grid.
const OUTSIDE_TOL: f64 = 1e-6;

/// Uniform grid over a rectangle, counted by vertices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub bbox: BoundingBox2D,
    pub xsize: usize,
    pub ysize: usize,
    pub xstep: f64,
    pub ystep: f64,
}

impl Grid {
    /// Creates a grid with `xsize` by `ysize` vertices spanning `bbox`.
    pub fn new(bbox: BoundingBox2D, xsize: usize, ysize: usize) -> Result<Self> {
        if xsize < 2 || ysize < 2 {
            return Err(MeshError::Config(format!(
                "grid needs at least 2x2 vertices, got {xsize}x{ysize}"
            ))
            .into());
        }
        if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
            return Err(MeshError::Config("grid bounding box is empty".to_string()).into());
        }
        Ok(Self {
            bbox,
            xsize,
            ysize,
            xstep: bbox.width() / (xsize - 1) as f64,
            ystep: bbox.height() / (ysize - 1) as f64,
        })
    }

    pub fn num_vertices(&self) -> usize {
        self.xsize * self.ysize
    }

    pub fn num_cells(&self) -> usize {
        (self.xsize - 1) * (self.ysize - 1)
    }

    /// Coordinates of the vertex with flat index `i`.
    pub fn index_to_point(&self, i: usize) -> Point2D {
        let ix = i % self.xsize;
        let iy = i / self.xsize;
        Point2D::new(
            self.bbox.min.x + ix as f64 * self.xstep,
            self.bbox.min.y + iy as f64 * self.ystep,
        )
    }

    /// Maps `p` to the lower-left vertex `(ix, iy)` of its cell and the
    /// local coordinates within that cell.
    ///
    /// The cell is clamped to the grid, so points on the far boundary
    /// resolve to the last cell with local coordinate 1.
    pub fn point_to_cell(&self, p: Point2D) -> (usize, usize, f64, f64) {
        let x = (p.x - self.bbox.min.x).clamp(0.0, self.bbox.width());
        let y = (p.y - self.bbox.min.y).clamp(0.0, self.bbox.height());
        let ix = ((x / self.xstep).floor() as usize).min(self.xsize - 2);
        let iy = ((y / self.ystep).floor() as usize).min(self.ysize - 2);
        let lx = (x - ix as f64 * self.xstep) / self.xstep;
        let ly = (y - iy as f64 * self.ystep) / self.ystep;
        (ix, iy, lx, ly)
    }
}

/// Scalar field on the vertices of a [`Grid`], evaluated by bilinear
/// interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridField {
    pub grid: Grid,
    pub values: Array2<f64>,
}

impl GridField {
    /// Creates a field from row-major vertex values.
    pub fn new(grid: Grid, values: Vec<f64>) -> Result<Self> {
        if values.len() != grid.num_vertices() {
            return Err(MeshError::Config(format!(
                "grid field expects {} values, got {}",
                grid.num_vertices(),
                values.len()
            ))
            .into());
        }
        let values = Array2::from_shape_vec((grid.ysize, grid.xsize), values)?;
        Ok(Self { grid, values })
    }

    pub fn constant(grid: Grid, value: f64) -> Self {
        let values = Array2::from_elem((grid.ysize, grid.xsize), value);
        Self { grid, values }
    }

    /// Samples `f(x, y)` at every vertex.
    pub fn from_fn<F: Fn(Point2D) -> f64>(grid: Grid, f: F) -> Self {
        let values = Array2::from_shape_fn((grid.ysize, grid.xsize), |(iy, ix)| {
            f(grid.index_to_point(iy * grid.xsize + ix))
        });
        Self { grid, values }
    }

    /// Bilinear interpolation at `p`. Points outside the grid are clamped
    /// onto its bounding box.
    pub fn evaluate(&self, p: Point2D) -> f64 {
        let (ix, iy, x, y) = self.grid.point_to_cell(p);
        let v00 = self.values[[iy, ix]];
        let v10 = self.values[[iy, ix + 1]];
        let v01 = self.values[[iy + 1, ix]];
        let v11 = self.values[[iy + 1, ix + 1]];
        (1.0 - x) * (1.0 - y) * v00 + x * (1.0 - y) * v10 + (1.0 - x) * y * v01 + x * y * v11
    }

    /// Like [`GridField::evaluate`] but returns None outside the grid.
    pub fn try_evaluate(&self, p: Point2D) -> Option<f64> {
        if self.grid.bbox.contains(p, OUTSIDE_TOL) {
            Some(self.evaluate(p))
        } else {
            None
        }
    }

    /// Value at the lower-left vertex of the cell containing `p`.
    pub fn nearest(&self, p: Point2D) -> f64 {
        let (ix, iy, _, _) = self.grid.point_to_cell(p);
        self.values[[iy, ix]]
    }

    /// Resamples `other` at the vertices of this field's grid.
    pub fn interpolate(&mut self, other: &GridField) {
        let grid = self.grid.clone();
        for ((iy, ix), v) in self.values.indexed_iter_mut() {
            *v = other.evaluate(grid.index_to_point(iy * grid.xsize + ix));
        }
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn mean(&self) -> f64 {
        self.values.mean().unwrap_or(0.0)
    }
}
