//! Error kinds raised by the meshing and smoothing stages.
//!
//! Functions return [`anyhow::Result`] like the rest of the crate; the
//! variants below are attached to those errors so callers can recover the
//! kind with `err.downcast_ref::<MeshError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Invalid input geometry (self-intersecting constraints, bad polygons).
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// The triangulator returned a triangle with (near) zero area.
    #[error("degenerate triangle {triangle} (area {area:e})")]
    DegenerateTriangle { triangle: usize, area: f64 },

    /// A tetrahedron with (near) zero volume; its stiffness is undefined.
    #[error("degenerate cell {cell} (volume {volume:e})")]
    DegenerateCell { cell: usize, volume: f64 },

    /// Missing or inconsistent inputs and parameters.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The external triangulation routine failed.
    #[error("triangulation failed: {0}")]
    Triangulation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn failing() -> Result<()> {
        Err(MeshError::DegenerateCell {
            cell: 3,
            volume: 0.0,
        }
        .into())
    }

    #[test]
    fn test_downcast_from_anyhow() {
        let err = failing().unwrap_err();
        match err.downcast_ref::<MeshError>() {
            Some(MeshError::DegenerateCell { cell, .. }) => assert_eq!(*cell, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let err = MeshError::Config("empty city".to_string());
        assert_eq!(err.to_string(), "invalid configuration: empty city");
    }
}
