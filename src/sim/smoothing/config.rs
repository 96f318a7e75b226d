use serde::{Deserialize, Serialize};

/// Linear solver used by the smoother.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SmootherKind {
    /// Gauss-Seidel sweeps over per-cell stiffness blocks.
    #[default]
    Unassembled,
    /// Gauss-Seidel on the assembled sparse matrix, in vertex order.
    Assembled,
}

/// Configuration of a smoothing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Target elevation of the top of the domain, used by the initial guess.
    pub top_height: f64,
    /// Hold vertices on or below building roofs in place.
    pub fix_buildings: bool,
    /// Maximum number of sweeps.
    pub max_iterations: usize,
    /// Sweeps stop once the largest update drops below this fraction of
    /// the largest displacement (or of 1, if that is smaller).
    pub relative_tolerance: f64,
    pub solver: SmootherKind,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            top_height: 100.0,
            fix_buildings: false,
            max_iterations: 1000,
            relative_tolerance: 1e-3,
            solver: SmootherKind::Unassembled,
        }
    }
}

impl SmoothingConfig {
    pub fn new(top_height: f64, fix_buildings: bool) -> Self {
        Self {
            top_height,
            fix_buildings,
            ..Self::default()
        }
    }
}
