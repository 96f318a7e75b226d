//! Numerical stages that operate on finished meshes.

pub mod smoothing;
