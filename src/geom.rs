pub mod bboxes;
pub mod building;
pub mod city;
pub mod grid;
pub mod mesh;
pub mod point;
pub mod point2d;
pub mod polygon;
pub mod tetrahedron;
pub mod triangles;
pub mod vector;

/// Geometric precision
const EPS: f64 = 1e-13;
