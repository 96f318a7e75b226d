use crate::Point;
use serde::{Deserialize, Serialize};

/// A tetrahedron defined by four point indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TetrahedronIndex(pub usize, pub usize, pub usize, pub usize);

impl TetrahedronIndex {
    pub fn as_array(&self) -> [usize; 4] {
        [self.0, self.1, self.2, self.3]
    }
}

/// Signed volume; positive when `pt3` lies on the side of the
/// counter-clockwise face `pt0`, `pt1`, `pt2` that its normal points to.
pub fn tetrahedron_signed_volume(pt0: Point, pt1: Point, pt2: Point, pt3: Point) -> f64 {
    let e1 = pt1 - pt0;
    let e2 = pt2 - pt0;
    let e3 = pt3 - pt0;
    e1.dot(e2.cross(e3)) / 6.
}
