use crate::MeshError;
use crate::UID;
use crate::geom::point2d::Point2D;
use crate::geom::polygon::Polygon;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Extruded building: a footprint standing on the ground with a flat roof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub uid: UID,
    pub footprint: Polygon,
    /// Roof height above the building's ground level.
    pub height: f64,
    /// Absolute ground elevation at the footprint.
    pub ground_height: f64,
}

impl Building {
    pub fn new(footprint: Polygon, height: f64, ground_height: f64) -> Result<Self> {
        if height.is_nan() || height <= 0.0 {
            return Err(MeshError::Geometry(format!(
                "building height must be > 0, got {height}"
            ))
            .into());
        }
        Ok(Self {
            uid: UID::new(),
            footprint,
            height,
            ground_height,
        })
    }

    pub fn with_uid(mut self, uid: UID) -> Self {
        self.uid = uid;
        self
    }

    /// Absolute elevation of the roof.
    pub fn roof_height(&self) -> f64 {
        self.ground_height + self.height
    }

    pub fn contains(&self, p: Point2D) -> bool {
        self.footprint.contains(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint() -> Polygon {
        Polygon::new(vec![
            Point2D::new(0., 0.),
            Point2D::new(4., 0.),
            Point2D::new(4., 4.),
            Point2D::new(0., 4.),
        ])
        .unwrap()
    }

    #[test]
    fn test_roof_height() {
        let b = Building::new(footprint(), 12., 3.).unwrap();
        assert!((b.roof_height() - 15.).abs() < 1e-12);
        assert!(b.contains(Point2D::new(2., 2.)));
    }

    #[test]
    fn test_rejects_non_positive_height() {
        assert!(Building::new(footprint(), 0., 3.).is_err());
        assert!(Building::new(footprint(), f64::NAN, 3.).is_err());
    }

    #[test]
    fn test_with_uid() {
        let b = Building::new(footprint(), 5., 0.)
            .unwrap()
            .with_uid(UID::from("house"));
        assert_eq!(b.uid.as_str(), "house");
    }
}
