//! Collection of buildings with a spatial index over their footprints.

use crate::MeshError;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::building::Building;
use crate::geom::point2d::Point2D;
use crate::geom::polygon::segments_cross;
use anyhow::Result;
use rstar::{AABB, RTree, RTreeObject};

/// Bounding box of one footprint, tagged with the building index.
#[derive(Debug, Clone)]
struct FootprintEnvelope {
    building: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for FootprintEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Buildings of a city block.
///
/// The R-tree is rebuilt every time footprints change, so lookups
/// always see the current geometry.
#[derive(Debug, Clone)]
pub struct City {
    buildings: Vec<Building>,
    index: RTree<FootprintEnvelope>,
}

impl Default for City {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl City {
    pub fn new(buildings: Vec<Building>) -> Self {
        let index = build_index(&buildings);
        Self { buildings, index }
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building(&self, idx: usize) -> Option<&Building> {
        self.buildings.get(idx)
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn add_building(&mut self, building: Building) {
        self.buildings.push(building);
        self.index = build_index(&self.buildings);
    }

    /// Applies `f` to every building and rebuilds the spatial index.
    pub fn modify_buildings<F: FnMut(&mut Building)>(&mut self, f: F) {
        self.buildings.iter_mut().for_each(f);
        self.index = build_index(&self.buildings);
    }

    /// Returns the index of the first building (in storage order) whose
    /// footprint contains `p`.
    pub fn find_building(&self, p: Point2D) -> Option<usize> {
        self.candidates(p, 0.0)
            .into_iter()
            .find(|&i| self.buildings[i].footprint.contains(p))
    }

    /// Like [`City::find_building`] but also accepts points within `tol`
    /// of a footprint outline.
    pub fn find_building_or_touching(&self, p: Point2D, tol: f64) -> Option<usize> {
        self.candidates(p, tol)
            .into_iter()
            .find(|&i| self.buildings[i].footprint.contains_or_touches(p, tol))
    }

    /// Candidate building indices from the R-tree, sorted ascending.
    fn candidates(&self, p: Point2D, tol: f64) -> Vec<usize> {
        let query = AABB::from_corners([p.x - tol, p.y - tol], [p.x + tol, p.y + tol]);
        let mut found: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&query)
            .map(|e| e.building)
            .collect();
        found.sort_unstable();
        found
    }

    /// Checks that every footprint lies inside `domain` and that no two
    /// footprint outlines cross each other.
    pub fn validate(&self, domain: &BoundingBox2D) -> Result<()> {
        for (i, b) in self.buildings.iter().enumerate() {
            let bbox = b.footprint.bounding_box();
            if !domain.overlaps(&bbox, 0.0) {
                return Err(MeshError::Config(format!(
                    "building {i} ({}) lies outside the domain",
                    b.uid
                ))
                .into());
            }
            if !domain.contains_box(&bbox, 0.0) {
                return Err(MeshError::Geometry(format!(
                    "building {i} ({}) crosses the domain boundary",
                    b.uid
                ))
                .into());
            }
        }

        for pair in self.index.intersection_candidates_with_other_tree(&self.index) {
            let (i, j) = (pair.0.building, pair.1.building);
            if i >= j {
                continue;
            }
            let fi = &self.buildings[i].footprint;
            let fj = &self.buildings[j].footprint;
            let crossing = fi
                .edges()
                .any(|(a0, a1)| fj.edges().any(|(b0, b1)| segments_cross(a0, a1, b0, b1)));
            if crossing {
                return Err(MeshError::Geometry(format!(
                    "footprints of buildings {i} and {j} intersect"
                ))
                .into());
            }
        }
        Ok(())
    }
}

fn build_index(buildings: &[Building]) -> RTree<FootprintEnvelope> {
    let envelopes: Vec<FootprintEnvelope> = buildings
        .iter()
        .enumerate()
        .map(|(building, b)| {
            let bbox = b.footprint.bounding_box();
            FootprintEnvelope {
                building,
                aabb: AABB::from_corners([bbox.min.x, bbox.min.y], [bbox.max.x, bbox.max.y]),
            }
        })
        .collect();
    RTree::bulk_load(envelopes)
}
