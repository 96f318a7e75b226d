//! Classification of ground triangles into building, halo and ground.

use crate::geom::city::City;
use crate::geom::mesh::{GROUND, HALO, Mesh2D};
use log::debug;

/// Marks every triangle of `mesh` with the index of the building whose
/// footprint contains its centroid, then marks ground triangles sharing a
/// vertex with a building as halo.
///
/// The two passes must run in this order: the halo pass reads the vertex
/// flags written by the first. Where footprints overlap, the building
/// that comes first in the city wins.
pub fn compute_domain_markers(mesh: &mut Mesh2D, city: &City) {
    mesh.markers = vec![GROUND; mesh.triangles.len()];
    let mut is_building_vertex = vec![false; mesh.vertices.len()];

    for t in 0..mesh.triangles.len() {
        let tri = mesh.triangles[t];
        if let Some(b) = city.find_building(mesh.centroid(t)) {
            mesh.markers[t] = b as i32;
            for v in tri.as_array() {
                is_building_vertex[v] = true;
            }
        }
        // Vertices inside a footprint count even when the triangle does
        // not; this matters for meshes that do not follow the outlines.
        for v in tri.as_array() {
            if !is_building_vertex[v] && city.find_building(mesh.vertices[v]).is_some() {
                is_building_vertex[v] = true;
            }
        }
    }

    let mut num_halo = 0;
    for (tri, marker) in mesh.triangles.iter().zip(mesh.markers.iter_mut()) {
        if *marker == GROUND && tri.as_array().iter().any(|&v| is_building_vertex[v]) {
            *marker = HALO;
            num_halo += 1;
        }
    }

    let num_building = mesh.markers.iter().filter(|&&m| m >= 0).count();
    debug!(
        "Domain markers: {} building, {} halo, {} ground triangles",
        num_building,
        num_halo,
        mesh.markers.len() - num_building - num_halo
    );
}
