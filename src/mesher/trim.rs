//! Removal of the cells that fill building volumes.

use crate::MeshError;
use crate::geom::city::City;
use crate::geom::mesh::{INTERIOR, Mesh2D, VolumeMesh};
use crate::mesher::extrude::{PointCompaction, check_markers, skips_layer};
use anyhow::Result;
use log::info;

/// Removes the prisms of building columns below the roof from a fully
/// layered mesh (see [`crate::mesher::extrude::layer_mesh`]).
///
/// `volume` must hold three cells per triangle of `mesh2d` per layer, in
/// layer-major order. Vertex coordinates are kept as they are, so the
/// mesh may already have been smoothed. The first kept prism of each
/// building column is re-marked with the building index, and unused
/// vertices are dropped in order. The result matches
/// [`crate::mesher::extrude::extrude`] with the same city, up to the
/// coordinates.
pub fn trim_volume_mesh(volume: &VolumeMesh, mesh2d: &Mesh2D, city: &City) -> Result<VolumeMesh> {
    check_markers(mesh2d, city)?;
    let num_triangles = mesh2d.num_triangles();
    let expected = 3 * num_triangles * volume.num_layers;
    if volume.num_cells() != expected || volume.markers.len() != expected {
        return Err(MeshError::Config(format!(
            "trim needs a fully layered mesh with {expected} cells, got {} cells and {} markers",
            volume.num_cells(),
            volume.markers.len()
        ))
        .into());
    }

    let dz = volume.layer_height;
    let mut compaction = PointCompaction::new(volume.num_vertices());
    let mut kept = Vec::new();
    let mut markers = Vec::new();
    let mut first_layer_added = vec![false; num_triangles];

    for layer in 0..volume.num_layers {
        for t in 0..num_triangles {
            let marker2d = mesh2d.markers[t];
            if skips_layer(marker2d, layer, dz, city) {
                continue;
            }
            let marker = if first_layer_added[t] {
                INTERIOR
            } else {
                marker2d
            };
            first_layer_added[t] = true;

            let first = 3 * (layer * num_triangles + t);
            for cell in &volume.cells[first..first + 3] {
                for v in cell.as_array() {
                    compaction.mark(v);
                }
                kept.push(*cell);
            }
            markers.extend([marker, INTERIOR, INTERIOR]);
        }
    }

    let vertices = compaction.finish(|i| volume.vertices[i]);
    let cells = kept.iter().map(|c| compaction.remap(c)).collect();

    let trimmed = VolumeMesh {
        vertices,
        cells,
        markers,
        num_layers: volume.num_layers,
        layer_height: dz,
    };
    info!(
        "Trimmed volume mesh from {} to {} cells ({} vertices)",
        volume.num_cells(),
        trimmed.num_cells(),
        trimmed.num_vertices()
    );
    Ok(trimmed)
}
