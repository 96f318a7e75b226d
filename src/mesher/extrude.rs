//! Extrusion of a classified ground triangulation into layered tetrahedra.

use crate::MeshError;
use crate::Point;
use crate::geom::city::City;
use crate::geom::mesh::{INTERIOR, Mesh2D, VolumeMesh};
use crate::geom::tetrahedron::TetrahedronIndex;
use anyhow::Result;
use log::info;

/// Number of layers and the uniform layer thickness for a domain of
/// `domain_height` meshed at `resolution`.
pub fn layer_count(domain_height: f64, resolution: f64) -> Result<(usize, f64)> {
    if resolution.is_nan() || resolution <= 0.0 {
        return Err(MeshError::Config(format!("resolution must be > 0, got {resolution}")).into());
    }
    if domain_height.is_nan() || domain_height <= 0.0 {
        return Err(MeshError::Config(format!(
            "domain height must be > 0, got {domain_height}"
        ))
        .into());
    }
    let num_layers = (domain_height / resolution).ceil() as usize;
    Ok((num_layers, domain_height / num_layers as f64))
}

/// True if the prism of a triangle with `marker` is left out of `layer`.
///
/// Building triangles skip every layer whose mid-height is below the
/// building height, and always skip the ground layer.
pub(crate) fn skips_layer(marker: i32, layer: usize, dz: f64, city: &City) -> bool {
    if marker < 0 {
        return false;
    }
    let height = city.buildings()[marker as usize].height;
    layer == 0 || layer as f64 * dz + 0.5 * dz < height
}

/// Checks that every building marker refers to a building of `city`.
pub(crate) fn check_markers(mesh2d: &Mesh2D, city: &City) -> Result<()> {
    if let Some(&m) = mesh2d.markers.iter().find(|&&m| m >= 0 && m as usize >= city.len()) {
        return Err(MeshError::Config(format!(
            "triangle marker {m} refers to a missing building ({} buildings)",
            city.len()
        ))
        .into());
    }
    Ok(())
}

/// Extrudes `mesh2d` to a tetrahedral mesh of height `domain_height`.
///
/// Building triangles only get prisms above their roof (see
/// [`skips_layer`]). The first prism of every column carries the 2D
/// marker on its first tetrahedron; all other cells are interior.
pub fn extrude(
    mesh2d: &Mesh2D,
    city: &City,
    ground_elevation: f64,
    domain_height: f64,
    resolution: f64,
) -> Result<VolumeMesh> {
    check_markers(mesh2d, city)?;
    let (num_layers, dz) = layer_count(domain_height, resolution)?;
    info!(
        "Extruding {} triangles into {} layers of height {:.3}",
        mesh2d.num_triangles(),
        num_layers,
        dz
    );
    let mesh = build_layers(mesh2d, num_layers, dz, ground_elevation, |t, layer| {
        !skips_layer(mesh2d.markers[t], layer, dz, city)
    });
    info!(
        "Volume mesh: {} vertices, {} cells",
        mesh.num_vertices(),
        mesh.num_cells()
    );
    Ok(mesh)
}

/// Extrudes every triangle through the full stack of layers, ignoring
/// buildings. The result is the input of
/// [`crate::mesher::trim::trim_volume_mesh`].
pub fn layer_mesh(
    mesh2d: &Mesh2D,
    ground_elevation: f64,
    domain_height: f64,
    resolution: f64,
) -> Result<VolumeMesh> {
    let (num_layers, dz) = layer_count(domain_height, resolution)?;
    info!(
        "Layering {} triangles into {} full layers of height {:.3}",
        mesh2d.num_triangles(),
        num_layers,
        dz
    );
    Ok(build_layers(mesh2d, num_layers, dz, ground_elevation, |_, _| true))
}

fn build_layers<F: Fn(usize, usize) -> bool>(
    mesh2d: &Mesh2D,
    num_layers: usize,
    dz: f64,
    ground_elevation: f64,
    emit: F,
) -> VolumeMesh {
    let layer_size = mesh2d.num_vertices();
    let mut compaction = PointCompaction::new((num_layers + 1) * layer_size);
    let mut cells = Vec::new();
    let mut markers = Vec::new();
    let mut first_layer_added = vec![false; mesh2d.num_triangles()];

    for layer in 0..num_layers {
        let offset = layer * layer_size;
        for (t, tri) in mesh2d.triangles.iter().enumerate() {
            if !emit(t, layer) {
                continue;
            }
            let marker = if first_layer_added[t] {
                INTERIOR
            } else {
                mesh2d.markers[t]
            };
            first_layer_added[t] = true;

            let u0 = tri.0 + offset;
            let u1 = tri.1 + offset;
            let u2 = tri.2 + offset;
            let v0 = u0 + layer_size;
            let v1 = u1 + layer_size;
            let v2 = u2 + layer_size;
            for tet in prism_tetrahedra(u0, u1, u2, v0, v1, v2) {
                for v in tet.as_array() {
                    compaction.mark(v);
                }
                cells.push(tet);
            }
            markers.extend([marker, INTERIOR, INTERIOR]);
        }
    }

    let vertices = compaction.finish(|i| {
        let p = mesh2d.vertices[i % layer_size];
        Point::new(p.x, p.y, (i / layer_size) as f64 * dz + ground_elevation)
    });
    for cell in cells.iter_mut() {
        *cell = compaction.remap(cell);
    }

    VolumeMesh {
        vertices,
        cells,
        markers,
        num_layers,
        layer_height: dz,
    }
}

/// Splits the prism with bottom `u*` and top `v*` into three tetrahedra by
/// connecting the first vertex of each bottom edge to the second vertex of
/// the matching top edge. The first tetrahedron holds the bottom face.
pub(crate) fn prism_tetrahedra(
    u0: usize,
    u1: usize,
    u2: usize,
    v0: usize,
    v1: usize,
    v2: usize,
) -> [TetrahedronIndex; 3] {
    [
        TetrahedronIndex(u0, u1, u2, v2),
        TetrahedronIndex(u0, v1, u1, v2),
        TetrahedronIndex(u0, v0, v1, v2),
    ]
}

/// Order-preserving renumbering of the points used by a set of cells.
#[derive(Debug, Clone)]
pub struct PointCompaction {
    new_index: Vec<Option<usize>>,
}

impl PointCompaction {
    pub fn new(num_points: usize) -> Self {
        Self {
            new_index: vec![None; num_points],
        }
    }

    /// Flags point `i` as used.
    pub fn mark(&mut self, i: usize) {
        self.new_index[i] = Some(0);
    }

    /// Assigns dense indices to the used points, in increasing original
    /// order, and returns their coordinates.
    pub fn finish<F: Fn(usize) -> Point>(&mut self, point: F) -> Vec<Point> {
        let mut vertices = Vec::new();
        for (i, slot) in self.new_index.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(vertices.len());
                vertices.push(point(i));
            }
        }
        vertices
    }

    /// Dense index of a used point. Panics for unused points.
    pub fn index(&self, i: usize) -> usize {
        self.new_index[i].unwrap_or_else(|| panic!("point {i} was not marked as used"))
    }

    pub fn remap(&self, cell: &TetrahedronIndex) -> TetrahedronIndex {
        TetrahedronIndex(
            self.index(cell.0),
            self.index(cell.1),
            self.index(cell.2),
            self.index(cell.3),
        )
    }

    pub fn num_used(&self) -> usize {
        self.new_index.iter().filter(|s| s.is_some()).count()
    }
}
