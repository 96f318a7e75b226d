//! Surface meshes: volume boundaries, open ground surfaces and the
//! visualization surfaces of a city.

use crate::MeshError;
use crate::Point;
use crate::TriangleIndex;
use crate::geom::bboxes::{BoundingBox2D, bounding_box};
use crate::geom::city::City;
use crate::geom::grid::GridField;
use crate::geom::mesh::{GROUND, Mesh, Mesh2D, VolumeMesh};
use crate::geom::polygon::Polygon;
use crate::mesher::markers::compute_domain_markers;
use crate::mesher::triangulate::Triangulator;
use anyhow::Result;
use log::info;
use std::collections::HashMap;

/// A face key with sorted vertex indices for hashing.
#[derive(Hash, Eq, PartialEq)]
struct FaceKey([usize; 3]);

impl FaceKey {
    fn new(a: usize, b: usize, c: usize) -> Self {
        let mut arr = [a, b, c];
        arr.sort();
        FaceKey(arr)
    }
}

/// The four faces of a tetrahedron, each with the opposite vertex.
fn tet_faces(v: [usize; 4]) -> [([usize; 3], usize); 4] {
    [
        ([v[0], v[1], v[2]], v[3]),
        ([v[0], v[1], v[3]], v[2]),
        ([v[0], v[2], v[3]], v[1]),
        ([v[1], v[2], v[3]], v[0]),
    ]
}

/// Returns the faces referenced by exactly one cell, oriented with
/// normals pointing out of the volume.
///
/// Only vertices on the boundary are kept, renumbered in their original
/// order.
pub fn extract_boundary_3d(volume: &VolumeMesh) -> Mesh {
    let mut face_count: HashMap<FaceKey, usize> = HashMap::new();
    for cell in &volume.cells {
        for (face, _) in tet_faces(cell.as_array()) {
            *face_count
                .entry(FaceKey::new(face[0], face[1], face[2]))
                .or_insert(0) += 1;
        }
    }

    let mut faces = Vec::new();
    for cell in &volume.cells {
        for ([a, b, c], d) in tet_faces(cell.as_array()) {
            if face_count[&FaceKey::new(a, b, c)] != 1 {
                continue;
            }
            let pa = volume.vertices[a];
            let normal = (volume.vertices[b] - pa).cross(volume.vertices[c] - pa);
            if normal.dot(volume.vertices[d] - pa) > 0.0 {
                faces.push(TriangleIndex(a, c, b));
            } else {
                faces.push(TriangleIndex(a, b, c));
            }
        }
    }

    let surface = compact_surface(&volume.vertices, faces);
    info!(
        "Extracted boundary with {} faces and {} vertices",
        surface.face_count(),
        surface.vertex_count()
    );
    surface
}

/// Drops the top and the vertical sides from the boundary of a volume
/// mesh, keeping the ground and building surfaces.
///
/// A face is on top when all its vertices are the highest of their
/// vertical column, so the top does not need to be flat. A face is on a
/// side when all its vertices lie on the same vertical plane of the
/// bounding box.
pub fn extract_open_surface_3d(boundary: &Mesh) -> Mesh {
    let Some((lo, hi)) = bounding_box(&boundary.vertices) else {
        return Mesh::default();
    };
    let tol = 1e-9 * (hi - lo).length().max(1.0);
    let bbox = BoundingBox2D::new(lo.xy(), hi.xy());

    let mut column_top: HashMap<(i64, i64), f64> = HashMap::new();
    for p in &boundary.vertices {
        let top = column_top.entry(column_key(p, tol)).or_insert(f64::NEG_INFINITY);
        *top = top.max(p.z);
    }
    let is_top = |p: &Point| p.z >= column_top[&column_key(p, tol)] - tol;

    let faces: Vec<TriangleIndex> = boundary
        .faces
        .iter()
        .filter(|f| {
            let pts = f.as_array().map(|v| boundary.vertices[v]);
            !(pts.iter().all(&is_top) || is_on_side(&pts, &bbox, tol))
        })
        .copied()
        .collect();

    compact_surface(&boundary.vertices, faces)
}

/// Concatenates surfaces, offsetting the face indices of each. Shared
/// vertices are not merged.
pub fn merge_surfaces_3d(surfaces: &[Mesh]) -> Mesh {
    let mut merged = Mesh::default();
    for surface in surfaces {
        let offset = merged.vertices.len();
        merged.vertices.extend_from_slice(&surface.vertices);
        merged.faces.extend(
            surface
                .faces
                .iter()
                .map(|f| TriangleIndex(f.0 + offset, f.1 + offset, f.2 + offset)),
        );
    }
    merged
}

/// Builds visualization surfaces: the ground first, then one surface per
/// building (flat roof plus walls down to the lowest ground elevation).
///
/// The surfaces do not conform to each other. With `flat_ground` the
/// ground sits at the minimum of `dem`; otherwise ground triangles sample
/// `dem` at their vertices and triangles in or near buildings use the
/// lowest of their vertex samples, each vertex taking the smallest value
/// over its triangles.
pub fn build_surfaces_3d<T: Triangulator + ?Sized>(
    city: &City,
    dem: &GridField,
    bbox: &BoundingBox2D,
    resolution: f64,
    flat_ground: bool,
    triangulator: &T,
) -> Result<Vec<Mesh>> {
    if resolution.is_nan() || resolution <= 0.0 {
        return Err(MeshError::Config(format!("resolution must be > 0, got {resolution}")).into());
    }
    let max_area = 0.5 * resolution * resolution;
    let mut surfaces = Vec::with_capacity(city.len() + 1);

    info!("Generating ground surface");
    let mut mesh2d = triangulator.triangulate(&Polygon::rectangle(bbox), &[], max_area)?;
    compute_domain_markers(&mut mesh2d, city);

    let vertices: Vec<Point> = if flat_ground {
        let z = dem.min();
        mesh2d.vertices.iter().map(|p| Point::from_xy(*p, z)).collect()
    } else {
        let z_max = dem.max();
        let mut vertices: Vec<Point> = mesh2d
            .vertices
            .iter()
            .map(|p| Point::from_xy(*p, z_max))
            .collect();
        for (tri, marker) in mesh2d.triangles.iter().zip(&mesh2d.markers) {
            let samples = tri.as_array().map(|v| dem.evaluate(mesh2d.vertices[v]));
            let z_min = samples.iter().copied().fold(f64::INFINITY, f64::min);
            for (v, z) in tri.as_array().into_iter().zip(samples) {
                let z = if *marker == GROUND { z } else { z_min };
                vertices[v].z = vertices[v].z.min(z);
            }
        }
        vertices
    };
    surfaces.push(Mesh::new(vertices, mesh2d.triangles));

    info!("Generating {} building surfaces", city.len());
    let ground_height = dem.min();
    for building in city.buildings() {
        let mut footprint = building.footprint.clone();
        if footprint.signed_area() < 0.0 {
            footprint.vertices.reverse();
        }
        let top = triangulator.triangulate(&footprint, &[], max_area)?;
        surfaces.push(extrude_footprint(
            &top,
            footprint.len(),
            building.roof_height(),
            ground_height,
        ));
    }
    Ok(surfaces)
}

/// Closed-top prism surface from a roof triangulation whose first
/// `num_boundary` vertices are the counter-clockwise footprint outline.
fn extrude_footprint(
    top: &Mesh2D,
    num_boundary: usize,
    roof: f64,
    ground: f64,
) -> Mesh {
    let num_top = top.num_vertices();
    let mut vertices: Vec<Point> = top
        .vertices
        .iter()
        .map(|p| Point::from_xy(*p, roof))
        .collect();
    vertices.extend(
        top.vertices[..num_boundary]
            .iter()
            .map(|p| Point::from_xy(*p, ground)),
    );

    let mut faces = top.triangles.clone();
    for i in 0..num_boundary {
        let v0 = i;
        let v1 = (i + 1) % num_boundary;
        let v2 = v0 + num_top;
        let v3 = v1 + num_top;
        faces.push(TriangleIndex(v0, v2, v1));
        faces.push(TriangleIndex(v1, v2, v3));
    }
    Mesh::new(vertices, faces)
}

/// True if all three points lie on the same side of `bbox`.
fn is_on_side(pts: &[Point; 3], bbox: &BoundingBox2D, tol: f64) -> bool {
    let sides = pts.map(|p| bbox.sides_at(p.xy(), tol));
    (0..4).any(|s| sides.iter().all(|at| at[s]))
}

fn column_key(p: &Point, tol: f64) -> (i64, i64) {
    let scale = 1.0 / tol;
    ((p.x * scale).round() as i64, (p.y * scale).round() as i64)
}

/// Keeps the vertices used by `faces`, in their original order.
fn compact_surface(vertices: &[Point], faces: Vec<TriangleIndex>) -> Mesh {
    let mut new_index = vec![usize::MAX; vertices.len()];
    for f in &faces {
        for v in f.as_array() {
            new_index[v] = 0;
        }
    }
    let mut kept = Vec::new();
    for (i, slot) in new_index.iter_mut().enumerate() {
        if *slot != usize::MAX {
            *slot = kept.len();
            kept.push(vertices[i]);
        }
    }
    let faces = faces
        .iter()
        .map(|f| TriangleIndex(new_index[f.0], new_index[f.1], new_index[f.2]))
        .collect();
    Mesh::new(kept, faces)
}
