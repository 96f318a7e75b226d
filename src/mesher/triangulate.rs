//! Constrained quality triangulation of the ground plane.

use crate::MeshError;
use crate::TriangleIndex;
use crate::geom::bboxes::BoundingBox2D;
use crate::geom::city::City;
use crate::geom::mesh::Mesh2D;
use crate::geom::point2d::Point2D;
use crate::geom::polygon::Polygon;
use crate::mesher::markers::compute_domain_markers;
use anyhow::Result;
use log::{debug, info, warn};
use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{
    AngleLimit, ConstrainedDelaunayTriangulation, Point2, RefinementParameters, Triangulation,
};
use std::collections::HashSet;

/// Produces a planar triangulation of a polygonal region.
///
/// Implementations must return every input vertex, in input order
/// (boundary first, then each subdomain), ahead of any vertex they add,
/// and must keep the subdomain outlines as unions of triangle edges.
/// Triangles inside subdomains are kept; subdomains are not holes.
/// The boundary may only be concave when there are no subdomains.
pub trait Triangulator {
    fn triangulate(
        &self,
        boundary: &Polygon,
        subdomains: &[&Polygon],
        max_area: f64,
    ) -> Result<Mesh2D>;
}

/// Constrained Delaunay refinement backed by `spade`.
#[derive(Debug, Clone, Copy)]
pub struct SpadeTriangulator {
    /// Minimum interior angle in degrees. Refinement is only guaranteed to
    /// terminate below about 28.6 degrees.
    pub min_angle_deg: f64,
}

impl Default for SpadeTriangulator {
    fn default() -> Self {
        Self {
            min_angle_deg: 25.0,
        }
    }
}

impl SpadeTriangulator {
    pub fn new(min_angle_deg: f64) -> Self {
        Self { min_angle_deg }
    }
}

impl Triangulator for SpadeTriangulator {
    fn triangulate(
        &self,
        boundary: &Polygon,
        subdomains: &[&Polygon],
        max_area: f64,
    ) -> Result<Mesh2D> {
        if max_area.is_nan() || max_area <= 0.0 {
            return Err(MeshError::Config(format!(
                "max triangle area must be > 0, got {max_area}"
            ))
            .into());
        }

        let mut cdt = ConstrainedDelaunayTriangulation::<Point2<f64>>::new();
        for polygon in std::iter::once(boundary).chain(subdomains.iter().copied()) {
            let handles = polygon
                .vertices
                .iter()
                .map(|p| cdt.insert(Point2::new(p.x, p.y)))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| MeshError::Triangulation(format!("{e:?}")))?;

            for i in 0..handles.len() {
                let from = handles[i];
                let to = handles[(i + 1) % handles.len()];
                if from == to {
                    continue;
                }
                // Shared outlines of touching footprints are added once
                if let Some(edge) = cdt.get_edge_from_neighbors(from, to) {
                    if cdt.is_constraint_edge(edge.fix().as_undirected()) {
                        continue;
                    }
                }
                if !cdt.can_add_constraint(from, to) {
                    return Err(MeshError::Geometry(format!(
                        "segment {} -> {} crosses another outline",
                        polygon.vertices[i],
                        polygon.vertices[(i + 1) % handles.len()]
                    ))
                    .into());
                }
                cdt.add_constraint(from, to);
            }
        }

        let num_input = cdt.num_vertices();
        let budget = (4.0 * boundary.area() / max_area).ceil() as usize + 10 * num_input + 1000;
        debug!(
            "Refining {} input vertices, max area {:.3}, vertex budget {}",
            num_input, max_area, budget
        );
        let params = RefinementParameters::<f64>::new()
            .with_angle_limit(AngleLimit::from_deg(self.min_angle_deg))
            .with_max_allowed_area(max_area)
            .with_max_additional_vertices(budget)
            .exclude_outer_faces(subdomains.is_empty());
        let result = cdt.refine(params);
        if !result.refinement_complete {
            warn!(
                "Triangle refinement stopped at the vertex budget ({} vertices); quality bounds may not hold",
                cdt.num_vertices()
            );
        }

        let vertices: Vec<Point2D> = cdt
            .vertices()
            .map(|v| {
                let p = v.position();
                Point2D::new(p.x, p.y)
            })
            .collect();
        let excluded: HashSet<FixedFaceHandle<InnerTag>> =
            result.excluded_faces.into_iter().collect();
        let triangles: Vec<TriangleIndex> = cdt
            .inner_faces()
            .filter(|face| !excluded.contains(&face.fix()))
            .map(|face| {
                let [v0, v1, v2] = face.vertices();
                TriangleIndex(v0.fix().index(), v1.fix().index(), v2.fix().index())
            })
            .collect();

        Ok(Mesh2D::new(vertices, triangles))
    }
}

/// Structured triangulation of the boundary's bounding box.
///
/// Splits an `nx` by `ny` grid of rectangles into two triangles each.
/// Subdomain outlines are respected only when they run along grid lines,
/// and their vertices are not inserted; useful for predictable meshes
/// in tests and for axis-aligned layouts.
#[derive(Debug, Clone, Copy)]
pub struct GridTriangulator {
    pub nx: usize,
    pub ny: usize,
}

impl GridTriangulator {
    pub fn new(nx: usize, ny: usize) -> Self {
        Self { nx, ny }
    }
}

impl Triangulator for GridTriangulator {
    fn triangulate(
        &self,
        boundary: &Polygon,
        _subdomains: &[&Polygon],
        _max_area: f64,
    ) -> Result<Mesh2D> {
        if self.nx == 0 || self.ny == 0 {
            return Err(MeshError::Config("grid triangulator needs nx, ny > 0".to_string()).into());
        }
        let bbox = boundary.bounding_box();
        let dx = bbox.width() / self.nx as f64;
        let dy = bbox.height() / self.ny as f64;

        let mut vertices = Vec::with_capacity((self.nx + 1) * (self.ny + 1));
        for j in 0..=self.ny {
            for i in 0..=self.nx {
                vertices.push(Point2D::new(
                    bbox.min.x + i as f64 * dx,
                    bbox.min.y + j as f64 * dy,
                ));
            }
        }

        let row = self.nx + 1;
        let mut triangles = Vec::with_capacity(2 * self.nx * self.ny);
        for j in 0..self.ny {
            for i in 0..self.nx {
                let v00 = j * row + i;
                let v10 = v00 + 1;
                let v01 = v00 + row;
                let v11 = v01 + 1;
                triangles.push(TriangleIndex(v00, v10, v11));
                triangles.push(TriangleIndex(v00, v11, v01));
            }
        }
        Ok(Mesh2D::new(vertices, triangles))
    }
}

/// Builds the classified ground triangulation of `bbox`.
///
/// Footprints become constrained outlines (not holes), triangles are
/// bounded by area `0.5 * resolution^2`, and every triangle is marked as
/// building, halo or ground by [`compute_domain_markers`].
pub fn build_mesh_2d<T: Triangulator + ?Sized>(
    city: &City,
    bbox: &BoundingBox2D,
    resolution: f64,
    triangulator: &T,
) -> Result<Mesh2D> {
    if resolution.is_nan() || resolution <= 0.0 {
        return Err(MeshError::Config(format!("resolution must be > 0, got {resolution}")).into());
    }
    if bbox.width() <= 0.0 || bbox.height() <= 0.0 {
        return Err(MeshError::Config("domain bounding box is empty".to_string()).into());
    }
    city.validate(bbox)?;
    if city.is_empty() {
        warn!("City has no buildings, the whole domain is meshed as ground");
    }

    info!(
        "Generating 2D mesh of {:.1} x {:.1} domain with {} buildings, resolution {}",
        bbox.width(),
        bbox.height(),
        city.len(),
        resolution
    );

    let boundary = Polygon::rectangle(bbox);
    let subdomains: Vec<&Polygon> = city.buildings().iter().map(|b| &b.footprint).collect();
    let max_area = 0.5 * resolution * resolution;
    let mut mesh = triangulator.triangulate(&boundary, &subdomains, max_area)?;
    mesh.validate(1e-12 * resolution * resolution)?;

    compute_domain_markers(&mut mesh, city);

    info!(
        "2D mesh: {} vertices, {} triangles",
        mesh.num_vertices(),
        mesh.num_triangles()
    );
    Ok(mesh)
}
