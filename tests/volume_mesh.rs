use citymesh::mesher::extrude::PointCompaction;
use citymesh::sim::smoothing::{BoundaryConditions, StiffnessMatrix, VertexMarker, local_stiffness};
use citymesh::{
    BoundingBox2D, Building, City, GROUND, Grid, GridField, GridTriangulator, HALO, INTERIOR,
    Mesh2D, MeshingConfig, Point, Point2D, Polygon, SmoothingConfig, SpadeTriangulator,
    TetrahedronIndex, build_mesh_2d, build_volume_mesh, extract_boundary_3d, extrude, layer_mesh,
    smooth_volume_mesh, trim_volume_mesh,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rectangle(x0: f64, y0: f64, width: f64, depth: f64) -> Polygon {
    Polygon::new(vec![
        Point2D::new(x0, y0),
        Point2D::new(x0 + width, y0),
        Point2D::new(x0 + width, y0 + depth),
        Point2D::new(x0, y0 + depth),
    ])
    .unwrap()
}

fn domain() -> BoundingBox2D {
    BoundingBox2D::new(Point2D::new(0., 0.), Point2D::new(40., 40.))
}

/// One 10 x 10 building aligned with a 5 m grid
fn grid_city_with_height(height: f64) -> (City, Mesh2D) {
    let city = City::new(vec![
        Building::new(rectangle(10., 10., 10., 10.), height, 0.).unwrap(),
    ]);
    let mesh2d = build_mesh_2d(&city, &domain(), 5., &GridTriangulator::new(8, 8)).unwrap();
    (city, mesh2d)
}

fn grid_city() -> (City, Mesh2D) {
    grid_city_with_height(7.5)
}

fn spade_city() -> City {
    City::new(vec![
        Building::new(rectangle(5., 5., 12., 8.), 12., 0.).unwrap(),
        Building::new(
            Polygon::new(vec![
                Point2D::new(22., 20.),
                Point2D::new(34., 20.),
                Point2D::new(34., 26.),
                Point2D::new(28., 26.),
                Point2D::new(28., 34.),
                Point2D::new(22., 34.),
            ])
            .unwrap(),
            21.,
            0.,
        )
        .unwrap(),
    ])
}

fn sloped_dem() -> GridField {
    GridField::from_fn(Grid::new(domain(), 9, 9).unwrap(), |p| 0.05 * p.x + 0.02 * p.y)
}

fn check_partition(mesh2d: &Mesh2D, city: &City, bbox: &BoundingBox2D) {
    assert!((mesh2d.total_area() - bbox.area()).abs() < 1e-6 * bbox.area());
    let mut building_area = vec![0.0; city.len()];
    for t in 0..mesh2d.num_triangles() {
        let marker = mesh2d.markers[t];
        assert!(marker >= GROUND, "triangle {t} has marker {marker}");
        if marker >= 0 {
            building_area[marker as usize] += mesh2d.area(t);
        }
    }
    for (b, building) in city.buildings().iter().enumerate() {
        let expected = building.footprint.area();
        assert!(
            (building_area[b] - expected).abs() < 1e-6 * expected,
            "building {b}: {} vs {expected}",
            building_area[b]
        );
    }
}

#[test]
fn test_footprints_partition_the_ground() {
    let city = spade_city();
    let mesh2d = build_mesh_2d(&city, &domain(), 4., &SpadeTriangulator::default()).unwrap();
    check_partition(&mesh2d, &city, &domain());

    // Halo triangles touch a building vertex
    for (t, &marker) in mesh2d.markers.iter().enumerate() {
        if marker != HALO {
            continue;
        }
        let touches = mesh2d.triangles[t].as_array().into_iter().any(|v| {
            mesh2d
                .triangles
                .iter()
                .zip(&mesh2d.markers)
                .any(|(tri, &m)| m >= 0 && tri.as_array().contains(&v))
        });
        assert!(touches, "halo triangle {t} does not touch a building");
    }
}

#[test]
fn test_layer_truncation() {
    let (city, mesh2d) = grid_city();
    assert_eq!(mesh2d.markers.iter().filter(|&&m| m == 0).count(), 8);

    let volume = extrude(&mesh2d, &city, 0., 20., 5.).unwrap();
    assert_eq!(volume.num_layers, 4);
    // Building columns skip layer 0 only: mid-height of layer 1 is 7.5
    assert_eq!(volume.num_cells(), 3 * (8 * 3 + 120 * 4));
    assert_eq!(volume.markers.iter().filter(|&&m| m == 0).count(), 8);
    assert_eq!(
        volume
            .markers
            .iter()
            .filter(|&&m| m == HALO || m == GROUND)
            .count(),
        120
    );
    assert_eq!(
        volume.markers.iter().filter(|&&m| m == INTERIOR).count(),
        volume.num_cells() - 128
    );

    let lowest = volume
        .vertices
        .iter()
        .filter(|p| p.xy().is_close(&Point2D::new(15., 15.)))
        .map(|p| p.z)
        .fold(f64::INFINITY, f64::min);
    assert!((lowest - 5.).abs() < 1e-12);
}

#[test]
fn test_no_orphan_vertices() {
    let (city, mesh2d) = grid_city();
    let volume = extrude(&mesh2d, &city, 2., 20., 5.).unwrap();
    volume.validate().unwrap();
    assert!(volume.vertex_degrees().iter().all(|&d| d > 0));

    // The vertex inside the footprint only exists from layer 1
    let full = layer_mesh(&mesh2d, 2., 20., 5.).unwrap();
    assert_eq!(full.num_vertices(), 81 * 5);
    assert_eq!(volume.num_vertices(), full.num_vertices() - 1);
}

#[test]
fn test_compaction_is_order_preserving_bijection() {
    let mut compaction = PointCompaction::new(10);
    for i in [7, 2, 9, 2, 4] {
        compaction.mark(i);
    }
    let points = compaction.finish(|i| Point::new(i as f64, 0., 0.));
    assert_eq!(compaction.num_used(), 4);
    assert_eq!(
        points.iter().map(|p| p.x as usize).collect::<Vec<_>>(),
        vec![2, 4, 7, 9]
    );
    for (new, old) in [2, 4, 7, 9].into_iter().enumerate() {
        assert_eq!(compaction.index(old), new);
    }
    assert_eq!(
        compaction.remap(&TetrahedronIndex(9, 7, 4, 2)),
        TetrahedronIndex(3, 2, 1, 0)
    );
}

#[test]
fn test_trim_matches_extrude() {
    let city = spade_city();
    let mesh2d = build_mesh_2d(&city, &domain(), 4., &SpadeTriangulator::default()).unwrap();
    let full = layer_mesh(&mesh2d, 0., 30., 4.).unwrap();
    let trimmed = trim_volume_mesh(&full, &mesh2d, &city).unwrap();
    let extruded = extrude(&mesh2d, &city, 0., 30., 4.).unwrap();
    assert_eq!(trimmed, extruded);
}

#[test]
fn test_dirichlet_values_are_reached() {
    let (city, mesh2d) = grid_city();
    let dem = sloped_dem();
    let mut volume = extrude(&mesh2d, &city, 0., 20., 5.).unwrap();
    let bcs = BoundaryConditions::new(&volume, &city, &dem, false).unwrap();
    let before = volume.clone();

    let config = SmoothingConfig {
        relative_tolerance: 1e-8,
        ..SmoothingConfig::new(20. + dem.mean(), false)
    };
    let report = smooth_volume_mesh(&mut volume, &city, &dem, &config).unwrap();
    assert!(report.converged);

    let roof = city.buildings()[0].roof_height();
    for (v, p) in volume.vertices.iter().enumerate() {
        let target = before.vertices[v].z + bcs.values[v];
        match bcs.markers[v] {
            VertexMarker::Roof(0) => assert!((p.z - roof).abs() < 1e-9),
            VertexMarker::Ground => assert!((p.z - dem.evaluate(p.xy())).abs() < 1e-9),
            VertexMarker::Side => assert!((p.z - target).abs() < 1e-9),
            VertexMarker::Free => {}
            other => panic!("unexpected marker {other:?} for vertex {v}"),
        }
        assert_eq!(p.x, before.vertices[v].x);
        assert_eq!(p.y, before.vertices[v].y);
    }
}

#[test]
fn test_fixed_buildings_keep_walls() {
    // Roof cells start at layer 2, so the outline has a wall vertex at z = 5
    let (city, mesh2d) = grid_city_with_height(12.);
    let dem = GridField::constant(Grid::new(domain(), 3, 3).unwrap(), 0.);
    let mut volume = extrude(&mesh2d, &city, 0., 20., 5.).unwrap();
    let before = volume.clone();

    let on_wall = |p: &Point| {
        (p.z - 5.).abs() < 1e-12 && city.find_building_or_touching(p.xy(), 1e-9).is_some()
    };
    let wall: Vec<usize> = (0..volume.num_vertices())
        .filter(|&v| on_wall(&before.vertices[v]))
        .collect();
    assert_eq!(wall.len(), 8);

    let free = BoundaryConditions::new(&volume, &city, &dem, false).unwrap();
    let fixed = BoundaryConditions::new(&volume, &city, &dem, true).unwrap();
    for &v in &wall {
        assert_eq!(free.markers[v], VertexMarker::Free);
        assert_eq!(fixed.markers[v], VertexMarker::FixedBuilding(0));
    }

    smooth_volume_mesh(&mut volume, &city, &dem, &SmoothingConfig::new(20., true)).unwrap();
    for &v in &wall {
        assert_eq!(volume.vertices[v].z, 5.);
    }
    for (p, q) in volume.vertices.iter().zip(&before.vertices) {
        if (q.x - 15.).abs() < 1e-12 && (q.y - 15.).abs() < 1e-12 && (q.z - 10.).abs() < 1e-12 {
            assert!((p.z - 12.).abs() < 1e-9);
        }
    }
}

#[test]
fn test_flat_mesh_is_unchanged() {
    let mesh2d = build_mesh_2d(&City::default(), &domain(), 5., &SpadeTriangulator::default())
        .unwrap();
    let mut volume = layer_mesh(&mesh2d, 0., 20., 5.).unwrap();
    let before = volume.clone();
    let dem = GridField::constant(Grid::new(domain(), 2, 2).unwrap(), 0.);

    let report = smooth_volume_mesh(
        &mut volume,
        &City::default(),
        &dem,
        &SmoothingConfig::new(20., false),
    )
    .unwrap();
    assert!(report.converged);
    assert_eq!(report.iterations, 1);
    for (p, q) in volume.vertices.iter().zip(&before.vertices) {
        assert!((p.z - q.z).abs() < 1e-12);
    }
}

#[test]
fn test_local_stiffness_of_random_tetrahedra() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let mut pts = [Point::new(0., 0., 0.); 4];
        for p in pts.iter_mut() {
            *p = Point::new(
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
                rng.gen_range(-5.0..5.0),
            );
        }
        let Some(k) = local_stiffness(pts) else {
            continue;
        };
        for i in 0..4 {
            let scale = k[i][i].abs().max(1.0);
            assert!(k[i][i] > 0.);
            assert!(k[i].iter().sum::<f64>().abs() < 1e-9 * scale);
            for j in 0..4 {
                assert!((k[i][j] - k[j][i]).abs() < 1e-9 * scale);
            }
        }
    }
}

#[test]
fn test_stiffness_of_extruded_mesh() {
    let (city, mesh2d) = grid_city();
    let volume = extrude(&mesh2d, &city, 0., 20., 5.).unwrap();
    let k = StiffnessMatrix::new(&volume).unwrap();
    assert_eq!(k.blocks.len(), volume.num_cells());
    assert!(k.diagonal.iter().all(|&d| d > 0.));
}

#[test]
fn test_random_cities() {
    let mut rng = StdRng::seed_from_u64(42);
    let bbox = BoundingBox2D::new(Point2D::new(0., 0.), Point2D::new(100., 100.));
    for _ in 0..3 {
        let mut city = City::default();
        for i in 0..4 {
            for j in 0..4 {
                if rng.gen_bool(0.5) {
                    continue;
                }
                let width = rng.gen_range(5.0..15.0);
                let depth = rng.gen_range(5.0..15.0);
                let x0 = 25. * i as f64 + rng.gen_range(3.0..(22.0 - width));
                let y0 = 25. * j as f64 + rng.gen_range(3.0..(22.0 - depth));
                let height = rng.gen_range(3.0..30.0);
                city.add_building(
                    Building::new(rectangle(x0, y0, width, depth), height, 0.).unwrap(),
                );
            }
        }

        let mesh2d = build_mesh_2d(&city, &bbox, 8., &SpadeTriangulator::default()).unwrap();
        check_partition(&mesh2d, &city, &bbox);

        let full = layer_mesh(&mesh2d, 0., 40., 8.).unwrap();
        let trimmed = trim_volume_mesh(&full, &mesh2d, &city).unwrap();
        let extruded = extrude(&mesh2d, &city, 0., 40., 8.).unwrap();
        extruded.validate().unwrap();
        assert_eq!(trimmed, extruded);

        // Closed boundary: every edge is shared by exactly two faces
        let boundary = extract_boundary_3d(&extruded);
        let mut edges = std::collections::HashMap::new();
        for f in &boundary.faces {
            let [a, b, c] = f.as_array();
            for (u, v) in [(a, b), (b, c), (c, a)] {
                *edges.entry((u.min(v), u.max(v))).or_insert(0) += 1;
            }
        }
        assert!(edges.values().all(|&n| n == 2));
    }
}

#[test]
fn test_pipeline_with_quality_triangulation() {
    let city = spade_city();
    let dem = sloped_dem();
    let config = MeshingConfig {
        relative_tolerance: 1e-6,
        ..MeshingConfig::new(5., 30.)
    };
    let result =
        build_volume_mesh(&city, &dem, &domain(), &config, &config.triangulator()).unwrap();
    result.volume.validate().unwrap();
    assert!(result.boundary.face_count() > 0);
    assert!(result.smoothing.iter().all(|r| r.converged));

    // Ground vertices sit on the terrain
    let bcs = BoundaryConditions::new(&result.volume, &city, &dem, true).unwrap();
    for (v, p) in result.volume.vertices.iter().enumerate() {
        if bcs.markers[v] == VertexMarker::Ground {
            assert!((p.z - dem.evaluate(p.xy())).abs() < 1e-9);
        }
    }
}
