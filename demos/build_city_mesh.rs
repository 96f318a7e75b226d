use anyhow::Result;
use citymesh::{
    BoundingBox2D, Building, City, Grid, GridField, MeshingConfig, Point2D, Polygon,
    build_city_surface, build_volume_mesh, extract_open_surface_3d,
};

fn rectangle(x0: f64, y0: f64, width: f64, depth: f64) -> Result<Polygon> {
    Polygon::new(vec![
        Point2D::new(x0, y0),
        Point2D::new(x0 + width, y0),
        Point2D::new(x0 + width, y0 + depth),
        Point2D::new(x0, y0 + depth),
    ])
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let bbox = BoundingBox2D::new(Point2D::new(0., 0.), Point2D::new(200., 150.));

    // Gentle slope towards the north-east
    let dem = GridField::from_fn(Grid::new(bbox, 21, 16)?, |p| 0.02 * p.x + 0.01 * p.y);

    // L-shaped block plus two towers
    let l_shape = Polygon::new(vec![
        Point2D::new(30., 30.),
        Point2D::new(90., 30.),
        Point2D::new(90., 50.),
        Point2D::new(50., 50.),
        Point2D::new(50., 90.),
        Point2D::new(30., 90.),
    ])?;
    let mut city = City::default();
    for (footprint, height) in [
        (l_shape, 18.),
        (rectangle(120., 40., 25., 25.)?, 45.),
        (rectangle(130., 95., 30., 20.)?, 27.),
    ] {
        let ground = dem.evaluate(footprint.bounding_box().min);
        city.add_building(Building::new(footprint, height, ground)?);
    }

    let config = MeshingConfig::new(10., 80.);
    let triangulator = config.triangulator();

    let result = build_volume_mesh(&city, &dem, &bbox, &config, &triangulator)?;
    for (pass, report) in result.smoothing.iter().enumerate() {
        log::info!(
            "Smoothing pass {}: {} sweeps, max update {:.2e}, converged: {}",
            pass + 1,
            report.iterations,
            report.residual,
            report.converged
        );
    }
    log::info!(
        "Volume mesh: {} vertices, {} cells, {} layers of {:.2} m",
        result.volume.num_vertices(),
        result.volume.num_cells(),
        result.volume.num_layers,
        result.volume.layer_height
    );

    let open = extract_open_surface_3d(&result.boundary);
    log::info!(
        "Terrain and building surface: {} faces, {:.1} m2",
        open.face_count(),
        open.area()
    );

    let surface = build_city_surface(&city, &dem, &bbox, &config, false, &triangulator)?;
    log::info!(
        "Visualization surface: {} vertices, {} faces",
        surface.vertex_count(),
        surface.face_count()
    );
    Ok(())
}
