// End-to-end tests for the polygon and point-cloud triangulation paths.

mod helpers;

use glam::DVec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tricell::{
    add_triangulation, create_xy_triangulation, FacetOptions, TriangulateError, DISCONNECT,
};

#[test]
fn square_end_to_end() {
    helpers::init_logs();
    let mesh = add_triangulation(&helpers::unit_square(10.0), &FacetOptions::triangles()).unwrap();
    assert_eq!(mesh.points.len(), 4);
    assert_eq!(mesh.face_count(), 2);
    assert!((mesh.area_xy() - 100.0).abs() < 1e-9);
    helpers::verify_valid_mesh(&mesh);
    helpers::verify_ccw_faces(&mesh);
}

#[test]
fn input_vertices_survive_unchanged() {
    let poly = vec![
        DVec3::new(0.125, 0.375, 0.0),
        DVec3::new(9.875, 0.625, 0.0),
        DVec3::new(10.0625, 9.9375, 0.0),
        DVec3::new(5.5, 12.25, 0.0),
        DVec3::new(-0.25, 9.75, 0.0),
    ];
    let mesh = add_triangulation(&poly, &FacetOptions::triangles()).unwrap();
    for &p in &poly {
        // Exact world coordinates, not frame round-trips.
        assert!(
            mesh.points.iter().any(|&q| q == p),
            "vertex {p:?} was not preserved exactly"
        );
    }
}

#[test]
fn winding_flag_reverses_faces() {
    let opts = FacetOptions {
        winding_ccw: false,
        ..FacetOptions::default()
    };
    let mesh = add_triangulation(&helpers::unit_square(10.0), &opts).unwrap();
    assert!(mesh.area_xy() < 0.0);
    helpers::verify_valid_mesh(&mesh);
}

#[test]
fn disjoint_loops_triangulate_together() {
    let mut pts = helpers::unit_square(10.0);
    pts.push(DISCONNECT);
    for p in helpers::unit_square(4.0) {
        pts.push(p + DVec3::new(20.0, 0.0, 0.0));
    }
    let mesh = add_triangulation(&pts, &FacetOptions::triangles()).unwrap();
    assert!((mesh.area_xy() - 116.0).abs() < 1e-9);
    assert_eq!(mesh.face_count(), 4);
    helpers::verify_valid_mesh(&mesh);
}

#[test]
fn overlapping_loops_union() {
    let mut pts = helpers::unit_square(10.0);
    pts.push(DISCONNECT);
    for p in helpers::unit_square(10.0) {
        pts.push(p + DVec3::new(5.0, 15.0, 0.0));
    }
    pts.push(DISCONNECT);
    // Bridge rectangle overlapping both squares.
    pts.extend([
        DVec3::new(6.0, 5.0, 0.0),
        DVec3::new(9.0, 5.0, 0.0),
        DVec3::new(9.0, 20.0, 0.0),
        DVec3::new(6.0, 20.0, 0.0),
    ]);
    let mesh = add_triangulation(&pts, &FacetOptions::triangles()).unwrap();
    helpers::verify_valid_mesh(&mesh);
    helpers::verify_ccw_faces(&mesh);
    // Even-odd: the two bridge/square overlap rectangles flip to holes.
    let overlap = 2.0 * (3.0 * 5.0);
    let expected = 100.0 + 100.0 + 3.0 * 15.0 - 2.0 * overlap;
    assert!(
        (mesh.area_xy() - expected).abs() < 1e-9,
        "area {} vs expected {}",
        mesh.area_xy(),
        expected
    );
}

#[test]
fn degenerate_polygons_fail() {
    let opts = FacetOptions::triangles();
    assert!(matches!(
        add_triangulation(&[], &opts),
        Err(TriangulateError::DegenerateInput(_))
    ));
    let two = [DVec3::new(0.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0)];
    assert!(add_triangulation(&two, &opts).is_err());
}

#[test]
fn normals_and_params_channels() {
    let opts = FacetOptions {
        need_normals: true,
        need_params: true,
        ..FacetOptions::default()
    };
    let mesh = add_triangulation(&helpers::unit_square(10.0), &opts).unwrap();
    helpers::verify_valid_mesh(&mesh);
    assert_eq!(mesh.normals.len(), mesh.face_count());
    for n in &mesh.normals {
        assert!((n.z - 1.0).abs() < 1e-9);
    }
    assert_eq!(mesh.params.len(), mesh.points.len());
    let max = mesh
        .params
        .iter()
        .fold(f64::MIN, |m, p| m.max(p.x).max(p.y));
    assert!((max - 10.0).abs() < 1e-9);
}

#[test]
fn extraction_is_deterministic() {
    let poly = helpers::unit_square(10.0);
    let a = add_triangulation(&poly, &FacetOptions::triangles()).unwrap();
    let b = add_triangulation(&poly, &FacetOptions::triangles()).unwrap();
    assert_eq!(a.points, b.points);
    assert_eq!(a.point_index, b.point_index);
}

#[test]
fn random_point_cloud_is_delaunay() {
    helpers::init_logs();
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut pts = Vec::new();
    for _ in 0..50 {
        pts.push(DVec3::new(
            rng.gen_range(0.0..100.0),
            rng.gen_range(0.0..100.0),
            0.0,
        ));
    }
    let mesh = create_xy_triangulation(&pts, &FacetOptions::triangles()).unwrap();
    helpers::verify_valid_mesh(&mesh);
    helpers::verify_ccw_faces(&mesh);
    for &p in &pts {
        assert!(helpers::contains_point(&mesh, p));
    }
    helpers::verify_delaunay(&mesh, &pts);
}

#[test]
fn point_cloud_smooth_flow_stays_valid() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mut pts = Vec::new();
    for _ in 0..30 {
        pts.push(DVec3::new(
            rng.gen_range(-50.0..50.0),
            rng.gen_range(-5.0..5.0),
            0.0,
        ));
    }
    let opts = FacetOptions {
        smooth_triangle_flow_required: true,
        ..FacetOptions::default()
    };
    let mesh = create_xy_triangulation(&pts, &opts).unwrap();
    helpers::verify_valid_mesh(&mesh);
    helpers::verify_ccw_faces(&mesh);
}
