// Tests for the constrained path: loops, rule paths, and isolated points.

mod helpers;

use glam::DVec3;
use tricell::{create_constrained_triangulation, EdgeChainKind, FacetOptions};

#[test]
fn rule_path_edges_survive_triangulation() {
    helpers::init_logs();
    let loops = vec![helpers::unit_square(10.0)];
    let paths = vec![vec![
        DVec3::new(1.0, 5.0, 0.0),
        DVec3::new(5.0, 6.0, 0.0),
        DVec3::new(9.0, 5.0, 0.0),
    ]];
    let opts = FacetOptions {
        edge_chains_required: true,
        ..FacetOptions::default()
    };
    let mesh = create_constrained_triangulation(&loops, &paths, &[], &opts).unwrap();
    helpers::verify_valid_mesh(&mesh);
    helpers::verify_ccw_faces(&mesh);
    assert!((mesh.area_xy() - 100.0).abs() < 1e-9);
    for p in &paths[0] {
        assert!(helpers::contains_point(&mesh, *p));
    }
    let rule: Vec<_> = mesh
        .edge_chains
        .iter()
        .filter(|c| c.kind == EdgeChainKind::Rule)
        .collect();
    assert_eq!(rule.len(), 1);
    assert_eq!(rule[0].points.len(), 3);
}

#[test]
fn boundary_chain_closes_the_loop() {
    let loops = vec![helpers::unit_square(10.0)];
    let opts = FacetOptions {
        edge_chains_required: true,
        ..FacetOptions::default()
    };
    let mesh = create_constrained_triangulation(&loops, &[], &[], &opts).unwrap();
    let boundary: Vec<_> = mesh
        .edge_chains
        .iter()
        .filter(|c| c.kind == EdgeChainKind::Boundary)
        .collect();
    assert_eq!(boundary.len(), 1);
    let pts = &boundary[0].points;
    assert_eq!(pts.first(), pts.last());
    assert_eq!(pts.len(), 5);
}

#[test]
fn isolated_points_become_mesh_vertices() {
    let loops = vec![helpers::unit_square(10.0)];
    let points = [
        DVec3::new(3.0, 3.0, 0.0),
        DVec3::new(7.0, 4.0, 0.0),
        DVec3::new(5.0, 8.0, 0.0),
    ];
    let mesh =
        create_constrained_triangulation(&loops, &[], &points, &FacetOptions::triangles()).unwrap();
    helpers::verify_valid_mesh(&mesh);
    for &p in &points {
        assert!(helpers::contains_point(&mesh, p));
    }
    assert!((mesh.area_xy() - 100.0).abs() < 1e-9);
    // 4 corners + 3 interior points, all triangles.
    assert_eq!(mesh.points.len(), 7);
    for face in mesh.faces() {
        assert_eq!(face.len(), 3);
    }
}

#[test]
fn points_outside_the_boundary_are_dropped() {
    let loops = vec![helpers::unit_square(10.0)];
    let outside = DVec3::new(25.0, 25.0, 0.0);
    let mesh =
        create_constrained_triangulation(&loops, &[], &[outside], &FacetOptions::triangles())
            .unwrap();
    assert!(!helpers::contains_point(&mesh, outside));
    assert!((mesh.area_xy() - 100.0).abs() < 1e-9);
}

#[test]
fn hole_loop_bounds_the_interior() {
    let outer = helpers::unit_square(10.0);
    let inner: Vec<DVec3> = helpers::unit_square(4.0)
        .into_iter()
        .map(|p| p + DVec3::new(3.0, 3.0, 0.0))
        .collect();
    let mesh = create_constrained_triangulation(
        &[outer, inner],
        &[],
        &[],
        &FacetOptions::triangles(),
    )
    .unwrap();
    helpers::verify_valid_mesh(&mesh);
    helpers::verify_ccw_faces(&mesh);
    assert!((mesh.area_xy() - 84.0).abs() < 1e-9);
}

#[test]
fn paths_without_loops_use_a_fringe_boundary() {
    let paths = vec![vec![
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(10.0, 0.0, 0.0),
        DVec3::new(10.0, 10.0, 0.0),
    ]];
    let mesh =
        create_constrained_triangulation(&[], &paths, &[], &FacetOptions::triangles()).unwrap();
    helpers::verify_valid_mesh(&mesh);
    for p in &paths[0] {
        assert!(helpers::contains_point(&mesh, *p));
    }
    // The fringe is stripped; only faces among the path vertices remain.
    assert!((mesh.area_xy() - 50.0).abs() < 1e-9);
}

#[test]
fn chain_only_points_still_get_params() {
    // A rule path entirely inside a hole reaches the output only through
    // its edge chain; the chain endpoints must still carry parameters.
    let outer = helpers::unit_square(10.0);
    let inner: Vec<DVec3> = helpers::unit_square(4.0)
        .into_iter()
        .map(|p| p + DVec3::new(3.0, 3.0, 0.0))
        .collect();
    let paths = vec![vec![DVec3::new(4.0, 5.0, 0.0), DVec3::new(6.0, 5.0, 0.0)]];
    let opts = FacetOptions {
        edge_chains_required: true,
        need_params: true,
        ..FacetOptions::default()
    };
    let mesh = create_constrained_triangulation(&[outer, inner], &paths, &[], &opts).unwrap();
    helpers::verify_valid_mesh(&mesh);
    assert_eq!(mesh.params.len(), mesh.points.len());
    assert_eq!(mesh.param_index.len(), mesh.point_index.len());
    assert!(mesh
        .edge_chains
        .iter()
        .any(|c| c.kind == EdgeChainKind::Rule));
}

#[test]
fn rule_crossing_a_hole_splits_at_the_boundary() {
    let outer = helpers::unit_square(10.0);
    let inner: Vec<DVec3> = helpers::unit_square(2.0)
        .into_iter()
        .map(|p| p + DVec3::new(4.0, 4.0, 0.0))
        .collect();
    let paths = vec![vec![DVec3::new(0.0, 5.0, 0.0), DVec3::new(10.0, 5.0, 0.0)]];
    let mesh = create_constrained_triangulation(
        &[outer, inner],
        &paths,
        &[],
        &FacetOptions::triangles(),
    )
    .unwrap();
    helpers::verify_valid_mesh(&mesh);
    assert!((mesh.area_xy() - 96.0).abs() < 1e-9);
    // Crossings with the hole walls become vertices.
    assert!(helpers::contains_point(&mesh, DVec3::new(4.0, 5.0, 0.0)));
    assert!(helpers::contains_point(&mesh, DVec3::new(6.0, 5.0, 0.0)));
}
