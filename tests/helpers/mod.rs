// Shared test utilities for tricell tests.

#![allow(dead_code)]

use glam::DVec3;
use tricell::IndexedMesh;

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Structural sanity checks every extracted mesh must pass: 1-based,
/// zero-terminated index runs of at least three entries, indices in range,
/// and mirrored channel lengths when a channel is present.
pub fn verify_valid_mesh(mesh: &IndexedMesh) {
    assert!(!mesh.point_index.is_empty(), "mesh has no faces");
    assert_eq!(
        *mesh.point_index.last().unwrap(),
        0,
        "index stream must end with a terminator"
    );
    let mut run = 0usize;
    for &idx in &mesh.point_index {
        if idx == 0 {
            assert!(run >= 3, "face with fewer than 3 vertices");
            run = 0;
            continue;
        }
        let i = idx.unsigned_abs() as usize;
        assert!(i >= 1 && i <= mesh.points.len(), "point index out of range: {idx}");
        run += 1;
    }
    if !mesh.normal_index.is_empty() {
        assert_eq!(mesh.normal_index.len(), mesh.point_index.len());
        for (&n, &p) in mesh.normal_index.iter().zip(&mesh.point_index) {
            assert_eq!(n == 0, p == 0, "normal terminators must mirror point terminators");
        }
    }
    if !mesh.param_index.is_empty() {
        assert_eq!(mesh.param_index.len(), mesh.point_index.len());
    }
}

/// All faces must wind counter-clockwise in the XY plane.
pub fn verify_ccw_faces(mesh: &IndexedMesh) {
    for face in mesh.faces() {
        let mut area = 0.0;
        for (i, &idx) in face.iter().enumerate() {
            let a = point_of(mesh, idx);
            let b = point_of(mesh, face[(i + 1) % face.len()]);
            area += a.x * b.y - b.x * a.y;
        }
        assert!(area > 0.0, "face winds clockwise: {face:?}");
    }
}

pub fn point_of(mesh: &IndexedMesh, idx: i32) -> DVec3 {
    mesh.points[(idx.unsigned_abs() - 1) as usize]
}

pub fn contains_point(mesh: &IndexedMesh, p: DVec3) -> bool {
    mesh.points.iter().any(|&q| (q - p).length() < 1e-9)
}

/// Empty-circumcircle check: no candidate point may fall strictly inside
/// the circumcircle of any emitted triangle.
pub fn verify_delaunay(mesh: &IndexedMesh, candidates: &[DVec3]) {
    for face in mesh.faces() {
        assert_eq!(face.len(), 3, "delaunay check expects triangles");
        let a = point_of(mesh, face[0]);
        let b = point_of(mesh, face[1]);
        let c = point_of(mesh, face[2]);
        for &p in candidates {
            if (p - a).length() < 1e-9 || (p - b).length() < 1e-9 || (p - c).length() < 1e-9 {
                continue;
            }
            assert!(
                !strictly_in_circumcircle(a, b, c, p),
                "point {p:?} lies inside the circumcircle of {a:?} {b:?} {c:?}"
            );
        }
    }
}

fn strictly_in_circumcircle(a: DVec3, b: DVec3, c: DVec3, p: DVec3) -> bool {
    // Standard incircle determinant; positive for a point strictly inside
    // when a, b, c wind counter-clockwise.
    let (ax, ay) = (a.x - p.x, a.y - p.y);
    let (bx, by) = (b.x - p.x, b.y - p.y);
    let (cx, cy) = (c.x - p.x, c.y - p.y);
    let det = (ax * ax + ay * ay) * (bx * cy - cx * by)
        - (bx * bx + by * by) * (ax * cy - cx * ay)
        + (cx * cx + cy * cy) * (ax * by - bx * ay);
    det > 1e-9
}

/// A point is inside (or on) a convex CCW polygon when it sits left of
/// every edge.
pub fn convex_polygon_contains(poly: &[DVec3], p: DVec3, eps: f64) -> bool {
    poly.iter().enumerate().all(|(i, &a)| {
        let b = poly[(i + 1) % poly.len()];
        (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= -eps
    })
}

pub fn unit_square(scale: f64) -> Vec<DVec3> {
    vec![
        DVec3::new(0.0, 0.0, 0.0),
        DVec3::new(scale, 0.0, 0.0),
        DVec3::new(scale, scale, 0.0),
        DVec3::new(0.0, scale, 0.0),
    ]
}
