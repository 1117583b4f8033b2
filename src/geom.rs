//! Pure geometric predicates and small constructions on 2D coordinates.
//!
//! Everything here operates in the locally fitted frame (extent mapped to
//! roughly [-1, 1]) so the floating-point predicates stay well conditioned
//! regardless of the input's absolute magnitudes.

use glam::DVec2;

pub type Real = f64;

/// Lexicographic order: x first, then y.
#[inline]
pub fn vert_leq(u: DVec2, v: DVec2) -> bool {
    u.x < v.x || (u.x == v.x && u.y <= v.y)
}

/// Strict lexicographic order.
#[inline]
pub fn vert_lt(u: DVec2, v: DVec2) -> bool {
    u.x < v.x || (u.x == v.x && u.y < v.y)
}

/// Twice the signed area of triangle (u, v, w). Positive for CCW.
#[inline]
pub fn cross2(u: DVec2, v: DVec2, w: DVec2) -> Real {
    (v - u).perp_dot(w - u)
}

/// Signed area of triangle (u, v, w).
#[inline]
pub fn triangle_area(u: DVec2, v: DVec2, w: DVec2) -> Real {
    0.5 * cross2(u, v, w)
}

/// Returns true if (u, v, w) are in CCW order (collinear counts as CCW,
/// matching the sweep's tie-break convention).
#[inline]
pub fn vert_ccw(u: DVec2, v: DVec2, w: DVec2) -> bool {
    cross2(u, v, w) >= 0.0
}

/// In-circle predicate: positive when `p` lies strictly inside the
/// circumcircle of CCW triangle (a, b, c).
pub fn in_circle(p: DVec2, a: DVec2, b: DVec2, c: DVec2) -> Real {
    let ad = a - p;
    let bd = b - p;
    let cd = c - p;

    let ab_det = ad.x * bd.y - bd.x * ad.y;
    let bc_det = bd.x * cd.y - cd.x * bd.y;
    let ca_det = cd.x * ad.y - ad.x * cd.y;

    let a_lift = ad.length_squared();
    let b_lift = bd.length_squared();
    let c_lift = cd.length_squared();

    a_lift * bc_det + b_lift * ca_det + c_lift * ab_det
}

/// Scale-free triangle quality in (0, 1]; 1 for equilateral, approaching 0
/// for slivers. Negative area yields a non-positive value so inverted
/// candidate triangles always lose a flip comparison.
pub fn aspect_ratio(a: DVec2, b: DVec2, c: DVec2) -> Real {
    let l2 = (b - a).length_squared() + (c - b).length_squared() + (a - c).length_squared();
    if l2 <= 0.0 {
        return 0.0;
    }
    // 4*sqrt(3) normalizes an equilateral triangle to quality 1.
    4.0 * 3.0_f64.sqrt() * triangle_area(a, b, c) / l2
}

/// Circumcenter of triangle (a, b, c); `None` when the points are
/// (near-)collinear.
pub fn circumcenter(a: DVec2, b: DVec2, c: DVec2) -> Option<DVec2> {
    let d = 2.0 * cross2(a, b, c);
    if d.abs() < 1e-14 {
        return None;
    }
    let a2 = a.length_squared();
    let b2 = b.length_squared();
    let c2 = c.length_squared();
    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;
    Some(DVec2::new(ux, uy))
}

/// Proper intersection of segments (a0, a1) and (b0, b1): crossing in the
/// interior of both, at least `tol` away from every endpoint. Collinear
/// overlap and endpoint contact return `None`; those cases are resolved by
/// vertex clustering instead.
pub fn segment_intersect(a0: DVec2, a1: DVec2, b0: DVec2, b1: DVec2, tol: Real) -> Option<DVec2> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.perp_dot(db);
    if denom.abs() < 1e-14 {
        return None;
    }
    let s = (b0 - a0).perp_dot(db) / denom;
    let t = (b0 - a0).perp_dot(da) / denom;
    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
        return None;
    }
    let p = a0 + da * s;
    for q in [a0, a1, b0, b1] {
        if p.distance_squared(q) <= tol * tol {
            return None;
        }
    }
    Some(p)
}

/// y-coordinate of segment (a, b) at sweep position x, clamped to the
/// segment's x-range. A vertical segment evaluates to its midpoint.
pub fn edge_y_at_x(a: DVec2, b: DVec2, x: Real) -> Real {
    let (l, r) = if a.x <= b.x { (a, b) } else { (b, a) };
    let dx = r.x - l.x;
    if dx <= 0.0 {
        return 0.5 * (l.y + r.y);
    }
    let t = ((x - l.x) / dx).clamp(0.0, 1.0);
    l.y + t * (r.y - l.y)
}

/// Returns true if direction `d` lies in the CCW angular wedge from `u` to
/// `w` (half-open: includes `u`'s side, excludes `w`'s). When `u == w` the
/// wedge is the full circle.
pub fn dir_in_ccw_wedge(d: DVec2, u: DVec2, w: DVec2) -> bool {
    let uw = u.perp_dot(w);
    let ud = u.perp_dot(d);
    let dw = d.perp_dot(w);
    if uw > 0.0 {
        // Wedge spans less than pi.
        ud >= 0.0 && dw > 0.0
    } else if uw < 0.0 {
        // Wedge spans more than pi.
        ud >= 0.0 || dw > 0.0
    } else if u.dot(w) > 0.0 {
        // u and w parallel: full-circle wedge.
        true
    } else {
        // u and w anti-parallel: wedge is the half-plane left of u.
        ud >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> DVec2 {
        DVec2::new(x, y)
    }

    #[test]
    fn vert_leq_basic() {
        assert!(vert_leq(v(0.0, 0.0), v(1.0, 0.0)));
        assert!(vert_leq(v(0.0, 0.0), v(0.0, 1.0)));
        assert!(vert_leq(v(0.0, 0.0), v(0.0, 0.0)));
        assert!(!vert_leq(v(1.0, 0.0), v(0.0, 0.0)));
    }

    #[test]
    fn ccw_basic() {
        assert!(vert_ccw(v(0.0, 0.0), v(1.0, 0.0), v(0.5, 1.0)));
        assert!(!vert_ccw(v(0.0, 0.0), v(0.5, 1.0), v(1.0, 0.0)));
    }

    #[test]
    fn in_circle_sign() {
        let a = v(0.0, 0.0);
        let b = v(1.0, 0.0);
        let c = v(0.5, 1.0);
        // Point near the centroid is inside the circumcircle.
        assert!(in_circle(v(0.5, 0.4), a, b, c) > 0.0);
        // Far-away point is outside.
        assert!(in_circle(v(5.0, 5.0), a, b, c) < 0.0);
    }

    #[test]
    fn aspect_ratio_equilateral_is_one() {
        let h = 3.0_f64.sqrt() / 2.0;
        let q = aspect_ratio(v(0.0, 0.0), v(1.0, 0.0), v(0.5, h));
        assert!((q - 1.0).abs() < 1e-12, "q = {}", q);
    }

    #[test]
    fn aspect_ratio_sliver_is_small() {
        let q = aspect_ratio(v(0.0, 0.0), v(1.0, 0.0), v(0.5, 1e-4));
        assert!(q > 0.0 && q < 0.01);
    }

    #[test]
    fn circumcenter_right_triangle() {
        let cc = circumcenter(v(0.0, 0.0), v(2.0, 0.0), v(0.0, 2.0)).unwrap();
        assert!((cc - v(1.0, 1.0)).length() < 1e-12);
        assert!(circumcenter(v(0.0, 0.0), v(1.0, 0.0), v(2.0, 0.0)).is_none());
    }

    #[test]
    fn segment_intersect_crossing() {
        let p = segment_intersect(v(0.0, 0.0), v(1.0, 1.0), v(0.0, 1.0), v(1.0, 0.0), 1e-9);
        let p = p.unwrap();
        assert!((p - v(0.5, 0.5)).length() < 1e-12);
    }

    #[test]
    fn segment_intersect_endpoint_contact_is_none() {
        assert!(
            segment_intersect(v(0.0, 0.0), v(1.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), 1e-9).is_none()
        );
        // Parallel segments.
        assert!(
            segment_intersect(v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0), v(1.0, 1.0), 1e-9).is_none()
        );
    }

    #[test]
    fn edge_y_interpolation() {
        assert_eq!(edge_y_at_x(v(0.0, 0.0), v(2.0, 2.0), 1.0), 1.0);
        // Vertical segment: midpoint.
        assert_eq!(edge_y_at_x(v(1.0, 0.0), v(1.0, 4.0), 1.0), 2.0);
    }

    #[test]
    fn wedge_containment() {
        let u = v(1.0, 0.0);
        let w = v(0.0, 1.0);
        assert!(dir_in_ccw_wedge(v(1.0, 1.0), u, w));
        assert!(!dir_in_ccw_wedge(v(-1.0, -1.0), u, w));
        // Reflex wedge from +y to +x covers -x.
        assert!(dir_in_ccw_wedge(v(-1.0, 0.0), w, u));
        // Full circle when u == w.
        assert!(dir_in_ccw_wedge(v(-1.0, -1.0), u, u));
    }
}
