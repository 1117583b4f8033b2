//! Planar regularization and partitioning.
//!
//! Three passes turn a merged planar subdivision into triangles:
//!
//! 1. `regularize` sweeps left to right and inserts diagonals at split and
//!    merge vertices so every face becomes x-monotone. The sweep status
//!    tracks interior-ness by boundary-edge parity, so hole loops and
//!    dangling constraint chains are bridged into the surrounding face
//!    without a separate point-in-polygon pass.
//! 2. `mark_exterior` flood-fills the exterior classification from the
//!    negative-area (clockwise) outer cycles, toggling at boundary edges.
//! 3. `triangulate_monotone_faces` cuts each interior monotone face into
//!    triangles with the up/lo chain walk, then `merge_convex_faces` can
//!    recombine triangles up to a caller-set face-edge limit.

use glam::DVec2;

use crate::error::{Result, TriangulateError};
use crate::geom::{cross2, edge_y_at_x, vert_ccw, vert_leq, vert_lt};
use crate::graph::{mate, HalfEdgeGraph, NodeId, BOUNDARY, CONSTRAINED, DELETED, EXTERIOR};

/// One rightward edge in the sweep status, with its helper vertex.
struct Active {
    /// Node directed left to right (org lexically before dst).
    edge: NodeId,
    /// Most recent vertex that can take a diagonal down to this edge.
    helper: NodeId,
    /// Helper was a merge vertex and must be connected eventually.
    helper_merge: bool,
}

/// Insert a sweep diagonal between two vertex rings. Failure leaves the
/// face non-monotone; the tessellation pass reports it if the face then
/// cannot be cut.
fn add_diagonal(graph: &mut HalfEdgeGraph, from: NodeId, to: NodeId) {
    if graph.insert_diagonal(from, to, 0).is_none() {
        log::debug!("sweep diagonal {from} -> {to} could not be placed");
    }
}

/// Make every face x-monotone by inserting diagonals at split and merge
/// vertices (left extremes and right extremes that sit inside an interior
/// region). Classification is by parity of boundary edges below the event
/// vertex, so no prior interior marking is needed.
pub fn regularize(graph: &mut HalfEdgeGraph) {
    // Events are the geometric vertices; rightward outbound edges are
    // captured up front because diagonal insertion grows the rings but
    // never moves existing origins.
    let mut events: Vec<(DVec2, NodeId, Vec<NodeId>)> = graph
        .vertex_representatives()
        .into_iter()
        .map(|rep| {
            let pos = graph.pos(rep);
            let starting: Vec<NodeId> = graph
                .vertex_loop(rep)
                .into_iter()
                .filter(|&n| vert_lt(pos, graph.dst_pos(n)))
                .collect();
            (pos, rep, starting)
        })
        .collect();
    events.sort_by(|a, b| {
        if a.0 == b.0 {
            std::cmp::Ordering::Equal
        } else if vert_lt(a.0, b.0) {
            std::cmp::Ordering::Less
        } else {
            std::cmp::Ordering::Greater
        }
    });

    let mut active: Vec<Active> = Vec::new();
    for (pos, rep, starting) in events {
        // Retire edges ending here; a pending merge helper connects to
        // this vertex.
        let mut ended = 0usize;
        let mut i = 0;
        while i < active.len() {
            if graph.dst_pos(active[i].edge) == pos {
                let gone = active.swap_remove(i);
                ended += 1;
                if gone.helper_merge {
                    add_diagonal(graph, gone.helper, rep);
                }
            } else {
                i += 1;
            }
        }

        // Edge immediately below the event, and interior parity of the
        // region the vertex currently sits in.
        let mut below_boundary = 0usize;
        let mut below: Option<usize> = None;
        let mut below_y = f64::NEG_INFINITY;
        for (idx, a) in active.iter().enumerate() {
            let y = edge_y_at_x(graph.pos(a.edge), graph.dst_pos(a.edge), pos.x);
            if y < pos.y {
                if graph.has_mask(a.edge, BOUNDARY) {
                    below_boundary += 1;
                }
                if y > below_y {
                    below_y = y;
                    below = Some(idx);
                }
            }
        }

        if below_boundary % 2 == 1 {
            if let Some(idx) = below {
                let helper = active[idx].helper;
                let helper_merge = active[idx].helper_merge;
                if ended == 0 {
                    // Split vertex: connect down to the helper.
                    add_diagonal(graph, rep, helper);
                    active[idx].helper = rep;
                    active[idx].helper_merge = false;
                } else if starting.is_empty() {
                    // Merge vertex: becomes the pending helper below it.
                    if helper_merge {
                        add_diagonal(graph, helper, rep);
                    }
                    active[idx].helper = rep;
                    active[idx].helper_merge = true;
                } else {
                    // Regular vertex on the upper side of an interior
                    // region: takes over the helper role.
                    if helper_merge {
                        add_diagonal(graph, helper, rep);
                    }
                    active[idx].helper = rep;
                    active[idx].helper_merge = false;
                }
            }
        }

        for s in starting {
            active.push(Active {
                edge: s,
                helper: rep,
                helper_merge: false,
            });
        }
    }
}

/// Flood the exterior/interior classification from the clockwise
/// (negative-area) outer cycles, toggling at boundary edges. Every node on
/// an exterior face gets the `EXTERIOR` mask; interior faces stay clean.
/// Rule edges and diagonals do not toggle the classification.
pub fn mark_exterior(graph: &mut HalfEdgeGraph) {
    let reps = graph.face_representatives();
    let mut face_of = vec![usize::MAX; graph.len()];
    let mut loops: Vec<Vec<NodeId>> = Vec::with_capacity(reps.len());
    for (fi, &rep) in reps.iter().enumerate() {
        let cycle = graph.face_loop(rep);
        for &e in &cycle {
            face_of[e as usize] = fi;
        }
        loops.push(cycle);
    }

    // Seed each component from its most negative face: the unbounded
    // cycle of a component is at least as negative as any of its bounded
    // faces is positive, so ascending-area order reaches it first.
    let areas: Vec<f64> = reps.iter().map(|&r| graph.face_area(r)).collect();
    let mut order: Vec<usize> = (0..reps.len()).collect();
    order.sort_by(|&a, &b| {
        areas[a]
            .partial_cmp(&areas[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut exterior: Vec<Option<bool>> = vec![None; reps.len()];
    for seed in order {
        if exterior[seed].is_some() {
            continue;
        }
        exterior[seed] = Some(true);
        let mut queue = vec![seed];
        while let Some(f) = queue.pop() {
            let ext = exterior[f].unwrap_or(true);
            for &e in &loops[f] {
                let nf = face_of[mate(e) as usize];
                if nf == usize::MAX || exterior[nf].is_some() {
                    continue;
                }
                exterior[nf] = Some(ext ^ graph.has_mask(e, BOUNDARY));
                queue.push(nf);
            }
        }
    }

    for (fi, cycle) in loops.iter().enumerate() {
        if exterior[fi] == Some(true) {
            for &e in cycle {
                graph.set_mask(e, EXTERIOR);
            }
        }
    }
}

/// Returns true when the edge of `e` goes lexically leftward.
#[inline]
fn edge_goes_left(graph: &HalfEdgeGraph, e: NodeId) -> bool {
    vert_leq(graph.dst_pos(e), graph.pos(e))
}

#[inline]
fn edge_goes_right(graph: &HalfEdgeGraph, e: NodeId) -> bool {
    vert_leq(graph.pos(e), graph.dst_pos(e))
}

/// Cut one x-monotone face into triangles.
///
/// Walks the upper and lower chains from the right extreme toward the
/// left, emitting a fan of diagonals from whichever chain trails, then
/// fans out the remainder from the leftmost vertex.
fn tessellate_mono_region(graph: &mut HalfEdgeGraph, face: NodeId) -> Result<()> {
    let budget = graph.face_edge_count(face) * 4 + 8;
    let overrun = || TriangulateError::TriangulationFailed("monotone face walk did not close");

    let mut up = face;
    let mut guard = 0;
    while edge_goes_left(graph, up) {
        up = graph.fpred(up);
        guard += 1;
        if guard > graph.len() {
            return Err(overrun());
        }
    }
    while edge_goes_right(graph, up) {
        up = graph.fsucc(up);
        guard += 1;
        if guard > graph.len() {
            return Err(overrun());
        }
    }
    let mut lo = graph.fpred(up);

    let mut steps = 0;
    while graph.fsucc(up) != lo {
        steps += 1;
        if steps > budget {
            return Err(overrun());
        }
        if vert_leq(graph.dst_pos(up), graph.pos(lo)) {
            // up's destination is on the left; cut triangles off the
            // lower chain while the corner at lo stays convex.
            while graph.fsucc(lo) != up {
                let next = graph.fsucc(lo);
                let goes_left = edge_goes_left(graph, next);
                let sign = cross2(graph.pos(lo), graph.dst_pos(next), graph.dst_pos(lo));
                if !goes_left && sign > 0.0 {
                    break;
                }
                let n = graph.connect(next, lo, 0);
                lo = mate(n);
                steps += 1;
                if steps > budget {
                    return Err(overrun());
                }
            }
            lo = graph.fpred(lo);
        } else {
            // lo's origin is on the left; cut triangles off the upper
            // chain.
            while graph.fsucc(lo) != up {
                let prev = graph.fpred(up);
                let goes_right = edge_goes_right(graph, prev);
                let sign = cross2(graph.dst_pos(up), graph.pos(prev), graph.pos(up));
                if !goes_right && sign < 0.0 {
                    break;
                }
                let n = graph.connect(up, prev, 0);
                up = mate(n);
                steps += 1;
                if steps > budget {
                    return Err(overrun());
                }
            }
            up = graph.fsucc(up);
        }
    }

    // Fan out whatever is left from the leftmost vertex.
    while graph.fsucc(graph.fsucc(lo)) != up {
        let next = graph.fsucc(lo);
        let n = graph.connect(next, lo, 0);
        lo = mate(n);
        steps += 1;
        if steps > budget {
            return Err(overrun());
        }
    }
    Ok(())
}

/// Triangulate every interior face with more than three edges. Requires
/// `regularize` and `mark_exterior` to have run.
pub fn triangulate_monotone_faces(graph: &mut HalfEdgeGraph) -> Result<()> {
    for rep in graph.face_representatives() {
        if graph.has_mask(rep, EXTERIOR) || graph.has_mask(rep, DELETED) {
            continue;
        }
        if graph.face_edge_count(rep) > 3 {
            tessellate_mono_region(graph, rep)?;
        }
    }
    Ok(())
}

/// Merge adjacent interior faces across unconstrained edges, up to
/// `max_per_face` edges per merged face. With `require_convex` only merges
/// that keep both junction corners convex are taken.
pub fn merge_convex_faces(graph: &mut HalfEdgeGraph, max_per_face: usize, require_convex: bool) {
    let mut e: NodeId = 0;
    while (e as usize) < graph.len() {
        let pair = e;
        e += 2;
        if graph.has_mask(pair, DELETED) || graph.has_mask(pair, CONSTRAINED) {
            continue;
        }
        if graph.has_mask(pair, EXTERIOR) || graph.has_mask(mate(pair), EXTERIOR) {
            continue;
        }
        let left = graph.face_edge_count(pair);
        let right = graph.face_edge_count(mate(pair));
        if left < 3 || right < 3 || left + right - 2 > max_per_face {
            continue;
        }
        if require_convex {
            let va = graph.pos(graph.fpred(pair));
            let vb = graph.pos(pair);
            let vc = graph.dst_pos(graph.fsucc(mate(pair)));
            let vd = graph.pos(graph.fpred(mate(pair)));
            let ve = graph.pos(mate(pair));
            let vf = graph.dst_pos(graph.fsucc(pair));
            if !(vert_ccw(va, vb, vc) && vert_ccw(vd, ve, vf)) {
                continue;
            }
        }
        graph.excise_pair(pair);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{add_edges_xy, merge_or_union_loops};
    use crate::frame::{LocalFrame, Tolerances};
    use glam::DVec3;

    fn w(x: f64, y: f64) -> DVec3 {
        DVec3::new(x, y, 0.0)
    }

    fn build(loops: &[Vec<DVec3>]) -> (HalfEdgeGraph, LocalFrame) {
        let all: Vec<DVec3> = loops.iter().flatten().copied().collect();
        let frame = LocalFrame::fit(&all, Tolerances::default()).unwrap();
        let mut g = HalfEdgeGraph::new();
        add_edges_xy(&mut g, &frame, loops, true, BOUNDARY, 0);
        merge_or_union_loops(&mut g, &frame);
        (g, frame)
    }

    fn interior_area(g: &HalfEdgeGraph) -> f64 {
        g.face_representatives()
            .iter()
            .filter(|&&f| !g.has_mask(f, EXTERIOR) && !g.has_mask(f, DELETED))
            .map(|&f| g.face_area(f))
            .sum()
    }

    fn interior_faces(g: &HalfEdgeGraph) -> Vec<NodeId> {
        g.face_representatives()
            .into_iter()
            .filter(|&f| !g.has_mask(f, EXTERIOR) && !g.has_mask(f, DELETED))
            .collect()
    }

    fn run_all(g: &mut HalfEdgeGraph) {
        regularize(g);
        mark_exterior(g);
        triangulate_monotone_faces(g).unwrap();
    }

    #[test]
    fn convex_polygon_needs_no_diagonals_to_regularize() {
        let square = vec![w(0.0, 0.0), w(10.0, 0.0), w(10.0, 10.0), w(0.0, 10.0)];
        let (mut g, _) = build(&[square]);
        let before = g.len();
        regularize(&mut g);
        assert_eq!(g.len(), before);
    }

    #[test]
    fn square_triangulates_into_two_triangles() {
        let square = vec![w(0.0, 0.0), w(10.0, 0.0), w(10.0, 10.0), w(0.0, 10.0)];
        let (mut g, frame) = build(&[square]);
        run_all(&mut g);
        let faces = interior_faces(&g);
        assert_eq!(faces.len(), 2);
        for &f in &faces {
            assert_eq!(g.face_edge_count(f), 3);
            assert!(g.face_area(f) > 0.0);
        }
        let scale = frame.scale();
        assert!((interior_area(&g) / (scale * scale) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn hole_is_marked_exterior_and_area_is_conserved() {
        let outer = vec![w(0.0, 0.0), w(10.0, 0.0), w(10.0, 10.0), w(0.0, 10.0)];
        let hole = vec![w(3.0, 3.0), w(7.0, 3.0), w(7.0, 7.0), w(3.0, 7.0)];
        let (mut g, frame) = build(&[outer, hole]);
        run_all(&mut g);
        for &f in &interior_faces(&g) {
            assert_eq!(g.face_edge_count(f), 3);
        }
        let scale = frame.scale();
        let area = interior_area(&g) / (scale * scale);
        assert!((area - 84.0).abs() < 1e-9, "interior area {area}");
    }

    #[test]
    fn non_monotone_polygon_triangulates() {
        // U-shape: the notch corner at (3,3) is a split vertex.
        let u = vec![
            w(0.0, 0.0),
            w(9.0, 0.0),
            w(9.0, 8.0),
            w(6.0, 8.0),
            w(6.0, 3.0),
            w(3.0, 3.0),
            w(3.0, 8.0),
            w(0.0, 8.0),
        ];
        let (mut g, frame) = build(&[u]);
        run_all(&mut g);
        for &f in &interior_faces(&g) {
            assert_eq!(g.face_edge_count(f), 3);
            assert!(g.face_area(f) > 0.0);
        }
        let scale = frame.scale();
        let area = interior_area(&g) / (scale * scale);
        // 9x8 minus the 3x5 notch.
        assert!((area - 57.0).abs() < 1e-9, "interior area {area}");
    }

    #[test]
    fn merge_rebuilds_a_quad_from_two_triangles() {
        let square = vec![w(0.0, 0.0), w(10.0, 0.0), w(10.0, 10.0), w(0.0, 10.0)];
        let (mut g, _) = build(&[square]);
        run_all(&mut g);
        merge_convex_faces(&mut g, 4, true);
        let faces = interior_faces(&g);
        assert_eq!(faces.len(), 1);
        assert_eq!(g.face_edge_count(faces[0]), 4);
    }

    #[test]
    fn open_path_inside_polygon_is_bridged() {
        let outer = vec![w(0.0, 0.0), w(10.0, 0.0), w(10.0, 10.0), w(0.0, 10.0)];
        let all: Vec<DVec3> = outer.clone();
        let frame = LocalFrame::fit(&all, Tolerances::default()).unwrap();
        let mut g = HalfEdgeGraph::new();
        add_edges_xy(&mut g, &frame, &[outer], true, BOUNDARY, 0);
        add_edges_xy(
            &mut g,
            &frame,
            &[vec![w(3.0, 5.0), w(7.0, 5.0)]],
            false,
            0,
            crate::graph::RULE,
        );
        merge_or_union_loops(&mut g, &frame);
        run_all(&mut g);
        // Every interior face is a triangle and the rule edge survived.
        for &f in &interior_faces(&g) {
            assert_eq!(g.face_edge_count(f), 3);
        }
        let has_rule = g.live_nodes().any(|e| g.has_mask(e, crate::graph::RULE));
        assert!(has_rule);
        let scale = frame.scale();
        let area = interior_area(&g) / (scale * scale);
        assert!((area - 100.0).abs() < 1e-9, "interior area {area}");
    }
}
