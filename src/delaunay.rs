//! Delaunay conditioning of a triangulated graph.
//!
//! `flip_triangles_for_incircle` drives the triangulation toward the
//! constrained Delaunay optimum with a mark-and-stack flip loop; edges
//! carrying a constraint mask and edges touching exterior faces are never
//! flipped. `flip_triangles_to_improve_aspect_ratio` is a gentler single
//! pass used when the caller only wants smoother triangle flow.
//! `insert_and_retriangulate` adds an interior point to an existing
//! triangulation by a visibility walk, fan split, and local flips.

use glam::{DVec2, DVec3};

use crate::geom::{aspect_ratio, cross2, in_circle, Real};
use crate::graph::{mate, HalfEdgeGraph, NodeId, CONSTRAINED, DELETED, EXTERIOR, VISITED};
use crate::options::MAX_AROUND_VERTEX;

/// A pair is flippable when it is unconstrained, both sides are interior,
/// and both sides are triangles.
pub fn edge_is_flippable(graph: &HalfEdgeGraph, e: NodeId) -> bool {
    if graph.has_mask(e, CONSTRAINED | DELETED) || graph.has_mask(mate(e), CONSTRAINED) {
        return false;
    }
    if graph.has_mask(e, EXTERIOR) || graph.has_mask(mate(e), EXTERIOR) {
        return false;
    }
    graph.fsucc(graph.fsucc(graph.fsucc(e))) == e
        && graph.fsucc(graph.fsucc(graph.fsucc(mate(e)))) == mate(e)
}

/// Empty-circumcircle test for the pair of `e`: true when the apex of the
/// right triangle lies outside (or on) the circumcircle of the left one.
fn edge_is_locally_delaunay(graph: &HalfEdgeGraph, e: NodeId) -> bool {
    let apex_left = graph.pos(graph.fsucc(graph.fsucc(e)));
    let apex_right = graph.pos(graph.fsucc(graph.fsucc(mate(e))));
    in_circle(apex_right, graph.pos(e), graph.dst_pos(e), apex_left) <= 0.0
}

/// Flip non-Delaunay interior edges until the empty-circumcircle property
/// holds everywhere it can. Uses a work stack seeded with every flippable
/// edge; each flip re-queues the four surrounding edges. The iteration cap
/// is quadratic in the seed count, matching the worst-case flip distance.
/// Returns the number of flips performed.
pub fn flip_triangles_for_incircle(graph: &mut HalfEdgeGraph) -> usize {
    graph.clear_mask_all(VISITED);
    let mut stack: Vec<NodeId> = Vec::new();
    let evens: Vec<NodeId> = graph.live_nodes().filter(|&e| e % 2 == 0).collect();
    for e in evens {
        if edge_is_flippable(graph, e) {
            graph.set_mask_pair(e, VISITED);
            stack.push(e);
        }
    }

    let max_iter = stack.len() * stack.len() + 1;
    let mut iter = 0;
    let mut flips = 0;
    while let Some(e) = stack.pop() {
        if iter >= max_iter {
            log::debug!("incircle refinement stopped at iteration cap {max_iter}");
            break;
        }
        iter += 1;
        graph.node_mut(e).mask &= !VISITED;
        graph.node_mut(mate(e)).mask &= !VISITED;

        if !edge_is_flippable(graph, e) || edge_is_locally_delaunay(graph, e) {
            continue;
        }
        let neighbors = [
            graph.fsucc(e),
            graph.fpred(e),
            graph.fsucc(mate(e)),
            graph.fpred(mate(e)),
        ];
        graph.flip_edge(e);
        flips += 1;
        for nb in neighbors {
            if !graph.has_mask(nb, VISITED) && edge_is_flippable(graph, nb) {
                graph.set_mask_pair(nb, VISITED);
                stack.push(nb);
            }
        }
    }
    graph.clear_mask_all(VISITED);
    flips
}

/// One pass over all interior edges, flipping wherever the alternate
/// diagonal strictly improves the worse of the two triangle qualities.
/// Not guaranteed to reach a fixed point in one pass; callers may
/// re-invoke. Returns the number of flips performed.
pub fn flip_triangles_to_improve_aspect_ratio(graph: &mut HalfEdgeGraph) -> usize {
    let mut flips = 0;
    let n = graph.len() as NodeId;
    let mut e: NodeId = 0;
    while e < n {
        let pair = e;
        e += 2;
        if !edge_is_flippable(graph, pair) {
            continue;
        }
        let a = graph.pos(pair);
        let b = graph.dst_pos(pair);
        let c = graph.pos(graph.fsucc(graph.fsucc(pair)));
        let d = graph.pos(graph.fsucc(graph.fsucc(mate(pair))));
        let current = aspect_ratio(a, b, c).min(aspect_ratio(b, a, d));
        let flipped = aspect_ratio(a, d, c).min(aspect_ratio(d, b, c));
        if flipped > current {
            graph.flip_edge(pair);
            flips += 1;
        }
    }
    flips
}

/// Where a point landed during the locate walk.
enum Location {
    /// Existing vertex within tolerance; node at that vertex.
    Vertex(NodeId),
    /// Within tolerance of this edge's interior.
    Edge(NodeId),
    /// Strictly inside the triangle left of this node.
    Face(NodeId),
    /// Outside every interior triangle.
    Outside,
}

/// Visibility walk from `start` (a node on an interior triangle) toward
/// `p`: step across any triangle edge that has `p` strictly on its right.
fn locate(graph: &HalfEdgeGraph, start: NodeId, p: DVec2, tol: Real) -> Location {
    let mut cur = start;
    for _ in 0..graph.len().max(MAX_AROUND_VERTEX) {
        let cycle = graph.face_loop(cur);
        // Vertex and edge proximity first so near-degenerate walks stop.
        for &e in &cycle {
            if (graph.pos(e) - p).length() < tol {
                return Location::Vertex(e);
            }
        }
        for &e in &cycle {
            let a = graph.pos(e);
            let b = graph.dst_pos(e);
            let ab = b - a;
            let len2 = ab.length_squared();
            if len2 > 0.0 {
                let t = (p - a).dot(ab) / len2;
                if (0.0..=1.0).contains(&t) && (p - (a + ab * t)).length() < tol {
                    return Location::Edge(e);
                }
            }
        }
        let mut stepped = false;
        for &e in &cycle {
            if cross2(graph.pos(e), graph.dst_pos(e), p) < 0.0 {
                let across = mate(e);
                if graph.has_mask(across, EXTERIOR) {
                    return Location::Outside;
                }
                cur = across;
                stepped = true;
                break;
            }
        }
        if !stepped {
            return Location::Face(cur);
        }
    }
    Location::Outside
}

/// Insert `p` into an existing interior triangulation: walk to the
/// containing triangle, fan-split it (or split the containing edge), and
/// restore the local Delaunay property. Points within `tol` of an existing
/// vertex reuse it; points outside the interior are rejected.
///
/// Returns a node whose origin is the (possibly pre-existing) vertex.
pub fn insert_and_retriangulate(
    graph: &mut HalfEdgeGraph,
    p: DVec2,
    world: DVec3,
    tol: Real,
    start: NodeId,
) -> Option<NodeId> {
    match locate(graph, start, p, tol) {
        Location::Outside => None,
        Location::Vertex(v) => Some(v),
        Location::Edge(t) => {
            let n = graph.split_edge(t, p, world);
            // Each interior side is now a quad; cut it back to triangles
            // with a diagonal from the split point to the far apex.
            let mut seeds = Vec::new();
            if !graph.has_mask(t, EXTERIOR) && graph.face_edge_count(t) == 4 {
                let apex_in = graph.fpred(t);
                seeds.push(graph.fsucc(n));
                seeds.push(apex_in);
                graph.connect(t, apex_in, 0);
            }
            let nm = mate(n);
            if !graph.has_mask(nm, EXTERIOR) && graph.face_edge_count(nm) == 4 {
                let apex_in = graph.fpred(nm);
                seeds.push(graph.fsucc(mate(t)));
                seeds.push(apex_in);
                graph.connect(nm, apex_in, 0);
            }
            restore_local_delaunay(graph, seeds);
            Some(mate(n))
        }
        Location::Face(f) => {
            let a = f;
            let b = graph.fsucc(a);
            let c = graph.fsucc(b);
            let m = graph.split_face_at_point(a, p, world);
            let n = mate(m);
            graph.connect(n, b, 0);
            graph.connect(n, c, 0);
            restore_local_delaunay(graph, vec![a, b, c]);
            Some(m)
        }
    }
}

/// Bounded incircle flip loop seeded with the given edges; used after a
/// local insertion instead of re-running the global pass.
fn restore_local_delaunay(graph: &mut HalfEdgeGraph, mut stack: Vec<NodeId>) {
    let max_iter = (stack.len() + 4) * (stack.len() + 4);
    let mut iter = 0;
    while let Some(e) = stack.pop() {
        if iter >= max_iter {
            break;
        }
        iter += 1;
        if !edge_is_flippable(graph, e) || edge_is_locally_delaunay(graph, e) {
            continue;
        }
        let neighbors = [
            graph.fsucc(e),
            graph.fpred(e),
            graph.fsucc(mate(e)),
            graph.fpred(mate(e)),
        ];
        graph.flip_edge(e);
        stack.extend_from_slice(&neighbors);
    }
}
