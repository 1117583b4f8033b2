//! Point deduplication and the polygon-to-graph builder.
//!
//! Raw point streams become isolated edge chains in the graph; the
//! merge-and-union pass then reconciles everything into a valid planar
//! subdivision: crossings are split at intersection points, coincident
//! endpoints are clustered within tolerance, and every vertex ring is
//! rebuilt in angular order.

use std::collections::HashMap;

use glam::{DVec2, DVec3};

use crate::frame::LocalFrame;
use crate::geom::{segment_intersect, Real};
use crate::graph::{mate, HalfEdgeGraph, NodeId, DELETED};

/// Sentinel point terminating a sub-chain without closing it.
pub const DISCONNECT: DVec3 = DVec3::MAX;

/// Returns true for the disconnect sentinel.
#[inline]
pub fn is_disconnect(p: DVec3) -> bool {
    p.x == f64::MAX || p.y == f64::MAX || !p.x.is_finite() || !p.y.is_finite()
}

/// Merge near-duplicate coordinates into canonical indices.
///
/// Two points are equal when their xy-distance is below `tol`. Stable:
/// the first occurrence wins as the canonical representative. Returns the
/// deduplicated points and a map from original index to canonical index.
pub fn dedup_points(points: &[DVec3], tol: Real) -> (Vec<DVec3>, Vec<usize>) {
    let cell = tol.max(1e-300);
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let mut out: Vec<DVec3> = Vec::with_capacity(points.len());
    let mut map = Vec::with_capacity(points.len());

    for &p in points {
        let key = ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = grid.get(&(key.0 + dx, key.1 + dy)) {
                    for &ci in bucket {
                        let q = out[ci];
                        let d = DVec2::new(p.x - q.x, p.y - q.y);
                        if d.length() < tol {
                            found = Some(ci);
                            break 'search;
                        }
                    }
                }
            }
        }
        match found {
            Some(ci) => map.push(ci),
            None => {
                let ci = out.len();
                out.push(p);
                grid.entry(key).or_default().push(ci);
                map.push(ci);
            }
        }
    }
    (out, map)
}

/// Split a point stream at disconnect sentinels into sub-chains.
pub fn split_at_disconnects(points: &[DVec3]) -> Vec<Vec<DVec3>> {
    let mut chains = Vec::new();
    let mut cur = Vec::new();
    for &p in points {
        if is_disconnect(p) {
            if !cur.is_empty() {
                chains.push(std::mem::take(&mut cur));
            }
        } else {
            cur.push(p);
        }
    }
    if !cur.is_empty() {
        chains.push(cur);
    }
    chains
}

/// Insert polygon loops or open paths into the graph as isolated chains.
///
/// Walks consecutive point pairs, one edge per pair, skipping zero-length
/// segments; `closed` also connects last to first. Trailing points equal to
/// the first are trimmed before closing. Closed chains get `mask_closed`,
/// open chains `mask_open`.
pub fn add_edges_xy(
    graph: &mut HalfEdgeGraph,
    frame: &LocalFrame,
    loops: &[Vec<DVec3>],
    closed: bool,
    mask_closed: u16,
    mask_open: u16,
) {
    let tol = frame.tol;
    for chain in loops {
        let mut pts: Vec<(DVec2, DVec3)> = Vec::with_capacity(chain.len());
        for &w in chain {
            if is_disconnect(w) {
                continue;
            }
            let p = frame.to_local(w);
            if let Some(&(last, _)) = pts.last() {
                if (p - last).length() < tol {
                    continue;
                }
            }
            pts.push((p, w));
        }
        // Trim trailing repeats of the first point.
        while pts.len() > 1 && (pts[pts.len() - 1].0 - pts[0].0).length() < tol {
            pts.pop();
        }
        if pts.len() < 2 {
            continue;
        }
        let mask = if closed { mask_closed } else { mask_open };
        for i in 0..pts.len() - 1 {
            graph.add_edge(pts[i], pts[i + 1], mask, 0);
        }
        if closed && pts.len() > 2 {
            graph.add_edge(pts[pts.len() - 1], pts[0], mask, 0);
        }
    }
}

/// Reconcile independently inserted chains into one valid planar graph:
/// no crossing edges, shared vertices where coordinates coincide within
/// tolerance.
pub fn merge_or_union_loops(graph: &mut HalfEdgeGraph, frame: &LocalFrame) {
    let tol = frame.tol;
    split_crossings(graph, frame);
    snap_and_weld(graph, tol);
    collapse_duplicate_edges(graph);
}

/// Split edges at pairwise interior intersections and at T-junctions
/// (a vertex lying in the interior of a non-incident edge).
fn split_crossings(graph: &mut HalfEdgeGraph, frame: &LocalFrame) {
    let tol = frame.tol;
    // Bounded fixpoint: each split strictly reduces remaining crossings.
    for _pass in 0..64 {
        let mut did_split = false;

        // Interior crossings.
        'outer: loop {
            let edges: Vec<NodeId> = graph
                .live_nodes()
                .filter(|&e| e % 2 == 0)
                .collect();
            for i in 0..edges.len() {
                for j in i + 1..edges.len() {
                    let (a, b) = (edges[i], edges[j]);
                    let hit = segment_intersect(
                        graph.pos(a),
                        graph.dst_pos(a),
                        graph.pos(b),
                        graph.dst_pos(b),
                        tol,
                    );
                    if let Some(p) = hit {
                        let w = frame.to_world(p);
                        graph.split_edge(a, p, w);
                        graph.split_edge(b, p, w);
                        did_split = true;
                        continue 'outer;
                    }
                }
            }
            break;
        }

        // T-junctions: split any edge whose interior passes a vertex.
        'tj: loop {
            let edges: Vec<NodeId> = graph
                .live_nodes()
                .filter(|&e| e % 2 == 0)
                .collect();
            let verts: Vec<NodeId> = graph.vertex_representatives();
            for &e in &edges {
                let a = graph.pos(e);
                let b = graph.dst_pos(e);
                let ab = b - a;
                let len2 = ab.length_squared();
                if len2 <= tol * tol {
                    continue;
                }
                for &v in &verts {
                    let p = graph.pos(v);
                    if (p - a).length() < tol || (p - b).length() < tol {
                        continue;
                    }
                    let t = (p - a).dot(ab) / len2;
                    if !(0.0..=1.0).contains(&t) {
                        continue;
                    }
                    let foot = a + ab * t;
                    if (p - foot).length() < tol {
                        graph.split_edge(e, p, graph.node(v).world);
                        continue 'tj;
                    }
                }
            }
            break;
        }

        if !did_split {
            break;
        }
    }
}

/// Cluster coincident origins, snap each cluster to its first member's
/// coordinates, drop zero-length pairs, and rebuild every vertex ring in
/// CCW angular order.
fn snap_and_weld(graph: &mut HalfEdgeGraph, tol: Real) {
    let nodes: Vec<NodeId> = graph.live_nodes().collect();
    let clusters = cluster_by_position(graph, &nodes, tol);

    // Snap to the canonical member.
    for cluster in &clusters {
        let canon = cluster[0];
        let (pos, world) = {
            let n = graph.node(canon);
            (n.pos, n.world)
        };
        for &m in &cluster[1..] {
            let node = graph.node_mut(m);
            node.pos = pos;
            node.world = world;
        }
    }

    // Excise pairs that collapsed to zero length.
    let evens: Vec<NodeId> = graph.live_nodes().filter(|&e| e % 2 == 0).collect();
    for e in evens {
        if graph.has_mask(e, DELETED) {
            continue;
        }
        if graph.pos(e) == graph.dst_pos(e) {
            graph.excise_pair(e);
        }
    }

    // Rebuild rings; the face links follow from the rings.
    for cluster in clusters {
        let mut live: Vec<NodeId> = cluster
            .into_iter()
            .filter(|&n| !graph.has_mask(n, DELETED))
            .collect();
        graph.rebuild_vertex_ring(&mut live);
    }
}

/// Group node origins by xy-position within `tol` (union by grid bucket).
fn cluster_by_position(graph: &HalfEdgeGraph, nodes: &[NodeId], tol: Real) -> Vec<Vec<NodeId>> {
    let cell = tol.max(1e-300);
    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let mut clusters: Vec<Vec<NodeId>> = Vec::new();
    for &n in nodes {
        let p = graph.pos(n);
        let key = ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = grid.get(&(key.0 + dx, key.1 + dy)) {
                    for &ci in bucket {
                        let q = graph.pos(clusters[ci][0]);
                        if (p - q).length() < tol {
                            found = Some(ci);
                            break 'search;
                        }
                    }
                }
            }
        }
        match found {
            Some(ci) => clusters[ci].push(n),
            None => {
                let ci = clusters.len();
                clusters.push(vec![n]);
                grid.entry(key).or_default().push(ci);
            }
        }
    }
    clusters
}

/// Excise one of each pair of coincident parallel edges (2-edge faces left
/// behind when independent loops share a border), merging their masks.
fn collapse_duplicate_edges(graph: &mut HalfEdgeGraph) {
    loop {
        let mut collapsed = false;
        for f in graph.face_representatives() {
            if graph.has_mask(f, DELETED) {
                continue;
            }
            let cycle = graph.face_loop(f);
            if cycle.len() == 2 && cycle[1] != mate(cycle[0]) {
                let keep = cycle[0];
                let drop = cycle[1];
                let extra = graph.node(drop).mask | graph.node(mate(drop)).mask;
                graph.excise_pair(drop);
                graph.set_mask_pair(keep, extra & !DELETED);
                collapsed = true;
                break;
            }
        }
        if !collapsed {
            return;
        }
    }
}
