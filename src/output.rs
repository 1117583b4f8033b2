//! Extraction of an indexed polygon mesh from the triangulated graph.
//!
//! Faces not masked exterior are walked once each and emitted as
//! one-based, zero-terminated index runs. An index is positive when the
//! edge arriving at that vertex was part of the caller's input (boundary,
//! rule, or fringe constraint) and negative when the edge is a synthetic
//! diagonal introduced by triangulation; wireframe renderers rely on the
//! sign to hide synthetic edges. Extraction is a pure read over the graph:
//! repeated calls yield byte-identical output.

use std::collections::HashMap;

use glam::{DVec2, DVec3};

use crate::build::is_disconnect;
use crate::frame::LocalFrame;
use crate::geom::Real;
use crate::graph::{mate, HalfEdgeGraph, NodeId, BOUNDARY, CONSTRAINED, DELETED, EXTERIOR, RULE};
use crate::options::{FacetOptions, ParamDisconnectPolicy};

/// Where a boundary chain came from; part of the chain's topology tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EdgeChainKind {
    /// Closed-loop boundary edges.
    Boundary,
    /// Open-path rule edges.
    Rule,
}

/// A maximal run of constrained edges, as one-based point indices.
#[derive(Clone, Debug)]
pub struct EdgeChain {
    pub kind: EdgeChainKind,
    pub chain_index: u32,
    pub points: Vec<u32>,
}

/// Variable-size indexed polygon mesh.
///
/// `point_index` holds one run per face: one-based indices into `points`,
/// sign encoding edge visibility, each run terminated by 0. The normal and
/// parameter channels, when present, use the same run structure.
#[derive(Clone, Debug, Default)]
pub struct IndexedMesh {
    pub points: Vec<DVec3>,
    pub point_index: Vec<i32>,
    pub normals: Vec<DVec3>,
    pub normal_index: Vec<i32>,
    pub params: Vec<DVec2>,
    pub param_index: Vec<i32>,
    pub edge_chains: Vec<EdgeChain>,
}

impl IndexedMesh {
    pub fn is_empty(&self) -> bool {
        self.point_index.is_empty()
    }

    /// Number of emitted faces (zero terminators).
    pub fn face_count(&self) -> usize {
        self.point_index.iter().filter(|&&i| i == 0).count()
    }

    /// Face index runs without their terminators.
    pub fn faces(&self) -> Vec<Vec<i32>> {
        let mut out = Vec::new();
        let mut cur = Vec::new();
        for &i in &self.point_index {
            if i == 0 {
                out.push(std::mem::take(&mut cur));
            } else {
                cur.push(i);
            }
        }
        out
    }

    /// Total signed xy-area over all emitted faces.
    pub fn area_xy(&self) -> Real {
        let mut total = 0.0;
        for face in self.faces() {
            let mut area = 0.0;
            for (i, &idx) in face.iter().enumerate() {
                let a = self.points[(idx.unsigned_abs() - 1) as usize];
                let b = self.points[(face[(i + 1) % face.len()].unsigned_abs() - 1) as usize];
                area += a.x * b.y - b.x * a.y;
            }
            total += 0.5 * area;
        }
        total
    }
}

/// Tolerance-bucketed point interning: the mesh-side counterpart of the
/// builder's coordinate clustering. First occurrence wins; returns
/// one-based indices.
pub(crate) struct PointBin {
    grid: HashMap<(i64, i64), Vec<u32>>,
    tol: Real,
}

impl PointBin {
    pub(crate) fn new(tol: Real) -> Self {
        PointBin {
            grid: HashMap::new(),
            tol: tol.max(1e-300),
        }
    }

    pub(crate) fn find_or_add(&mut self, points: &mut Vec<DVec3>, p: DVec3) -> u32 {
        let key = (
            (p.x / self.tol).floor() as i64,
            (p.y / self.tol).floor() as i64,
        );
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = self.grid.get(&(key.0 + dx, key.1 + dy)) {
                    for &idx in bucket {
                        let q = points[(idx - 1) as usize];
                        if DVec2::new(p.x - q.x, p.y - q.y).length() < self.tol {
                            return idx;
                        }
                    }
                }
            }
        }
        points.push(p);
        let idx = points.len() as u32;
        self.grid.entry(key).or_default().push(idx);
        idx
    }
}

/// True when the pair of `e` came from caller input rather than from
/// triangulation.
#[inline]
fn edge_is_visible(graph: &HalfEdgeGraph, e: NodeId) -> bool {
    graph.has_mask(e, CONSTRAINED) || graph.has_mask(mate(e), CONSTRAINED)
}

/// Face-normal by Newell accumulation over the emitted vertex order;
/// degenerate faces fall back to +Z.
fn face_normal(world: &[DVec3]) -> DVec3 {
    let mut n = DVec3::ZERO;
    for (i, &a) in world.iter().enumerate() {
        let b = world[(i + 1) % world.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    if n.length_squared() > 0.0 {
        n.normalize()
    } else {
        DVec3::Z
    }
}

/// Walk every interior face once and emit the indexed mesh. Faces are
/// visited in ascending node order so the output is deterministic; the
/// graph is not modified.
pub fn extract_indexed_mesh(
    graph: &HalfEdgeGraph,
    frame: &LocalFrame,
    options: &FacetOptions,
) -> IndexedMesh {
    let world_tol = frame.tol / frame.scale();
    let mut mesh = IndexedMesh::default();
    let mut bin = PointBin::new(world_tol);

    let mut seen = vec![false; graph.len()];
    for e in 0..graph.len() as NodeId {
        if seen[e as usize] || graph.has_mask(e, DELETED | EXTERIOR) {
            continue;
        }
        let cycle = graph.face_loop(e);
        for &n in &cycle {
            seen[n as usize] = true;
        }
        if cycle.len() < 3 {
            continue;
        }

        // (world coordinate, visibility of the edge arriving at it), in
        // the requested winding order.
        let k = cycle.len();
        let mut entries: Vec<(DVec3, bool)> = Vec::with_capacity(k);
        if options.winding_ccw {
            for i in 0..k {
                let arriving = cycle[(i + k - 1) % k];
                entries.push((graph.node(cycle[i]).world, edge_is_visible(graph, arriving)));
            }
        } else {
            for i in (0..k).rev() {
                entries.push((graph.node(cycle[i]).world, edge_is_visible(graph, cycle[i])));
            }
        }

        let normal_slot = if options.need_normals {
            let world: Vec<DVec3> = entries.iter().map(|&(w, _)| w).collect();
            mesh.normals.push(face_normal(&world));
            mesh.normals.len() as i32
        } else {
            0
        };

        for &(w, visible) in &entries {
            let idx = bin.find_or_add(&mut mesh.points, w) as i32;
            mesh.point_index.push(if visible { idx } else { -idx });
            if options.need_normals {
                mesh.normal_index.push(normal_slot);
            }
        }
        mesh.point_index.push(0);
        if options.need_normals {
            mesh.normal_index.push(0);
        }
    }

    // Chains can intern endpoints not referenced by any face (a rule path
    // inside a hole, say), so they run before the params pass covers the
    // point list.
    if options.edge_chains_required {
        collect_edge_chains(graph, &mut mesh, &mut bin);
    }
    if options.need_params {
        emit_params(&mut mesh, frame, options.param_disconnect_policy);
    }
    mesh
}

/// Project every emitted point into the local frame and remap the extent
/// so parameter spacing tracks physical distance. The parameter index
/// stream mirrors the point index stream (unsigned).
fn emit_params(mesh: &mut IndexedMesh, frame: &LocalFrame, policy: ParamDisconnectPolicy) {
    let mut min = DVec2::MAX;
    for &p in &mesh.points {
        if !is_disconnect(p) {
            min = min.min(frame.to_local(p));
        }
    }
    let min = if min == DVec2::MAX { DVec2::ZERO } else { min };
    let scale = frame.scale();
    let mut skipped: Vec<u32> = Vec::new();
    for (i, &p) in mesh.points.iter().enumerate() {
        if is_disconnect(p) {
            match policy {
                ParamDisconnectPolicy::Skip => {
                    skipped.push(i as u32 + 1);
                    mesh.params.push(DVec2::ZERO);
                }
                ParamDisconnectPolicy::Include => mesh.params.push(frame.to_local(p) / scale),
                ParamDisconnectPolicy::Zero => mesh.params.push(DVec2::ZERO),
            }
            continue;
        }
        // Pseudo-distance remap: local offsets back to world-scale units.
        mesh.params.push((frame.to_local(p) - min) / scale);
    }
    mesh.param_index = mesh
        .point_index
        .iter()
        .map(|&i| {
            let idx = i.unsigned_abs();
            if skipped.contains(&idx) {
                0
            } else {
                idx as i32
            }
        })
        .collect();
}

/// Gather constrained edges into maximal chains: open rule paths and
/// boundary loops, each tagged with its kind and a running chain index.
fn collect_edge_chains(graph: &HalfEdgeGraph, mesh: &mut IndexedMesh, bin: &mut PointBin) {
    for kind in [EdgeChainKind::Boundary, EdgeChainKind::Rule] {
        let mask = match kind {
            EdgeChainKind::Boundary => BOUNDARY,
            EdgeChainKind::Rule => RULE,
        };
        // Undirected constrained edges of this kind, keyed by endpoint.
        let mut edges: Vec<(u32, u32)> = Vec::new();
        let mut by_point: HashMap<u32, Vec<usize>> = HashMap::new();
        for e in graph.live_nodes().filter(|&e| e % 2 == 0) {
            if !graph.has_mask(e, mask) && !graph.has_mask(mate(e), mask) {
                continue;
            }
            if kind == EdgeChainKind::Boundary
                && (graph.has_mask(e, EXTERIOR) && graph.has_mask(mate(e), EXTERIOR))
            {
                // Constraint fully inside discarded territory (trimmed
                // fringe) does not produce a chain.
                continue;
            }
            let a = bin.find_or_add(&mut mesh.points, graph.node(e).world);
            let b = bin.find_or_add(&mut mesh.points, graph.node(mate(e)).world);
            if a == b {
                continue;
            }
            let id = edges.len();
            edges.push((a, b));
            by_point.entry(a).or_default().push(id);
            by_point.entry(b).or_default().push(id);
        }

        let mut used = vec![false; edges.len()];
        // Open chains start at odd-degree points; whatever remains forms
        // closed loops.
        let mut starts: Vec<u32> = by_point
            .iter()
            .filter(|(_, es)| es.len() % 2 == 1)
            .map(|(&p, _)| p)
            .collect();
        starts.sort_unstable();
        let mut chain_index = mesh.edge_chains.len() as u32;
        let mut walk = |start: u32, used: &mut Vec<bool>, chains: &mut Vec<EdgeChain>| {
            let mut points = vec![start];
            let mut cur = start;
            loop {
                let next_edge = by_point
                    .get(&cur)
                    .and_then(|es| es.iter().find(|&&id| !used[id]).copied());
                let Some(id) = next_edge else { break };
                used[id] = true;
                cur = if edges[id].0 == cur {
                    edges[id].1
                } else {
                    edges[id].0
                };
                points.push(cur);
            }
            if points.len() > 1 {
                chains.push(EdgeChain {
                    kind,
                    chain_index,
                    points,
                });
                chain_index += 1;
            }
        };
        for start in starts {
            walk(start, &mut used, &mut mesh.edge_chains);
        }
        for id in 0..edges.len() {
            if !used[id] {
                walk(edges[id].0, &mut used, &mut mesh.edge_chains);
            }
        }
    }
}
