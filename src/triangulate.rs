//! Top-level triangulation entry points.
//!
//! Every entry point owns its graph, tolerance context, and local frame
//! for the duration of one call; nothing is cached across invocations and
//! the graph is dropped on every exit path, so concurrent calls on
//! independent inputs are safe by construction. Failures come back
//! through `Result` with no partial mesh.

use std::collections::HashSet;

use glam::{DVec2, DVec3};

use crate::build::{add_edges_xy, dedup_points, is_disconnect, merge_or_union_loops, split_at_disconnects};
use crate::delaunay::{
    edge_is_flippable, flip_triangles_for_incircle, flip_triangles_to_improve_aspect_ratio,
    insert_and_retriangulate,
};
use crate::error::{Result, TriangulateError};
use crate::frame::LocalFrame;
use crate::geom::{cross2, Real};
use crate::graph::{
    mate, HalfEdgeGraph, NodeId, BOUNDARY, CONSTRAINED, DELETED, EXTERIOR, FRINGE, RULE,
};
use crate::options::{FacetOptions, RANGE_EXPANSION_FRACTION};
use crate::output::{extract_indexed_mesh, IndexedMesh};
use crate::regularize::{
    mark_exterior, merge_convex_faces, regularize, triangulate_monotone_faces,
};
use crate::voronoi::{build_voronoi, install_point_indices, VoronoiDiagram};

/// Cap on midpoint insertions during edge-length refinement.
const MAX_REFINEMENT_POINTS: usize = 65_536;

/// Triangulate one polygon (optionally several loops separated by
/// disconnect sentinels). Closed loops become boundary edges; holes and
/// overlaps resolve through the merge-and-union pass and the parity
/// flood. Returns the indexed triangle (or capped polygon) mesh.
pub fn add_triangulation(points: &[DVec3], options: &FacetOptions) -> Result<IndexedMesh> {
    let chains = split_at_disconnects(points);
    if chains.is_empty() {
        return Err(TriangulateError::DegenerateInput("empty point stream"));
    }
    let frame = LocalFrame::fit(points, options.tolerances)?;
    require_distinct(points, &frame, 3)?;

    let mut graph = HalfEdgeGraph::new();
    add_edges_xy(&mut graph, &frame, &chains, true, BOUNDARY, 0);
    merge_or_union_loops(&mut graph, &frame);
    if let Some(max_len) = options.max_edge_length {
        subdivide_long_edges(&mut graph, &frame, max_len);
    }
    regularize(&mut graph);
    mark_exterior(&mut graph);
    triangulate_monotone_faces(&mut graph)?;
    if let Some(max_len) = options.max_edge_length {
        refine_interior_edges(&mut graph, &frame, max_len);
    }
    if options.smooth_triangle_flow_required {
        flip_triangles_to_improve_aspect_ratio(&mut graph);
    }
    finish(&mut graph, &frame, options)
}

/// Triangulate a scattered point cloud: a fringe rectangle around the
/// expanded extent gives the sweep a closed boundary, the points are
/// inserted incrementally, and incircle flips restore the Delaunay
/// property. Fringe triangles are masked off unless `retain_fringe`.
pub fn create_xy_triangulation(points: &[DVec3], options: &FacetOptions) -> Result<IndexedMesh> {
    let (mut graph, frame, _) = delaunay_graph_from_points(points, options)?;
    if options.smooth_triangle_flow_required {
        flip_triangles_to_improve_aspect_ratio(&mut graph);
    }
    if !options.retain_fringe {
        mark_fringe_faces(&mut graph);
    }
    finish(&mut graph, &frame, options)
}

/// Constrained triangulation of closed loops, open rule paths, and
/// isolated points. Loops bound the interior; rule edges and points are
/// honored as constraints. When no loop is given, a fringe rectangle
/// takes over as the outer boundary.
pub fn create_constrained_triangulation(
    loops: &[Vec<DVec3>],
    paths: &[Vec<DVec3>],
    points: &[DVec3],
    options: &FacetOptions,
) -> Result<IndexedMesh> {
    let mut all: Vec<DVec3> = Vec::new();
    all.extend(loops.iter().flatten());
    all.extend(paths.iter().flatten());
    all.extend(points.iter());
    let frame = LocalFrame::fit(&all, options.tolerances)?;
    require_distinct(&all, &frame, 3)?;

    let mut graph = HalfEdgeGraph::new();
    let use_fringe = loops.is_empty();
    if use_fringe {
        let rect = fringe_rect(&all);
        add_edges_xy(&mut graph, &frame, &[rect], true, BOUNDARY | FRINGE, 0);
    }
    add_edges_xy(&mut graph, &frame, loops, true, BOUNDARY, 0);
    add_edges_xy(&mut graph, &frame, paths, false, 0, RULE);
    merge_or_union_loops(&mut graph, &frame);
    regularize(&mut graph);
    mark_exterior(&mut graph);
    triangulate_monotone_faces(&mut graph)?;

    let mut start = first_interior_face(&graph);
    for &p in points {
        if is_disconnect(p) {
            continue;
        }
        let local = frame.to_local(p);
        if let Some(s) = start {
            if let Some(at) = insert_and_retriangulate(&mut graph, local, p, frame.tol, s) {
                start = Some(at);
            }
        }
    }
    flip_triangles_for_incircle(&mut graph);
    if options.smooth_triangle_flow_required {
        flip_triangles_to_improve_aspect_ratio(&mut graph);
    }
    if use_fringe && !options.retain_fringe {
        mark_fringe_faces(&mut graph);
    }
    finish(&mut graph, &frame, options)
}

/// Delaunay triangulation of a point set plus its Voronoi dual. With
/// exactly two distinct sites there is nothing to triangulate; the
/// triangle mesh comes back empty and the diagram uses the closed-form
/// two-cell split.
pub fn create_delaunay_and_voronoi_xy(
    points: &[DVec3],
    weights: &[Real],
    metric: i32,
    options: &FacetOptions,
) -> Result<(IndexedMesh, VoronoiDiagram)> {
    let finite: Vec<DVec3> = points.iter().copied().filter(|&p| !is_disconnect(p)).collect();
    let frame = LocalFrame::fit(&finite, options.tolerances)?;
    let (sites, _) = dedup_points(&finite, frame.tol / frame.scale());
    if sites.len() < 2 {
        return Err(TriangulateError::DegenerateInput("fewer than 2 distinct sites"));
    }
    if sites.len() == 2 {
        let graph = HalfEdgeGraph::new();
        let diagram = build_voronoi(&graph, &frame, &sites, weights, metric, true)?;
        return Ok((IndexedMesh::default(), diagram));
    }

    let (mut graph, frame, sites) = delaunay_graph_from_points(points, options)?;
    install_point_indices(&mut graph, &frame, &sites)?;
    let diagram = build_voronoi(&graph, &frame, &sites, weights, metric, true)?;
    if !options.retain_fringe {
        mark_fringe_faces(&mut graph);
    }
    let mesh = finish(&mut graph, &frame, options)?;
    Ok((mesh, diagram))
}

/// Shared point-cloud pipeline: fringe rectangle, incremental insertion,
/// incircle flips. Returns the graph, its frame, and the deduplicated
/// sites in insertion order.
fn delaunay_graph_from_points(
    points: &[DVec3],
    options: &FacetOptions,
) -> Result<(HalfEdgeGraph, LocalFrame, Vec<DVec3>)> {
    let finite: Vec<DVec3> = points.iter().copied().filter(|&p| !is_disconnect(p)).collect();
    let frame = LocalFrame::fit(&finite, options.tolerances)?;
    let (sites, _) = dedup_points(&finite, frame.tol / frame.scale());
    if sites.len() < 3 {
        return Err(TriangulateError::DegenerateInput("fewer than 3 distinct points"));
    }

    let mut graph = HalfEdgeGraph::new();
    let rect = fringe_rect(&finite);
    add_edges_xy(&mut graph, &frame, &[rect], true, BOUNDARY | FRINGE, 0);
    merge_or_union_loops(&mut graph, &frame);
    regularize(&mut graph);
    mark_exterior(&mut graph);
    triangulate_monotone_faces(&mut graph)?;

    let mut start = first_interior_face(&graph)
        .ok_or(TriangulateError::TriangulationFailed("fringe produced no interior"))?;
    let mut inserted = 0usize;
    for &site in &sites {
        let local = frame.to_local(site);
        if let Some(at) = insert_and_retriangulate(&mut graph, local, site, frame.tol, start) {
            start = at;
            inserted += 1;
        }
    }
    log::debug!("inserted {inserted} of {} sites into the fringe mesh", sites.len());
    flip_triangles_for_incircle(&mut graph);
    Ok((graph, frame, sites))
}

/// Expanded axis-aligned rectangle around the finite points, in CCW
/// order.
fn fringe_rect(points: &[DVec3]) -> Vec<DVec3> {
    let mut min = DVec2::MAX;
    let mut max = DVec2::MIN;
    for &p in points {
        if is_disconnect(p) {
            continue;
        }
        min = min.min(DVec2::new(p.x, p.y));
        max = max.max(DVec2::new(p.x, p.y));
    }
    let pad = (max - min).length().max(1.0) * RANGE_EXPANSION_FRACTION;
    let (min, max) = (min - DVec2::splat(pad), max + DVec2::splat(pad));
    vec![
        DVec3::new(min.x, min.y, 0.0),
        DVec3::new(max.x, min.y, 0.0),
        DVec3::new(max.x, max.y, 0.0),
        DVec3::new(min.x, max.y, 0.0),
    ]
}

/// Fail unless the stream holds at least `need` distinct finite points.
fn require_distinct(points: &[DVec3], frame: &LocalFrame, need: usize) -> Result<()> {
    let finite: Vec<DVec3> = points.iter().copied().filter(|&p| !is_disconnect(p)).collect();
    let (distinct, _) = dedup_points(&finite, frame.tol / frame.scale());
    if distinct.len() < need {
        return Err(TriangulateError::DegenerateInput("fewer than 3 distinct points"));
    }
    Ok(())
}

fn first_interior_face(graph: &HalfEdgeGraph) -> Option<NodeId> {
    graph
        .face_representatives()
        .into_iter()
        .find(|&f| !graph.has_mask(f, EXTERIOR | DELETED) && graph.face_edge_count(f) == 3)
}

/// Pre-triangulation pass: halve constraint edges until none exceeds the
/// configured maximum world-space length.
fn subdivide_long_edges(graph: &mut HalfEdgeGraph, frame: &LocalFrame, max_len: Real) {
    let max_local = max_len * frame.scale();
    if max_local <= 2.0 * frame.tol {
        log::debug!("max_edge_length below tolerance; skipping subdivision");
        return;
    }
    for _ in 0..32 {
        let long: Vec<NodeId> = graph
            .live_nodes()
            .filter(|&e| e % 2 == 0 && graph.dir(e).length() > max_local)
            .collect();
        if long.is_empty() {
            return;
        }
        for e in long {
            if graph.has_mask(e, DELETED) {
                continue;
            }
            let mid = 0.5 * (graph.pos(e) + graph.dst_pos(e));
            let mid_world = 0.5 * (graph.node(e).world + graph.node(mate(e)).world);
            graph.split_edge(e, mid, mid_world);
        }
    }
}

/// Post-triangulation pass: insert midpoints of interior edges that still
/// exceed the maximum length, re-triangulating locally.
///
/// A midpoint that lands on an existing vertex means the edge is a chord
/// running straight through that vertex (monotone tessellation emits such
/// chords along collinear boundary runs). Splitting would allocate
/// nothing, so the chord is flipped off the vertex instead; a chord whose
/// flip would create inverted triangles is set aside and retried after the
/// next structural change. Bounded by `MAX_REFINEMENT_POINTS` steps.
fn refine_interior_edges(graph: &mut HalfEdgeGraph, frame: &LocalFrame, max_len: Real) {
    let max_local = max_len * frame.scale();
    if max_local <= 2.0 * frame.tol {
        return;
    }
    let mut set_aside: HashSet<NodeId> = HashSet::new();
    let mut steps = 0usize;
    loop {
        let next = graph.live_nodes().find(|&e| {
            e % 2 == 0
                && !set_aside.contains(&e)
                && !graph.has_mask(e, CONSTRAINED)
                && !graph.has_mask(e, EXTERIOR)
                && !graph.has_mask(mate(e), EXTERIOR)
                && graph.dir(e).length() > max_local
        });
        let Some(e) = next else { return };
        steps += 1;
        if steps > MAX_REFINEMENT_POINTS {
            log::debug!("edge refinement stopped at {MAX_REFINEMENT_POINTS} steps");
            return;
        }
        let mid = 0.5 * (graph.pos(e) + graph.dst_pos(e));
        let mid_world = 0.5 * (graph.node(e).world + graph.node(mate(e)).world);
        let before = graph.len();
        match insert_and_retriangulate(graph, mid, mid_world, frame.tol, e) {
            Some(_) if graph.len() > before => set_aside.clear(),
            Some(_) => {
                if flip_chord_off_vertex(graph, e) {
                    set_aside.clear();
                } else {
                    set_aside.insert(e);
                }
            }
            None => {
                set_aside.insert(e);
            }
        }
    }
}

/// Flip `e` when the flipped diagonal yields two positive-area triangles.
fn flip_chord_off_vertex(graph: &mut HalfEdgeGraph, e: NodeId) -> bool {
    if !edge_is_flippable(graph, e) {
        return false;
    }
    let org = graph.pos(e);
    let dst = graph.dst_pos(e);
    let apex_left = graph.pos(graph.fsucc(graph.fsucc(e)));
    let apex_right = graph.pos(graph.fsucc(graph.fsucc(mate(e))));
    if cross2(org, apex_right, apex_left) <= 0.0 || cross2(dst, apex_left, apex_right) <= 0.0 {
        return false;
    }
    graph.flip_edge(e);
    true
}

/// Mark every face touching a fringe-rectangle vertex as exterior so it
/// drops out of extraction.
fn mark_fringe_faces(graph: &mut HalfEdgeGraph) {
    let mut fringe_vertex = vec![false; graph.len()];
    for v in graph.vertex_representatives() {
        let ring = graph.vertex_loop(v);
        if ring.iter().any(|&n| graph.has_mask(n, FRINGE)) {
            for n in ring {
                fringe_vertex[n as usize] = true;
            }
        }
    }
    for f in graph.face_representatives() {
        if graph.has_mask(f, EXTERIOR | DELETED) {
            continue;
        }
        let cycle = graph.face_loop(f);
        if cycle.iter().any(|&n| fringe_vertex[n as usize]) {
            for n in cycle {
                graph.set_mask(n, EXTERIOR);
            }
        }
    }
}

/// Final shared stage: optional convex merging above the triangle limit,
/// then extraction. An empty result is reported as a failure rather than
/// an empty-but-successful mesh.
fn finish(graph: &mut HalfEdgeGraph, frame: &LocalFrame, options: &FacetOptions) -> Result<IndexedMesh> {
    if options.max_per_face > 3 {
        merge_convex_faces(graph, options.max_per_face, options.convex_facets_required);
    }
    let mesh = extract_indexed_mesh(graph, frame, options);
    if mesh.is_empty() {
        return Err(TriangulateError::TriangulationFailed("no interior faces produced"));
    }
    Ok(mesh)
}
