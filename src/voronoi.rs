//! Voronoi dual construction over a tagged Delaunay graph.
//!
//! Each graph vertex is tagged with its originating site index
//! (`install_point_indices`); a cell is then the working bounding box
//! clipped by one split half-plane per Delaunay neighbor. The split plane
//! supports three metrics: the plain perpendicular bisector, the radical
//! axis of two weighted circles (power distance), and an additively
//! weighted plane shifted toward the smaller site. Cells that collapse to
//! fewer than three corners are dropped rather than emitted unbounded.

use std::collections::BTreeSet;

use glam::{DVec2, DVec3};

use crate::build::is_disconnect;
use crate::error::{Result, TriangulateError};
use crate::frame::LocalFrame;
use crate::geom::Real;
use crate::graph::{mate, HalfEdgeGraph};
use crate::options::RANGE_EXPANSION_FRACTION;
use crate::output::{IndexedMesh, PointBin};

/// Split-plane metric selector. Values other than 1 and 2 fall back to the
/// unweighted bisector.
pub const METRIC_BISECTOR: i32 = 0;
pub const METRIC_RADICAL: i32 = 1;
pub const METRIC_ADDITIVE: i32 = 2;

/// Adjacency record for one emitted cell.
#[derive(Clone, Debug)]
pub struct CellAdjacency {
    /// Originating site index.
    pub site: usize,
    /// Offset of this cell's index run inside the mesh point-index stream.
    pub face_offset: usize,
    /// Positions in the cell array of the cells bordering this one.
    pub neighbors: Vec<usize>,
}

/// One polygon per surviving site plus optional adjacency metadata.
#[derive(Clone, Debug, Default)]
pub struct VoronoiDiagram {
    pub mesh: IndexedMesh,
    /// Site index of each emitted cell, in mesh face order.
    pub cell_sites: Vec<usize>,
    pub adjacency: Vec<CellAdjacency>,
}

/// Tag every graph vertex ring with the index of its nearest site.
/// Sites are expected to coincide with graph vertices; the nearest match
/// absorbs the builder's coordinate snapping.
pub fn install_point_indices(
    graph: &mut HalfEdgeGraph,
    frame: &LocalFrame,
    sites: &[DVec3],
) -> Result<()> {
    let verts = graph.vertex_representatives();
    if verts.is_empty() {
        return Err(TriangulateError::DegenerateInput("no vertices to tag"));
    }
    for (i, &site) in sites.iter().enumerate() {
        if is_disconnect(site) {
            continue;
        }
        let p = frame.to_local(site);
        let mut best = None;
        let mut best_d = f64::INFINITY;
        for &v in &verts {
            let d = (graph.pos(v) - p).length_squared();
            if d < best_d {
                best_d = d;
                best = Some(v);
            }
        }
        match best {
            Some(v) => graph.set_user_around_vertex(v, i as i64),
            None => return Err(TriangulateError::InvalidSite(i)),
        }
    }
    Ok(())
}

/// The split plane between weighted sites `a` and `b` as (point, outward
/// normal toward `b`). `None` for coincident sites.
pub fn voronoi_split_plane(
    a: DVec2,
    ra: Real,
    b: DVec2,
    rb: Real,
    metric: i32,
) -> Option<(DVec2, DVec2)> {
    let d = (b - a).length();
    if d <= 0.0 {
        return None;
    }
    let n = (b - a) / d;
    let da = match metric {
        METRIC_RADICAL => (d * d + ra * ra - rb * rb) / (2.0 * d),
        METRIC_ADDITIVE => (d + ra - rb) / 2.0,
        _ => d / 2.0,
    };
    Some((a + n * da, n))
}

/// Clip a convex polygon against the half-plane `dot(x - p, n) <= 0`.
fn clip_half_plane(poly: &[DVec2], p: DVec2, n: DVec2) -> Vec<DVec2> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    for (i, &a) in poly.iter().enumerate() {
        let b = poly[(i + 1) % poly.len()];
        let da = (a - p).dot(n);
        let db = (b - p).dot(n);
        if da <= 0.0 {
            out.push(a);
        }
        if (da < 0.0 && db > 0.0) || (da > 0.0 && db < 0.0) {
            let t = da / (da - db);
            out.push(a + (b - a) * t);
        }
    }
    out
}

/// Drop consecutive near-duplicate corners.
fn compress_polygon(poly: Vec<DVec2>, tol: Real) -> Vec<DVec2> {
    let mut out: Vec<DVec2> = Vec::with_capacity(poly.len());
    for p in poly {
        if let Some(&last) = out.last() {
            if (p - last).length() < tol {
                continue;
            }
        }
        out.push(p);
    }
    if out.len() > 1 && (out[0] - out[out.len() - 1]).length() < tol {
        out.pop();
    }
    out
}

/// The oversized working rectangle around the site extent.
fn expanded_range(sites: &[DVec3]) -> Option<(DVec2, DVec2)> {
    let mut min = DVec2::MAX;
    let mut max = DVec2::MIN;
    let mut any = false;
    for &s in sites {
        if is_disconnect(s) || !s.x.is_finite() || !s.y.is_finite() {
            continue;
        }
        min = min.min(DVec2::new(s.x, s.y));
        max = max.max(DVec2::new(s.x, s.y));
        any = true;
    }
    if !any {
        return None;
    }
    let pad = (max - min).length().max(1.0) * RANGE_EXPANSION_FRACTION;
    Some((min - DVec2::splat(pad), max + DVec2::splat(pad)))
}

fn weight(weights: &[Real], i: usize) -> Real {
    weights.get(i).copied().unwrap_or(0.0)
}

/// Build the Voronoi cells of `sites` from a Delaunay `graph` whose
/// vertices were tagged by `install_point_indices`. Neighbor pairs are
/// read off the vertex rings; each cell is the expanded bounding rectangle
/// clipped by its accumulated split planes. Every split plane is also
/// evaluated from the neighbor's side; a disagreement beyond tolerance is
/// logged as a soft inconsistency and the forward plane is used.
pub fn build_voronoi(
    graph: &HalfEdgeGraph,
    frame: &LocalFrame,
    sites: &[DVec3],
    weights: &[Real],
    metric: i32,
    with_adjacency: bool,
) -> Result<VoronoiDiagram> {
    let (box_min, box_max) = expanded_range(sites)
        .ok_or(TriangulateError::DegenerateInput("no finite sites"))?;
    let world_tol = frame.tol / frame.scale();

    if sites.len() == 2 {
        return two_site_diagram(sites, weights, metric, box_min, box_max, with_adjacency);
    }

    // Neighbor sites per site, read from the tagged Delaunay rings.
    let mut neighbor_sets: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); sites.len()];
    for v in graph.vertex_representatives() {
        let a = graph.user(v);
        if a < 0 || a as usize >= sites.len() {
            continue;
        }
        for n in graph.vertex_loop(v) {
            let b = graph.user(mate(n));
            if b >= 0 && b != a && (b as usize) < sites.len() {
                neighbor_sets[a as usize].insert(b as usize);
            }
        }
    }

    let rect = vec![
        box_min,
        DVec2::new(box_max.x, box_min.y),
        box_max,
        DVec2::new(box_min.x, box_max.y),
    ];

    let mut diagram = VoronoiDiagram::default();
    let mut bin = PointBin::new(world_tol);
    let mut cell_of_site = vec![usize::MAX; sites.len()];
    let mut kept_neighbors: Vec<Vec<usize>> = Vec::new();

    for (i, &site) in sites.iter().enumerate() {
        if is_disconnect(site) {
            continue;
        }
        let a = DVec2::new(site.x, site.y);
        let mut poly = rect.clone();
        for &j in &neighbor_sets[i] {
            let b = DVec2::new(sites[j].x, sites[j].y);
            let Some((p, n)) = voronoi_split_plane(a, weight(weights, i), b, weight(weights, j), metric)
            else {
                continue;
            };
            // Evaluate the reverse plane as a consistency check; the two
            // offsets must meet in the middle.
            if let Some((q, _)) = voronoi_split_plane(b, weight(weights, j), a, weight(weights, i), metric)
            {
                let gap = (p - q).length();
                if gap > world_tol {
                    log::debug!(
                        "voronoi split plane for sites {i} and {j} disagrees by {gap}; keeping the forward plane"
                    );
                }
            }
            poly = clip_half_plane(&poly, p, n);
            if poly.len() < 3 {
                break;
            }
        }
        let poly = compress_polygon(poly, world_tol);
        if poly.len() < 3 {
            continue;
        }
        let face_offset = diagram.mesh.point_index.len();
        for &c in &poly {
            let idx = bin.find_or_add(&mut diagram.mesh.points, DVec3::new(c.x, c.y, 0.0));
            diagram.mesh.point_index.push(idx as i32);
        }
        diagram.mesh.point_index.push(0);
        cell_of_site[i] = diagram.cell_sites.len();
        diagram.cell_sites.push(i);
        kept_neighbors.push(neighbor_sets[i].iter().copied().collect());
        if with_adjacency {
            diagram.adjacency.push(CellAdjacency {
                site: i,
                face_offset,
                neighbors: Vec::new(),
            });
        }
    }

    if with_adjacency {
        for (cell, adj) in diagram.adjacency.iter_mut().enumerate() {
            adj.neighbors = kept_neighbors[cell]
                .iter()
                .map(|&s| cell_of_site[s])
                .filter(|&c| c != usize::MAX)
                .collect();
        }
    }
    Ok(diagram)
}

/// With exactly two sites there is no triangulation to walk; the diagram
/// is the working rectangle cut once by the split plane: six points, two
/// quads.
fn two_site_diagram(
    sites: &[DVec3],
    weights: &[Real],
    metric: i32,
    box_min: DVec2,
    box_max: DVec2,
    with_adjacency: bool,
) -> Result<VoronoiDiagram> {
    let a = DVec2::new(sites[0].x, sites[0].y);
    let b = DVec2::new(sites[1].x, sites[1].y);
    let (p, n) = voronoi_split_plane(a, weight(weights, 0), b, weight(weights, 1), metric)
        .ok_or(TriangulateError::DegenerateInput("coincident sites"))?;
    let rect = vec![
        box_min,
        DVec2::new(box_max.x, box_min.y),
        box_max,
        DVec2::new(box_min.x, box_max.y),
    ];
    let tol = (box_max - box_min).length() * 1e-12;
    let mut diagram = VoronoiDiagram::default();
    let mut bin = PointBin::new(tol.max(1e-12));
    for (i, keep_side) in [(0usize, 1.0), (1usize, -1.0)] {
        let poly = compress_polygon(clip_half_plane(&rect, p, n * keep_side), tol);
        if poly.len() < 3 {
            return Err(TriangulateError::DegenerateInput("split plane misses range"));
        }
        let face_offset = diagram.mesh.point_index.len();
        for &c in &poly {
            let idx = bin.find_or_add(&mut diagram.mesh.points, DVec3::new(c.x, c.y, 0.0));
            diagram.mesh.point_index.push(idx as i32);
        }
        diagram.mesh.point_index.push(0);
        diagram.cell_sites.push(i);
        if with_adjacency {
            diagram.adjacency.push(CellAdjacency {
                site: i,
                face_offset,
                neighbors: vec![1 - i],
            });
        }
    }
    Ok(diagram)
}
