//! Facet options: the single configuration object consumed by every entry
//! point. The tuning constants that shape the passes (fringe expansion,
//! iteration caps) live here as named constants rather than module statics,
//! so the engine carries no process-wide state.

use crate::frame::Tolerances;
use crate::geom::Real;

/// Fraction of the extent diagonal by which the fringe rectangle and the
/// Voronoi clip box are expanded beyond the point set.
pub const RANGE_EXPANSION_FRACTION: Real = 0.25;

/// Floor on the point-location walk budget. Cycle walks over the graph
/// itself are bounded by the node count; this only keeps the locate walk
/// generous on small graphs.
pub const MAX_AROUND_VERTEX: usize = 10_000;

/// How a disconnect sentinel inside a point stream is represented in the
/// parameter channel. The legacy behavior was switch-selected with no
/// documented criterion; `Skip` is the documented policy here.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ParamDisconnectPolicy {
    /// Do not emit a parameter for the sentinel (default).
    #[default]
    Skip,
    /// Emit the sentinel's projection directly.
    Include,
    /// Substitute a zeroed local point.
    Zero,
}

/// Options recognized by the triangulation and Voronoi entry points.
#[derive(Clone, Debug)]
pub struct FacetOptions {
    /// Caps a face's index-run length before forced triangulation.
    /// 3 emits triangles; 4 allows quads via convex-face merging.
    pub max_per_face: usize,
    /// Reject/avoid non-convex output faces when merging above triangles.
    pub convex_facets_required: bool,
    /// When set, boundary and interior edges longer than this trigger the
    /// refinement pass (the only path introducing non-input vertices).
    pub max_edge_length: Option<Real>,
    /// Biases diagonal choice during refinement toward even triangle flow
    /// (enables the aspect-ratio flip pass after refinement).
    pub smooth_triangle_flow_required: bool,
    /// Also emit boundary edge-chain metadata on the output mesh.
    pub edge_chains_required: bool,
    /// Emit the parameter (UV) channel.
    pub need_params: bool,
    /// Emit the normal channel.
    pub need_normals: bool,
    /// Keep fringe triangles in the extracted mesh (point-cloud paths).
    pub retain_fringe: bool,
    /// Winding orientation of emitted face loops; false reverses them.
    pub winding_ccw: bool,
    pub param_disconnect_policy: ParamDisconnectPolicy,
    pub tolerances: Tolerances,
}

impl Default for FacetOptions {
    fn default() -> Self {
        FacetOptions {
            max_per_face: 3,
            convex_facets_required: false,
            max_edge_length: None,
            smooth_triangle_flow_required: false,
            edge_chains_required: false,
            need_params: false,
            need_normals: false,
            retain_fringe: false,
            winding_ccw: true,
            param_disconnect_policy: ParamDisconnectPolicy::default(),
            tolerances: Tolerances::default(),
        }
    }
}

impl FacetOptions {
    /// Options producing a plain triangle mesh.
    pub fn triangles() -> Self {
        FacetOptions::default()
    }
}
