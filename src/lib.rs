//! tricell: planar constrained triangulation and Voronoi regions over a
//! shared half-edge graph.
//!
//! Inputs are XY point streams (closed loops, open rule paths, or scattered
//! points); outputs are compact indexed meshes with optional normal,
//! parameter, and edge-chain channels, plus Voronoi cell diagrams dual to
//! the Delaunay triangulation. See [`add_triangulation`],
//! [`create_xy_triangulation`], [`create_constrained_triangulation`], and
//! [`create_delaunay_and_voronoi_xy`].

pub mod build;
pub mod delaunay;
pub mod error;
pub mod frame;
pub mod geom;
pub mod graph;
pub mod options;
pub mod output;
pub mod regularize;
pub mod triangulate;
pub mod voronoi;

pub use build::DISCONNECT;
pub use error::{Result, TriangulateError};
pub use frame::{LocalFrame, Tolerances};
pub use options::{FacetOptions, ParamDisconnectPolicy};
pub use output::{EdgeChain, EdgeChainKind, IndexedMesh};
pub use triangulate::{
    add_triangulation, create_constrained_triangulation, create_delaunay_and_voronoi_xy,
    create_xy_triangulation,
};
pub use voronoi::{
    CellAdjacency, VoronoiDiagram, METRIC_ADDITIVE, METRIC_BISECTOR, METRIC_RADICAL,
};
