//! Error types for the triangulation and Voronoi pipeline.

use thiserror::Error;

/// Result type alias using [`TriangulateError`].
pub type Result<T> = std::result::Result<T, TriangulateError>;

/// Errors surfaced by the top-level entry points.
///
/// Failures are always returned through the normal result channel; the
/// engine never panics across its API boundary. A failed call produces no
/// geometry and leaves no shared state behind, because every call owns its
/// own graph instance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriangulateError {
    /// Fewer than 3 distinct points after deduplication, an empty loop set,
    /// or all points collinear/coincident.
    #[error("degenerate input: {0}")]
    DegenerateInput(&'static str),

    /// The working extent is too small to establish a non-degenerate local
    /// coordinate frame (e.g. all points coincide).
    #[error("cannot fit a local coordinate frame: extent diagonal {diagonal}")]
    DegenerateFrame {
        /// Diagonal of the offending extent.
        diagonal: f64,
    },

    /// The underlying subdivide/triangulate pass reported non-success.
    #[error("triangulation failed: {0}")]
    TriangulationFailed(&'static str),

    /// A Voronoi site index could not be matched to a graph vertex.
    #[error("site {0} has no matching graph vertex")]
    InvalidSite(usize),
}
