//! Working tolerances and the locally fitted coordinate frame.
//!
//! Every top-level entry point fits one frame per call: a uniform-scale map
//! of the input extent onto roughly [-1, 1] in x and y. All graph-side
//! geometry lives in that frame; outputs are mapped back on extraction.

use glam::{DVec2, DVec3};

use crate::error::{Result, TriangulateError};
use crate::geom::Real;

/// Absolute tolerance applied when no override is supplied, in local-frame
/// units after fitting.
pub const DEFAULT_ABS_TOL: Real = 1.0e-10;
/// Relative tolerance applied against the extent diagonal.
pub const DEFAULT_REL_TOL: Real = 1.0e-8;

/// A single (absolute, relative) tolerance pair used consistently for
/// coordinate merge and compare across the whole pipeline.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Tolerances {
            abs: DEFAULT_ABS_TOL,
            rel: DEFAULT_REL_TOL,
        }
    }
}

impl Tolerances {
    /// Working distance tolerance for an extent with the given diagonal.
    pub fn working(&self, diagonal: Real) -> Real {
        self.abs.max(self.rel * diagonal)
    }
}

/// Uniform-scale range fit: `local = (world - center) * scale`, with scale
/// chosen so the larger extent axis maps to [-1, 1].
#[derive(Copy, Clone, Debug)]
pub struct LocalFrame {
    center: DVec2,
    scale: Real,
    /// Working tolerance in local units.
    pub tol: Real,
}

impl LocalFrame {
    /// Fit a frame over the xy-extent of `points`, ignoring disconnect
    /// sentinels and non-finite coordinates.
    pub fn fit(points: &[DVec3], tol: Tolerances) -> Result<LocalFrame> {
        let mut min = DVec2::MAX;
        let mut max = DVec2::MIN;
        let mut any = false;
        for p in points {
            if !p.x.is_finite() || !p.y.is_finite() || crate::build::is_disconnect(*p) {
                continue;
            }
            min = min.min(DVec2::new(p.x, p.y));
            max = max.max(DVec2::new(p.x, p.y));
            any = true;
        }
        if !any {
            return Err(TriangulateError::DegenerateInput("no finite points"));
        }
        let extent = max - min;
        let diagonal = extent.length();
        let world_tol = tol.working(diagonal);
        if extent.x.max(extent.y) <= world_tol {
            return Err(TriangulateError::DegenerateFrame { diagonal });
        }
        let scale = 2.0 / extent.x.max(extent.y);
        Ok(LocalFrame {
            center: 0.5 * (min + max),
            scale,
            tol: world_tol * scale,
        })
    }

    #[inline]
    pub fn to_local(&self, p: DVec3) -> DVec2 {
        (DVec2::new(p.x, p.y) - self.center) * self.scale
    }

    #[inline]
    pub fn to_world(&self, p: DVec2) -> DVec3 {
        let w = p / self.scale + self.center;
        DVec3::new(w.x, w.y, 0.0)
    }

    /// Scale factor from world to local units.
    #[inline]
    pub fn scale(&self) -> Real {
        self.scale
    }
}
