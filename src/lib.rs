//! Rasterization of scattered XYZ point clouds onto regular 2D grids.
//!
//! Measured (x, y, z) samples — scanning-probe or profilometry exports,
//! typically — arrive as an unordered cloud. This crate turns such a cloud
//! into a regular raster of z-values suitable for image-style analysis:
//!
//! 1. near-coincident samples are merged (transitively) into mean
//!    representatives,
//! 2. the measured border is optionally extended by mirroring or periodic
//!    tiling so exterior pixels interpolate sensibly,
//! 3. the output grid is filled by one of five interpolation methods,
//!    three of them backed by a cached Delaunay triangulation.
//!
//! # Example
//!
//! ```
//! use xyz_raster::{rasterize, Interpolation, RasterConfig, XyRange};
//!
//! let points = vec![
//!     (0.0, 0.0, 1.0),
//!     (1.0, 0.0, 2.0),
//!     (0.0, 1.0, 3.0),
//!     (1.0, 1.0, 4.0),
//! ];
//! let config = RasterConfig::new(2, 2, XyRange::new(-0.5, 1.5, -0.5, 1.5))
//!     .with_interpolation(Interpolation::Average);
//! let output = rasterize(&points, &config).expect("rasterization succeeds");
//! assert_eq!(output.raster.data(), &[1.0, 2.0, 3.0, 4.0]);
//! ```
//!
//! For repeated renders of the same point cloud, hold on to a
//! [`RasterSession`]: it deduplicates the points once and caches the
//! triangulation across calls, rebuilding it only when the border
//! extension actually changes.

mod error;
mod grid;
pub mod progress;
mod types;

pub(crate) mod engine;

pub use engine::session::RasterSession;
pub use error::RasterError;
pub use grid::RasterGrid;
pub use progress::{CancelFlag, NoProgress, Progress};
pub use types::{Point3, Point3Like, XyRange};

/// Interpolation method, selected once per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Value of the nearest vertex of the containing Delaunay triangle.
    Round,
    /// Barycentric (piecewise-linear) interpolation over the containing
    /// Delaunay triangle.
    Linear,
    /// Inverse-squared-distance weighting over the corners of the
    /// containing Delaunay triangle.
    NaturalNeighbor,
    /// Brute-force inverse-distance (`1/r⁴`) weighting over all points.
    /// O(pixels · points) but smooth and triangulation-free.
    Field,
    /// Average of the samples falling into each pixel; empty pixels can be
    /// flagged in a companion mask.
    Average,
}

/// Exterior policy: how data beyond the measured extent is synthesized
/// before interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exterior {
    /// No synthesized points; exterior pixels clamp to the convex hull.
    Border,
    /// Reflect border samples across the measured edges.
    Mirror,
    /// Tile border samples periodically by the measured extent.
    Periodic,
}

/// Configuration of one rasterization target.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterConfig {
    /// Horizontal output resolution in pixels.
    pub xres: usize,
    /// Vertical output resolution in pixels.
    pub yres: usize,
    /// Physical region covered by the output grid; may exceed the
    /// measured extent.
    pub region: XyRange,
    pub interpolation: Interpolation,
    pub exterior: Exterior,
    /// With [`Interpolation::Average`], also produce a mask flagging
    /// pixels that received no samples.
    pub mask_empty: bool,
}

impl RasterConfig {
    /// Configuration with the given geometry and default method
    /// (linear interpolation, border exterior, no mask).
    pub fn new(xres: usize, yres: usize, region: XyRange) -> Self {
        Self {
            xres,
            yres,
            region,
            interpolation: Interpolation::Linear,
            exterior: Exterior::Border,
            mask_empty: false,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_exterior(mut self, exterior: Exterior) -> Self {
        self.exterior = exterior;
        self
    }

    pub fn with_mask_empty(mut self, mask_empty: bool) -> Self {
        self.mask_empty = mask_empty;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), RasterError> {
        let ok = self.xres > 0
            && self.yres > 0
            && self.region.width() > 0.0
            && self.region.height() > 0.0;
        if ok {
            Ok(())
        } else {
            Err(RasterError::InvalidExtent {
                xres: self.xres,
                yres: self.yres,
                xreal: self.region.width(),
                yreal: self.region.height(),
            })
        }
    }
}

/// Point bookkeeping for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointStats {
    /// Number of raw input points.
    pub original: usize,
    /// Number of points removed by merging near-coincident ones.
    pub merged: usize,
    /// Number of synthesized border points in the last extension.
    pub extension: usize,
}

/// Result of a successful render. The caller owns both grids.
#[derive(Debug, Clone)]
pub struct RasterOutput {
    pub raster: RasterGrid,
    /// Present when masking was requested: 1 marks pixels that received no
    /// contributing samples.
    pub mask: Option<RasterGrid>,
    pub stats: PointStats,
}

/// Rasterize a point cloud in one shot with default settings.
///
/// Equivalent to building a [`RasterSession`] and rendering once; callers
/// that render repeatedly should keep the session instead.
pub fn rasterize<P: Point3Like>(
    points: &[P],
    config: &RasterConfig,
) -> Result<RasterOutput, RasterError> {
    rasterize_with(points, config, &NoProgress)
}

/// Rasterize a point cloud in one shot with a progress/cancellation sink.
pub fn rasterize_with<P: Point3Like>(
    points: &[P],
    config: &RasterConfig,
    progress: &dyn Progress,
) -> Result<RasterOutput, RasterError> {
    RasterSession::new(points).rasterize(config, progress)
}
