//! Error types for rasterization.

use std::fmt;

/// Errors that can occur during rasterization.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterError {
    /// The target raster has a non-positive physical extent or a zero
    /// resolution. Rejected before any point processing.
    InvalidExtent {
        xres: usize,
        yres: usize,
        xreal: f64,
        yreal: f64,
    },

    /// Triangulation could not complete (collinear points, degenerate hull,
    /// floating-point breakdown). The caller may retry with different
    /// parameters or a non-triangulated method.
    Unstable(String),

    /// The caller requested an abort through the progress sink.
    ///
    /// This is a normal alternate outcome rather than a failure; it is
    /// carried in the error channel so `?` propagation works. No partial
    /// result is ever returned alongside it.
    Cancelled,
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::InvalidExtent {
                xres,
                yres,
                xreal,
                yreal,
            } => {
                write!(
                    f,
                    "invalid target raster: {}x{} pixels over {} x {}",
                    xres, yres, xreal, yreal
                )
            }
            RasterError::Unstable(msg) => {
                write!(f, "numerical instability: {}", msg)
            }
            RasterError::Cancelled => write!(f, "cancelled by caller"),
        }
    }
}

impl std::error::Error for RasterError {}
