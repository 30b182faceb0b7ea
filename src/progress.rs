//! Cooperative progress reporting and cancellation.
//!
//! Every long-running phase polls a single [`Progress`] sink: the sink
//! receives monotone completion fractions and answers whether the
//! computation should keep going. Returning `false` cancels the whole
//! rasterization call, which then reports [`RasterError::Cancelled`]
//! instead of a partial result.
//!
//! [`RasterError::Cancelled`]: crate::RasterError::Cancelled

use std::sync::atomic::{AtomicBool, Ordering};

/// Progress sink polled by long-running phases.
///
/// Implementations must be cheap: the sink is consulted once per completed
/// output row (and at phase boundaries), possibly from worker threads.
pub trait Progress: Sync {
    /// Report a completion fraction in `[0, 1]`.
    ///
    /// Returns `true` to continue, `false` to request cancellation.
    fn report(&self, fraction: f64) -> bool;
}

/// Ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn report(&self, _fraction: f64) -> bool {
        true
    }
}

impl<F> Progress for F
where
    F: Fn(f64) -> bool + Sync,
{
    #[inline]
    fn report(&self, fraction: f64) -> bool {
        self(fraction)
    }
}

/// A cancellation latch that can be tripped from another thread.
///
/// Useful when the caller drives cancellation from a UI event rather than
/// from the progress callback itself.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next poll.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Progress for CancelFlag {
    #[inline]
    fn report(&self, _fraction: f64) -> bool {
        !self.is_cancelled()
    }
}

/// Maps a phase-local fraction into a `[lo, hi]` slice of the end-to-end
/// fraction, so sequential phases compose into one monotone report.
pub struct PhaseProgress<'a> {
    inner: &'a dyn Progress,
    lo: f64,
    span: f64,
}

impl<'a> PhaseProgress<'a> {
    pub fn new(inner: &'a dyn Progress, lo: f64, hi: f64) -> Self {
        Self {
            inner,
            lo,
            span: hi - lo,
        }
    }
}

impl Progress for PhaseProgress<'_> {
    #[inline]
    fn report(&self, fraction: f64) -> bool {
        self.inner.report(self.lo + self.span * fraction.clamp(0.0, 1.0))
    }
}
