//! The scattered-data rasterization engine.
//!
//! Pipeline: points are deduplicated once per session ([`analyse`]), the
//! border extension is rebuilt per call ([`extend`]), and the output grid
//! is filled either from a cached Delaunay triangulation
//! ([`triangulate`]) or directly from the point set ([`field`]).
//! [`session`] owns the caches and sequences the phases.

/// Conditionally parallel iterator over mutable row chunks of a slice.
macro_rules! maybe_par_chunks_mut {
    ($slice:expr, $n:expr) => {{
        #[cfg(feature = "parallel")]
        {
            $slice.par_chunks_mut($n)
        }
        #[cfg(not(feature = "parallel"))]
        {
            $slice.chunks_mut($n)
        }
    }};
}

pub(crate) mod analyse;
pub(crate) mod extend;
pub(crate) mod field;
pub(crate) mod regular;
pub(crate) mod session;
pub(crate) mod triangulate;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::progress::Progress;

/// Default relative tolerance for treating points as coincident.
pub(crate) const EPSREL: f64 = 1e-8;

/// Dedup cell sides are smaller than what triangulation would need, as the
/// virtual grid only serves identical-point detection and border extension.
pub(crate) const CELL_SIDE: f64 = 1.6;

/// Expected share of a triangulated render spent building the
/// triangulation; the fill pass gets the rest.
pub(crate) const TRIANGULATION_WEIGHT: f64 = 0.4;

/// In-place prefix sum, turning per-cell counts into end offsets.
pub(crate) fn index_accumulate(index: &mut [u32]) {
    for i in 1..index.len() {
        index[i] += index[i - 1];
    }
}

/// Shift offsets back by one cell, turning end offsets into start offsets.
pub(crate) fn index_rewind(index: &mut [u32]) {
    for i in (1..index.len()).rev() {
        index[i] = index[i - 1];
    }
    index[0] = 0;
}

/// Shared per-phase row accounting: progress reporting plus a cancellation
/// latch, usable from parallel workers.
///
/// Delivery to the sink is serialized so reported fractions stay monotone
/// even when rows complete out of order across threads.
pub(crate) struct RowTicker<'a> {
    progress: &'a dyn Progress,
    total: usize,
    state: Mutex<TickerState>,
    cancelled: AtomicBool,
}

#[derive(Default)]
struct TickerState {
    done: usize,
    high_water: f64,
}

impl<'a> RowTicker<'a> {
    pub(crate) fn new(progress: &'a dyn Progress, total: usize) -> Self {
        Self {
            progress,
            total,
            state: Mutex::new(TickerState::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Record one completed row; reports progress and latches cancellation
    /// if the sink asks to stop.
    pub(crate) fn row_done(&self) {
        if self.is_cancelled() {
            return;
        }
        let keep_going = {
            let mut state = self.state.lock().expect("progress state poisoned");
            state.done += 1;
            let fraction = state.done as f64 / self.total.max(1) as f64;
            state.high_water = state.high_water.max(fraction);
            self.progress.report(state.high_water)
        };
        if !keep_going {
            self.cancelled.store(true, Ordering::Relaxed);
        }
    }

    /// Convert the latch state into the phase outcome.
    pub(crate) fn finish(&self) -> Result<(), crate::RasterError> {
        if self.is_cancelled() {
            Err(crate::RasterError::Cancelled)
        } else {
            Ok(())
        }
    }
}
