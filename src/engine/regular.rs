//! Regular-grid fast path.
//!
//! Scattered XYZ exports frequently come from raster instruments, so the
//! (x, y) pairs are already a permutation of a complete lattice. Detecting
//! that lets the caller copy z-values directly instead of running the full
//! interpolation pipeline.

use tracing::debug;

use crate::grid::RasterGrid;
use crate::types::Point3;

/// Accepted deviation from an exact lattice site, as a fraction of a step.
const LATTICE_TOL: f64 = 0.02;

const UNDEF: u32 = u32::MAX;

/// Detected 1D lattice: first center, step, number of distinct levels.
struct AxisLattice {
    origin: f64,
    step: f64,
    res: usize,
}

/// Cluster sorted coordinates into equally spaced levels.
///
/// A complete lattice produces consecutive gaps that are either near zero
/// (same column/row) or near one step, so half the maximum gap separates
/// the clusters.
fn axis_lattice(mut values: Vec<f64>) -> Option<AxisLattice> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    let span = values[values.len() - 1] - values[0];
    if span <= 0.0 {
        return None;
    }

    let mut max_gap = 0.0f64;
    for w in values.windows(2) {
        max_gap = max_gap.max(w[1] - w[0]);
    }
    let threshold = 0.5 * max_gap;

    // Cluster means become the lattice levels.
    let mut centers: Vec<f64> = Vec::new();
    let mut start = 0usize;
    for i in 1..=values.len() {
        if i == values.len() || values[i] - values[i - 1] > threshold {
            let cluster = &values[start..i];
            centers.push(cluster.iter().sum::<f64>() / cluster.len() as f64);
            start = i;
        }
    }

    let res = centers.len();
    if res < 2 {
        return None;
    }
    let step = (centers[res - 1] - centers[0]) / (res - 1) as f64;
    if !(step > 0.0) {
        return None;
    }
    for (i, &c) in centers.iter().enumerate() {
        if (c - (centers[0] + step * i as f64)).abs() > LATTICE_TOL * step {
            return None;
        }
    }

    Some(AxisLattice {
        origin: centers[0],
        step,
        res,
    })
}

/// Create a raster directly if the lateral positions form a complete
/// regular grid (up to `LATTICE_TOL`), with every site covered exactly
/// once. On success z-values are copied with no interpolation; the grid
/// gets pixel-center geometry around the lattice.
pub(crate) fn check_regular_grid(points: &[Point3]) -> Option<RasterGrid> {
    let n = points.len();
    if n < 4 {
        return None;
    }

    let xl = axis_lattice(points.iter().map(|p| p.x).collect())?;
    let yl = axis_lattice(points.iter().map(|p| p.y).collect())?;
    if xl.res.checked_mul(yl.res)? != n {
        return None;
    }

    // Map lattice sites to point indices; each site must be hit once.
    let mut map = vec![UNDEF; n];
    for (k, pt) in points.iter().enumerate() {
        let fx = (pt.x - xl.origin) / xl.step;
        let fy = (pt.y - yl.origin) / yl.step;
        let ix = fx.round();
        let iy = fy.round();
        if (fx - ix).abs() > LATTICE_TOL || (fy - iy).abs() > LATTICE_TOL {
            return None;
        }
        if ix < 0.0 || iy < 0.0 || ix >= xl.res as f64 || iy >= yl.res as f64 {
            return None;
        }
        let site = iy as usize * xl.res + ix as usize;
        if map[site] != UNDEF {
            return None;
        }
        map[site] = k as u32;
    }

    debug!("input is a complete {}x{} lattice", xl.res, yl.res);

    let mut grid = RasterGrid::new(
        xl.res,
        yl.res,
        xl.res as f64 * xl.step,
        yl.res as f64 * yl.step,
    )
    .with_offset(xl.origin - 0.5 * xl.step, yl.origin - 0.5 * yl.step);
    let data = grid.data_mut();
    for (site, &k) in map.iter().enumerate() {
        data[site] = points[k as usize].z;
    }
    Some(grid)
}
