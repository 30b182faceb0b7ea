//! Direct point-set fills: inverse-distance weighting and cell averaging.
//!
//! Both methods bypass the triangulation entirely and work on the extended
//! point set. They partition work by output row; rows share only the
//! read-only point array, so no synchronization beyond the cancellation
//! latch is needed.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{index_accumulate, index_rewind, RowTicker};
use crate::grid::RasterGrid;
use crate::progress::Progress;
use crate::types::Point3;
use crate::RasterError;

/// Fill the grid by inverse-distance weighting over all points.
///
/// The weight is `1/r⁴`; a pixel center coinciding exactly with a sample
/// adopts that sample's value outright. O(pixels · points).
pub(crate) fn interpolate_field(
    points: &[Point3],
    grid: &mut RasterGrid,
    progress: &dyn Progress,
) -> Result<(), RasterError> {
    if points.is_empty() {
        return Ok(());
    }

    let xres = grid.xres();
    let yres = grid.yres();
    let dx = grid.dx();
    let dy = grid.dy();
    let xoff = grid.xoff();
    let yoff = grid.yoff();

    let ticker = RowTicker::new(progress, yres);
    maybe_par_chunks_mut!(grid.data_mut(), xres)
        .enumerate()
        .for_each(|(i, row)| {
            if ticker.is_cancelled() {
                return;
            }
            let y = yoff + dy * (i as f64 + 0.5);
            for (j, out) in row.iter_mut().enumerate() {
                let x = xoff + dx * (j as f64 + 0.5);
                let mut w = 0.0;
                let mut s = 0.0;
                for pt in points {
                    let ddx = x - pt.x;
                    let ddy = y - pt.y;
                    let mut r2 = ddx * ddx + ddy * ddy;
                    r2 *= r2;
                    if r2 == 0.0 {
                        s = pt.z;
                        w = 1.0;
                        break;
                    }
                    let r2 = 1.0 / r2;
                    w += r2;
                    s += r2 * pt.z;
                }
                *out = s / w;
            }
            ticker.row_done();
        });

    ticker.finish()
}

/// Pixel containing a point, or None when the point lies outside the grid.
/// The far edges belong to the last pixel.
#[inline]
fn pixel_of(pt: &Point3, grid: &RasterGrid) -> Option<(usize, usize)> {
    let fx = (pt.x - grid.xoff()) / grid.dx();
    let fy = (pt.y - grid.yoff()) / grid.dy();
    if !(0.0..=grid.xres() as f64).contains(&fx) || !(0.0..=grid.yres() as f64).contains(&fy) {
        return None;
    }
    let col = (fx.floor() as usize).min(grid.xres() - 1);
    let row = (fy.floor() as usize).min(grid.yres() - 1);
    Some((col, row))
}

/// Fill the grid by averaging the points falling into each pixel.
///
/// Pixels that receive no points stay at 0; with `mask` present they are
/// additionally flagged with 1 there (0 otherwise).
pub(crate) fn average_cells(
    points: &[Point3],
    grid: &mut RasterGrid,
    mask: Option<&mut RasterGrid>,
    progress: &dyn Progress,
) -> Result<(), RasterError> {
    let xres = grid.xres();
    let yres = grid.yres();

    // Bucket point indices by output row so rows fill independently.
    let mut row_index = vec![0u32; yres + 1];
    for pt in points {
        if let Some((_, row)) = pixel_of(pt, grid) {
            row_index[row] += 1;
        }
    }
    index_accumulate(&mut row_index);
    index_rewind(&mut row_index);
    let nkept = row_index[yres] as usize;

    let mut binned: Vec<(u32, f64)> = vec![(0, 0.0); nkept];
    for pt in points {
        if let Some((col, row)) = pixel_of(pt, grid) {
            binned[row_index[row] as usize] = (col as u32, pt.z);
            row_index[row] += 1;
        }
    }
    index_rewind(&mut row_index);

    let mut counts = vec![0u32; xres * yres];
    let ticker = RowTicker::new(progress, yres);
    maybe_par_chunks_mut!(grid.data_mut(), xres)
        .zip(maybe_par_chunks_mut!(counts, xres))
        .enumerate()
        .for_each(|(i, (row, crow))| {
            if ticker.is_cancelled() {
                return;
            }
            for &(col, z) in &binned[row_index[i] as usize..row_index[i + 1] as usize] {
                row[col as usize] += z;
                crow[col as usize] += 1;
            }
            for (out, &count) in row.iter_mut().zip(crow.iter()) {
                if count > 0 {
                    *out /= count as f64;
                }
            }
            ticker.row_done();
        });

    ticker.finish()?;

    if let Some(mask) = mask {
        let mdata = mask.data_mut();
        for (flag, &count) in mdata.iter_mut().zip(counts.iter()) {
            *flag = if count == 0 { 1.0 } else { 0.0 };
        }
    }
    Ok(())
}
