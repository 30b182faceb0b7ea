//! Point-set analysis: spatial binning and deduplication.
//!
//! Near-coincident samples are merged before rasterization so the
//! triangulation never sees two points closer than `epsrel · step`, where
//! `step` is the side of an equivalent-area cell for one point. Closeness
//! is transitive: if A is close to B and B to C, all three merge even when
//! A and C are further apart than the tolerance. Each merged group
//! collapses to the arithmetic mean of its members.

use tracing::debug;

use super::{index_accumulate, index_rewind, CELL_SIDE};
use crate::types::{Point3, XyRange};

/// Result of analysing a raw sample set.
pub(crate) struct AnalysedPoints {
    /// Deduplicated base points, ordered by grid cell.
    pub points: Vec<Point3>,
    /// Side of the virtual grid cell used for binning; also the length
    /// scale for the coincidence tolerance and border extension.
    pub step: f64,
    /// Measured bounding box of the raw input.
    pub bbox: XyRange,
    /// Number of raw input points.
    pub noriginal: usize,
}

/// Pick the virtual grid geometry: roughly one point per cell, scaled by
/// [`CELL_SIDE`], with the squarer axis fixing the common step.
fn virtual_grid(npoints: usize, bbox: &XyRange) -> (f64, usize, usize) {
    let nsqrt = (npoints.max(1) as f64).sqrt();
    let xreal = bbox.width();
    let yreal = bbox.height();

    if xreal > 0.0 && yreal > 0.0 {
        let xr = xreal / nsqrt * CELL_SIDE;
        let yr = yreal / nsqrt * CELL_SIDE;
        if xr <= yr {
            let xres = (xreal / xr).ceil() as usize;
            let step = xreal / xres as f64;
            let yres = (yreal / step).ceil() as usize;
            (step, xres, yres.max(1))
        } else {
            let yres = (yreal / yr).ceil() as usize;
            let step = yreal / yres as f64;
            let xres = (xreal / step).ceil() as usize;
            (step, xres.max(1), yres)
        }
    } else if xreal > 0.0 {
        // Degenerate in y: a single row of cells along x.
        let xres = ((xreal / (xreal / nsqrt * CELL_SIDE)).ceil() as usize).max(1);
        (xreal / xres as f64, xres, 1)
    } else if yreal > 0.0 {
        let yres = ((yreal / (yreal / nsqrt * CELL_SIDE)).ceil() as usize).max(1);
        (yreal / yres as f64, 1, yres)
    } else {
        // All points laterally coincident; any positive step works since
        // every pairwise distance is zero.
        (1.0, 1, 1)
    }
}

#[inline]
fn coords_to_grid_index(xres: usize, yres: usize, step: f64, x: f64, y: f64) -> usize {
    let ix = ((x / step).floor() as usize).min(xres - 1);
    let iy = ((y / step).floor() as usize).min(yres - 1);
    iy * xres + ix
}

#[inline]
fn ensure_cell(cellqueue: &mut Vec<u32>, cell: u32) {
    if !cellqueue.contains(&cell) {
        cellqueue.push(cell);
    }
}

/// Confirm the tentative point at `queue[ii]` if it is within tolerance of
/// any already-confirmed group member; confirmed points are swapped into
/// the `[0, pos)` prefix.
#[inline]
fn maybe_add_point(
    queue: &mut [u32],
    pos: &mut usize,
    ii: usize,
    cellpts: &[Point3],
    eps2: f64,
) -> bool {
    let pt = cellpts[queue[ii] as usize];
    for k in 0..*pos {
        if pt.dist2_xy(cellpts[queue[k] as usize]) < eps2 {
            queue.swap(ii, *pos);
            *pos += 1;
            return true;
        }
    }
    false
}

/// Calculate coordinate ranges and merge groups of transitively-close
/// points into mean representatives.
///
/// With `epsrel = 0` nothing merges, exact coordinate collisions included:
/// the group test is a strict comparison against `eps²`.
pub(crate) fn analyse_points(points: &[Point3], epsrel: f64) -> AnalysedPoints {
    let npoints = points.len();
    let bbox = XyRange::from_points(points);
    let (step, xres, yres) = virtual_grid(npoints, &bbox);

    if npoints < 2 {
        return AnalysedPoints {
            points: points.to_vec(),
            step,
            bbox,
            noriginal: npoints,
        };
    }

    let eps = epsrel * step;
    let eps2 = eps * eps;
    // Boundary-proximity tests run on cell-fraction coordinates, where the
    // tolerance is epsrel itself.
    let eps_frac = epsrel;

    // Bin points by cell with a counting sort.
    let ncells = xres * yres;
    let mut cell_index = vec![0u32; ncells + 1];
    for pt in points {
        let ig = coords_to_grid_index(xres, yres, step, pt.x - bbox.xmin, pt.y - bbox.ymin);
        cell_index[ig] += 1;
    }
    index_accumulate(&mut cell_index);
    index_rewind(&mut cell_index);

    let mut cellpts = vec![Point3::new(0.0, 0.0, 0.0); npoints];
    for pt in points {
        let ig = coords_to_grid_index(xres, yres, step, pt.x - bbox.xmin, pt.y - bbox.ymin);
        cellpts[cell_index[ig] as usize] = *pt;
        cell_index[ig] += 1;
    }
    index_rewind(&mut cell_index);

    // Grow merge groups iteratively until they stop changing. The point
    // queue keeps confirmed members in its `[0, pos)` prefix; the cell
    // queue keeps cells whose points were already pulled as tentative.
    let mut consumed = vec![false; npoints];
    let mut out = Vec::with_capacity(npoints);
    let mut pointqueue: Vec<u32> = Vec::new();
    let mut cellqueue: Vec<u32> = Vec::new();

    for i in 0..npoints {
        if consumed[i] {
            continue;
        }

        pointqueue.clear();
        cellqueue.clear();
        pointqueue.push(i as u32);
        let mut pos = 1usize;
        let mut oldpos = 0usize;
        let mut cell_pos = 0usize;

        loop {
            // Queue the cell of each newly confirmed member, plus any of
            // its 8 neighbors it sits within tolerance of.
            while oldpos < pos {
                let pt = cellpts[pointqueue[oldpos] as usize];
                let fx = (pt.x - bbox.xmin) / step;
                let ix = fx.floor() as usize;
                let x = fx - ix as f64;
                let fy = (pt.y - bbox.ymin) / step;
                let iy = fy.floor() as usize;
                let y = fy - iy as f64;

                let lo_x = ix > 0 && x <= eps_frac;
                let hi_x = ix + 1 < xres && 1.0 - x <= eps_frac;
                let lo_y = iy > 0 && y <= eps_frac;
                let hi_y = iy + 1 < yres && 1.0 - y <= eps_frac;

                if ix < xres && iy < yres {
                    ensure_cell(&mut cellqueue, (iy * xres + ix) as u32);
                }
                if lo_x && iy < yres {
                    ensure_cell(&mut cellqueue, (iy * xres + ix - 1) as u32);
                }
                if hi_x && iy < yres {
                    ensure_cell(&mut cellqueue, (iy * xres + ix + 1) as u32);
                }
                if lo_y && ix < xres {
                    ensure_cell(&mut cellqueue, ((iy - 1) * xres + ix) as u32);
                }
                if hi_y && ix < xres {
                    ensure_cell(&mut cellqueue, ((iy + 1) * xres + ix) as u32);
                }
                if lo_x && lo_y {
                    ensure_cell(&mut cellqueue, ((iy - 1) * xres + ix - 1) as u32);
                }
                if hi_x && lo_y {
                    ensure_cell(&mut cellqueue, ((iy - 1) * xres + ix + 1) as u32);
                }
                if lo_x && hi_y {
                    ensure_cell(&mut cellqueue, ((iy + 1) * xres + ix - 1) as u32);
                }
                if hi_x && hi_y {
                    ensure_cell(&mut cellqueue, ((iy + 1) * xres + ix + 1) as u32);
                }

                oldpos += 1;
            }

            // Pull unconsumed points from newly queued cells as tentative
            // candidates.
            while cell_pos < cellqueue.len() {
                let c = cellqueue[cell_pos] as usize;
                for id in cell_index[c] as usize..cell_index[c + 1] as usize {
                    if id != i && !consumed[id] {
                        pointqueue.push(id as u32);
                    }
                }
                cell_pos += 1;
            }

            // Compare tentative candidates against confirmed members.
            let mut ii = pos;
            while ii < pointqueue.len() {
                maybe_add_point(&mut pointqueue, &mut pos, ii, &cellpts, eps2);
                ii += 1;
            }

            if oldpos == pos {
                break;
            }
        }

        // Collapse the confirmed group to its mean; leftover tentative
        // candidates stay unconsumed and seed their own groups later.
        let mut avg = Point3::new(0.0, 0.0, 0.0);
        for &id in &pointqueue[..pos] {
            let p = cellpts[id as usize];
            avg.x += p.x;
            avg.y += p.y;
            avg.z += p.z;
            consumed[id as usize] = true;
        }
        let k = pos as f64;
        out.push(Point3::new(avg.x / k, avg.y / k, avg.z / k));
    }

    debug!(
        "analysed {} points into {} representatives (step {})",
        npoints,
        out.len(),
        step
    );

    AnalysedPoints {
        points: out,
        step,
        bbox,
        noriginal: npoints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_single() {
        let a = analyse_points(&[], 1e-8);
        assert!(a.points.is_empty());
        assert_eq!(a.noriginal, 0);

        let p = Point3::new(0.5, 0.25, 3.0);
        let a = analyse_points(&[p], 1e-8);
        assert_eq!(a.points, vec![p]);
    }

    #[test]
    fn zero_tolerance_keeps_exact_duplicates() {
        let points = vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(1.0, 1.0, 3.0),
        ];
        let a = analyse_points(&points, 0.0);
        assert_eq!(a.points.len(), 3);
    }

    #[test]
    fn close_pair_merges_to_midpoint() {
        // Anchors fix the extent; the pair sits well inside one cell.
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.5, 0.5, 10.0),
            Point3::new(0.5 + 1e-6, 0.5, 20.0),
        ];
        let a = analyse_points(&points, 1e-4);
        assert_eq!(a.points.len(), 3);
        let rep = a
            .points
            .iter()
            .find(|p| (p.x - 0.5).abs() < 1e-3)
            .expect("merged representative present");
        assert!((rep.x - (0.5 + 5e-7)).abs() < 1e-12);
        assert_eq!(rep.y, 0.5);
        assert_eq!(rep.z, 15.0);
    }

    #[test]
    fn laterally_coincident_points_collapse() {
        let points = vec![
            Point3::new(2.0, 3.0, 1.0),
            Point3::new(2.0, 3.0, 2.0),
            Point3::new(2.0, 3.0, 6.0),
        ];
        let a = analyse_points(&points, 1e-8);
        assert_eq!(a.points.len(), 1);
        assert_eq!(a.points[0], Point3::new(2.0, 3.0, 3.0));
    }

    #[test]
    fn merge_spans_cell_boundary() {
        // Two points within tolerance but in adjacent grid cells.
        let mut points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(4.0, 4.0, 0.0),
            Point3::new(0.0, 4.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        ];
        let a0 = analyse_points(&points, 1e-3);
        let step = a0.step;
        points.push(Point3::new(step - 1e-9, 2.0, 5.0));
        points.push(Point3::new(step + 1e-9, 2.0, 7.0));
        let a = analyse_points(&points, 1e-3);
        assert_eq!(a.points.len(), 5);
        let rep = a
            .points
            .iter()
            .find(|p| (p.y - 2.0).abs() < 1e-9)
            .expect("merged representative present");
        assert_eq!(rep.z, 6.0);
    }
}
