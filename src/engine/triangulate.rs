//! Delaunay triangulation and the triangulated fill pass.
//!
//! The triangulation itself is delegated to `delaunator`; this module owns
//! the snapshot of the extended point set, pixel location by an edge walk,
//! and the per-triangle weighting rules for the triangulated interpolation
//! methods. A built triangulation is cached by the session and reused for
//! repeated renders as long as the border extension does not change.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use delaunator::EMPTY;
use glam::DVec2;
use tracing::debug;

use super::RowTicker;
use crate::grid::RasterGrid;
use crate::progress::Progress;
use crate::types::Point3;
use crate::{Interpolation, RasterError};

#[inline]
fn next_halfedge(e: usize) -> usize {
    if e % 3 == 2 {
        e - 2
    } else {
        e + 1
    }
}

/// Where a query point landed.
enum Location {
    /// Inside triangle `t`.
    Inside(usize),
    /// Outside the convex hull, exiting across halfedge `e`.
    Outside(usize),
}

/// A Delaunay triangulation over one extended point set.
pub(crate) struct Triangulation {
    verts: Vec<Point3>,
    triangles: Vec<usize>,
    halfedges: Vec<usize>,
    /// +1 when triangles are counter-clockwise in our coordinates, -1
    /// otherwise; fixes the sidedness tests of the walk.
    orient: f64,
}

impl Triangulation {
    /// Triangulate the given point set.
    ///
    /// Fails with [`RasterError::Unstable`] when no triangulation exists
    /// (fewer than three points, collinear input, floating-point
    /// breakdown). The construction is a single monolithic call, so
    /// cancellation is only observed at its boundaries.
    pub(crate) fn build(
        points: &[Point3],
        progress: &dyn Progress,
    ) -> Result<Self, RasterError> {
        if !progress.report(0.0) {
            return Err(RasterError::Cancelled);
        }
        if points.len() < 3 {
            return Err(RasterError::Unstable(format!(
                "cannot triangulate {} points",
                points.len()
            )));
        }

        let sites: Vec<delaunator::Point> = points
            .iter()
            .map(|p| delaunator::Point { x: p.x, y: p.y })
            .collect();
        let raw = delaunator::triangulate(&sites);
        if raw.triangles.is_empty() {
            return Err(RasterError::Unstable(
                "degenerate point set (collinear or coincident)".into(),
            ));
        }
        debug!(
            "triangulated {} points into {} triangles",
            points.len(),
            raw.triangles.len() / 3
        );

        let a = points[raw.triangles[0]].xy();
        let b = points[raw.triangles[1]].xy();
        let c = points[raw.triangles[2]].xy();
        let orient = if (b - a).perp_dot(c - a) < 0.0 { -1.0 } else { 1.0 };

        let tri = Self {
            verts: points.to_vec(),
            triangles: raw.triangles,
            halfedges: raw.halfedges,
            orient,
        };
        if !progress.report(1.0) {
            return Err(RasterError::Cancelled);
        }
        Ok(tri)
    }

    #[inline]
    fn num_triangles(&self) -> usize {
        self.triangles.len() / 3
    }

    #[inline]
    fn corner(&self, e: usize) -> DVec2 {
        self.verts[self.triangles[e]].xy()
    }

    /// Signed sidedness of `q` relative to the directed edge `e`,
    /// normalized so non-negative means "inside" for every triangle.
    #[inline]
    fn edge_side(&self, e: usize, q: DVec2) -> f64 {
        let a = self.corner(e);
        let b = self.corner(next_halfedge(e));
        self.orient * (b - a).perp_dot(q - a)
    }

    /// Walk from triangle `start` toward the query point, crossing the
    /// edge the point lies beyond until a containing triangle (or a hull
    /// exit) is found.
    fn locate(&self, q: DVec2, start: usize) -> Location {
        let ntri = self.num_triangles();
        let mut t = start.min(ntri - 1);
        // A straight walk visits each triangle at most once; the cap only
        // guards against cycling on exactly-degenerate sidedness ties.
        let max_steps = 2 * ntri + 8;

        'walk: for _ in 0..max_steps {
            for k in 0..3 {
                let e = 3 * t + k;
                if self.edge_side(e, q) < 0.0 {
                    let opposite = self.halfedges[e];
                    if opposite == EMPTY {
                        return Location::Outside(e);
                    }
                    t = opposite / 3;
                    continue 'walk;
                }
            }
            return Location::Inside(t);
        }

        // Tie cycling; fall back to an exhaustive containment scan.
        for t in 0..ntri {
            if (0..3).all(|k| self.edge_side(3 * t + k, q) >= 0.0) {
                return Location::Inside(t);
            }
        }
        // Outside the hull with an inconclusive walk: clamp to the
        // nearest hull edge.
        let mut best = (f64::INFINITY, 0);
        for (e, &opposite) in self.halfedges.iter().enumerate() {
            if opposite != EMPTY {
                continue;
            }
            let d = dist2_to_segment(self.corner(e), self.corner(next_halfedge(e)), q);
            if d < best.0 {
                best = (d, e);
            }
        }
        Location::Outside(best.1)
    }

    /// Interpolated value at `q`, plus the triangle to seed the next
    /// lookup from.
    fn value_at(&self, q: DVec2, start: usize, method: Interpolation) -> (f64, usize) {
        match self.locate(q, start) {
            Location::Inside(t) => {
                let pa = self.verts[self.triangles[3 * t]];
                let pb = self.verts[self.triangles[3 * t + 1]];
                let pc = self.verts[self.triangles[3 * t + 2]];
                (triangle_value(pa, pb, pc, q, method), t)
            }
            Location::Outside(e) => {
                let pa = self.verts[self.triangles[e]];
                let pb = self.verts[self.triangles[next_halfedge(e)]];
                (edge_value(pa, pb, q, method), e / 3)
            }
        }
    }

    /// Fill the grid at pixel centers from the triangulation, row-parallel.
    pub(crate) fn fill_grid(
        &self,
        method: Interpolation,
        grid: &mut RasterGrid,
        progress: &dyn Progress,
    ) -> Result<(), RasterError> {
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
                let mut seed = 0usize;
                for (j, out) in row.iter_mut().enumerate() {
                    let q = DVec2::new(xoff + dx * (j as f64 + 0.5), y);
                    let (value, t) = self.value_at(q, seed, method);
                    seed = t;
                    *out = value;
                }
                ticker.row_done();
            });

        ticker.finish()
    }
}

/// Per-triangle weighting rules for the triangulated methods.
fn triangle_value(pa: Point3, pb: Point3, pc: Point3, q: DVec2, method: Interpolation) -> f64 {
    match method {
        Interpolation::Round => {
            let da = pa.xy().distance_squared(q);
            let db = pb.xy().distance_squared(q);
            let dc = pc.xy().distance_squared(q);
            if da <= db && da <= dc {
                pa.z
            } else if db <= dc {
                pb.z
            } else {
                pc.z
            }
        }
        Interpolation::Linear => {
            let a = pa.xy();
            let b = pb.xy();
            let c = pc.xy();
            let d = (b - a).perp_dot(c - a);
            if d == 0.0 {
                return triangle_value(pa, pb, pc, q, Interpolation::Round);
            }
            let wa = (b - q).perp_dot(c - q) / d;
            let wb = (c - q).perp_dot(a - q) / d;
            let wc = (a - q).perp_dot(b - q) / d;
            wa * pa.z + wb * pb.z + wc * pc.z
        }
        Interpolation::NaturalNeighbor => {
            let mut w = 0.0;
            let mut s = 0.0;
            for p in [pa, pb, pc] {
                let d2 = p.xy().distance_squared(q);
                if d2 == 0.0 {
                    return p.z;
                }
                let wi = 1.0 / d2;
                w += wi;
                s += wi * p.z;
            }
            s / w
        }
        Interpolation::Field | Interpolation::Average => {
            unreachable!("non-triangulated method in triangulated fill")
        }
    }
}

/// Value for a pixel outside the hull: clamp onto the exit edge.
fn edge_value(pa: Point3, pb: Point3, q: DVec2, method: Interpolation) -> f64 {
    let a = pa.xy();
    let b = pb.xy();
    let len2 = a.distance_squared(b);
    let t = if len2 == 0.0 {
        0.0
    } else {
        ((q - a).dot(b - a) / len2).clamp(0.0, 1.0)
    };
    match method {
        Interpolation::Round => {
            if t < 0.5 {
                pa.z
            } else {
                pb.z
            }
        }
        _ => pa.z + t * (pb.z - pa.z),
    }
}

fn dist2_to_segment(a: DVec2, b: DVec2, q: DVec2) -> f64 {
    let len2 = a.distance_squared(b);
    if len2 == 0.0 {
        return a.distance_squared(q);
    }
    let t = ((q - a).dot(b - a) / len2).clamp(0.0, 1.0);
    (a + t * (b - a)).distance_squared(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;

    fn square_points() -> Vec<Point3> {
        // z = x + 2y, linear over the square.
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(0.0, 2.0, 4.0),
            Point3::new(2.0, 2.0, 6.0),
            Point3::new(1.0, 1.0, 3.0),
        ]
    }

    #[test]
    fn build_rejects_degenerate_input() {
        let too_few = [Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 1.0)];
        assert!(matches!(
            Triangulation::build(&too_few, &NoProgress),
            Err(RasterError::Unstable(_))
        ));

        let collinear: Vec<Point3> = (0..5)
            .map(|i| Point3::new(i as f64, i as f64, 0.0))
            .collect();
        assert!(matches!(
            Triangulation::build(&collinear, &NoProgress),
            Err(RasterError::Unstable(_))
        ));
    }

    #[test]
    fn linear_reproduces_plane() {
        let tri = Triangulation::build(&square_points(), &NoProgress).expect("build");
        for &(x, y) in &[(0.5, 0.5), (1.3, 0.2), (0.1, 1.9), (1.0, 1.0)] {
            let (v, _) = tri.value_at(DVec2::new(x, y), 0, Interpolation::Linear);
            assert!(
                (v - (x + 2.0 * y)).abs() < 1e-12,
                "plane not reproduced at ({}, {}): {}",
                x,
                y,
                v
            );
        }
    }

    #[test]
    fn round_picks_nearest_corner() {
        let tri = Triangulation::build(&square_points(), &NoProgress).expect("build");
        let (v, _) = tri.value_at(DVec2::new(0.1, 0.1), 0, Interpolation::Round);
        assert_eq!(v, 0.0);
        let (v, _) = tri.value_at(DVec2::new(1.9, 1.9), 0, Interpolation::Round);
        assert_eq!(v, 6.0);
    }

    #[test]
    fn natural_neighbor_exact_hit() {
        let tri = Triangulation::build(&square_points(), &NoProgress).expect("build");
        let (v, _) = tri.value_at(DVec2::new(1.0, 1.0), 0, Interpolation::NaturalNeighbor);
        assert_eq!(v, 3.0);
    }

    #[test]
    fn exterior_clamps_to_hull() {
        let tri = Triangulation::build(&square_points(), &NoProgress).expect("build");
        // Far left of the square: value must come from the left edge.
        let (v, _) = tri.value_at(DVec2::new(-5.0, 1.0), 0, Interpolation::Linear);
        assert!((v - 2.0).abs() < 1e-12, "left edge midpoint is 2, got {}", v);
        // Far corner.
        let (v, _) = tri.value_at(DVec2::new(-5.0, -5.0), 0, Interpolation::Linear);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn fill_grid_matches_plane() {
        let tri = Triangulation::build(&square_points(), &NoProgress).expect("build");
        let mut grid = RasterGrid::new(8, 8, 2.0, 2.0);
        tri.fill_grid(Interpolation::Linear, &mut grid, &NoProgress)
            .expect("fill");
        for row in 0..8 {
            for col in 0..8 {
                let (x, y) = grid.pixel_center(col, row);
                let expected = x + 2.0 * y;
                let got = grid.get(col, row).expect("in bounds");
                assert!(
                    (got - expected).abs() < 1e-12,
                    "pixel ({}, {}): {} != {}",
                    col,
                    row,
                    got,
                    expected
                );
            }
        }
    }
}
