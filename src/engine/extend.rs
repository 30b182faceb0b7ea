//! Border extension for exterior policies.
//!
//! Exterior policies describe the data beyond the measured extent: `Border`
//! leaves it to the triangulation, `Mirror` reflects samples across the
//! measured edges and `Periodic` tiles them. Synthesized points inherit z
//! from their source; they are appended after the base set so the
//! deduplicated prefix stays intact, and they are nudged a tolerance off
//! the measured seam so the triangulation never sees a point pair across
//! an edge at identical coordinates.

use tracing::debug;

use super::analyse::AnalysedPoints;
use crate::types::{Point3, XyRange};
use crate::{Exterior, RasterConfig};

/// The session's point storage: deduplicated base points followed by the
/// current border extension.
pub(crate) struct PointStore {
    points: Vec<Point3>,
    nbase: usize,
    step: f64,
    bbox: XyRange,
    noriginal: usize,
}

impl PointStore {
    pub(crate) fn from_analysed(analysed: AnalysedPoints) -> Self {
        let nbase = analysed.points.len();
        Self {
            points: analysed.points,
            nbase,
            step: analysed.step,
            bbox: analysed.bbox,
            noriginal: analysed.noriginal,
        }
    }

    /// Base points plus the current extension.
    #[inline]
    pub(crate) fn extended(&self) -> &[Point3] {
        &self.points
    }

    /// Deduplicated base points only.
    #[inline]
    pub(crate) fn base(&self) -> &[Point3] {
        &self.points[..self.nbase]
    }

    /// Synthesized border points from the most recent extension.
    #[inline]
    pub(crate) fn extension(&self) -> &[Point3] {
        &self.points[self.nbase..]
    }

    #[inline]
    pub(crate) fn num_original(&self) -> usize {
        self.noriginal
    }

    #[inline]
    pub(crate) fn num_base(&self) -> usize {
        self.nbase
    }

    #[inline]
    pub(crate) fn bbox(&self) -> XyRange {
        self.bbox
    }

    /// Rebuild the border extension for the given target region and
    /// exterior policy, discarding the previous one.
    ///
    /// Returns true if the extension differs from the previous call in
    /// count or ordered content; with `check_for_changes` unset the
    /// comparison is skipped and the extension always counts as changed.
    pub(crate) fn extend_borders(
        &mut self,
        config: &RasterConfig,
        check_for_changes: bool,
        epsrel: f64,
    ) -> bool {
        let nbase = self.nbase;
        let old_ext: Option<Vec<Point3>> =
            check_for_changes.then(|| self.points[nbase..].to_vec());
        self.points.truncate(nbase);

        if config.exterior == Exterior::Border {
            debug!("exterior is border, reducing points to base");
            return match old_ext {
                Some(old) => !old.is_empty(),
                None => true,
            };
        }

        let sxmin = self.bbox.xmin;
        let sxmax = self.bbox.xmax;
        let symin = self.bbox.ymin;
        let symax = self.bbox.ymax;
        let xreal = self.bbox.width();
        let yreal = self.bbox.height();

        // Candidates are kept only within two dedup steps of the target
        // region; anything further cannot influence the raster.
        let wxmin = config.region.xmin - 2.0 * self.step;
        let wxmax = config.region.xmax + 2.0 * self.step;
        let wymin = config.region.ymin - 2.0 * self.step;
        let wymax = config.region.ymax + 2.0 * self.step;
        let eps = epsrel * self.step;

        for i in 0..nbase {
            let pt = self.points[i];

            // Reflected/translated candidate coordinates toward each edge,
            // gated so at most one copy per edge (and per corner) exists.
            let (txl, txr, tyl, tyr, xlok, xrok, ylok, yrok) = match config.exterior {
                Exterior::Mirror => (
                    2.0 * sxmin - pt.x,
                    2.0 * sxmax - pt.x,
                    2.0 * symin - pt.y,
                    2.0 * symax - pt.y,
                    pt.x - sxmin < 0.5 * xreal,
                    sxmax - pt.x < 0.5 * xreal,
                    pt.y - symin < 0.5 * yreal,
                    symax - pt.y < 0.5 * yreal,
                ),
                Exterior::Periodic => (
                    pt.x - xreal,
                    pt.x + xreal,
                    pt.y - yreal,
                    pt.y + yreal,
                    sxmax - pt.x < 0.5 * xreal,
                    pt.x - sxmin < 0.5 * xreal,
                    symax - pt.y < 0.5 * yreal,
                    pt.y - symin < 0.5 * yreal,
                ),
                Exterior::Border => unreachable!(),
            };

            let xlok = xlok && txl >= wxmin && txl <= wxmax && (txl - sxmin).abs() > eps;
            let xrok = xrok && txr >= wxmin && txr <= wxmax && (txr - sxmax).abs() > eps;
            let ylok = ylok && tyl >= wymin && tyl <= wymax && (tyl - symin).abs() > eps;
            let yrok = yrok && tyr >= wymin && tyr <= wymax && (tyr - symax).abs() > eps;

            if xlok {
                self.points.push(Point3::new(txl, pt.y - eps, pt.z));
            }
            if xlok && ylok {
                self.points.push(Point3::new(txl + eps, tyl - eps, pt.z));
            }
            if ylok {
                self.points.push(Point3::new(pt.x + eps, tyl, pt.z));
            }
            if xrok && ylok {
                self.points.push(Point3::new(txr + eps, tyl + eps, pt.z));
            }
            if xrok {
                self.points.push(Point3::new(txr, pt.y + eps, pt.z));
            }
            if xrok && yrok {
                self.points.push(Point3::new(txr - eps, tyr + eps, pt.z));
            }
            if yrok {
                self.points.push(Point3::new(pt.x - eps, tyr, pt.z));
            }
            if xlok && yrok {
                self.points.push(Point3::new(txl - eps, tyr - eps, pt.z));
            }
        }
        debug!(
            "border extension has {} points",
            self.points.len() - nbase
        );

        match old_ext {
            None => true,
            Some(old) => old.as_slice() != &self.points[nbase..],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::analyse::analyse_points;
    use crate::Interpolation;

    fn store_for(points: &[Point3]) -> PointStore {
        PointStore::from_analysed(analyse_points(points, 1e-8))
    }

    fn unit_square_with(extra: &[Point3]) -> Vec<Point3> {
        let mut points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 2.0),
            Point3::new(1.0, 1.0, 3.0),
        ];
        points.extend_from_slice(extra);
        points
    }

    fn config(exterior: Exterior) -> RasterConfig {
        RasterConfig::new(4, 4, XyRange::new(0.0, 1.0, 0.0, 1.0))
            .with_interpolation(Interpolation::Linear)
            .with_exterior(exterior)
    }

    #[test]
    fn border_produces_no_extension() {
        let mut store = store_for(&unit_square_with(&[]));
        let changed = store.extend_borders(&config(Exterior::Border), true, 1e-8);
        assert!(!changed);
        assert!(store.extension().is_empty());
    }

    #[test]
    fn mirror_reflects_at_equal_distance() {
        let inner = Point3::new(0.2, 0.5, 7.0);
        let mut store = store_for(&unit_square_with(&[inner]));
        let eps = 1e-8 * store.step;
        store.extend_borders(&config(Exterior::Mirror), false, 1e-8);

        // A point 0.2 inside the left edge reflects 0.2 outside it.
        let reflected = store
            .extension()
            .iter()
            .find(|p| (p.x - (-0.2)).abs() < 1e-12)
            .expect("reflected point present");
        assert!((reflected.y - (inner.y - eps)).abs() < 1e-12);
        assert_eq!(reflected.z, inner.z);

        // The equidistant point does not reflect across the far edge.
        assert!(store.extension().iter().all(|p| p.x < 1.5));
    }

    #[test]
    fn mirror_seam_points_are_nudged_off() {
        // A base point exactly on the left edge must not produce a mirror
        // copy at its own coordinates.
        let on_edge = Point3::new(0.0, 0.4, 5.0);
        let mut store = store_for(&unit_square_with(&[on_edge]));
        store.extend_borders(&config(Exterior::Mirror), false, 1e-8);
        for p in store.extension() {
            assert!(
                store.base().iter().all(|b| b.dist2_xy(*p) > 0.0),
                "extension point coincides with a base point"
            );
        }
    }

    #[test]
    fn periodic_translates_by_measured_extent() {
        let inner = Point3::new(0.9, 0.5, 4.0);
        let mut store = store_for(&unit_square_with(&[inner]));
        store.extend_borders(&config(Exterior::Periodic), false, 1e-8);

        // A point in the right half appears translated one width left.
        let translated = store
            .extension()
            .iter()
            .find(|p| (p.x - (-0.1)).abs() < 1e-12)
            .expect("translated point present");
        assert_eq!(translated.z, inner.z);
    }

    #[test]
    fn repeat_extension_reports_unchanged() {
        let mut store = store_for(&unit_square_with(&[Point3::new(0.3, 0.4, 1.5)]));
        let cfg = config(Exterior::Mirror);
        let first = store.extend_borders(&cfg, true, 1e-8);
        assert!(first);
        assert!(!store.extension().is_empty());
        let second = store.extend_borders(&cfg, true, 1e-8);
        assert!(!second);
    }

    #[test]
    fn policy_change_reports_changed() {
        let mut store = store_for(&unit_square_with(&[Point3::new(0.3, 0.4, 1.5)]));
        store.extend_borders(&config(Exterior::Mirror), true, 1e-8);
        let changed = store.extend_borders(&config(Exterior::Periodic), true, 1e-8);
        assert!(changed);
        // Dropping back to Border counts as a change while an extension
        // exists, and is idempotent afterwards.
        assert!(store.extend_borders(&config(Exterior::Border), true, 1e-8));
        assert!(!store.extend_borders(&config(Exterior::Border), true, 1e-8));
    }
}
