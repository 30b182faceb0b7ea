//! Rasterization sessions: pipeline orchestration and caches.
//!
//! A session analyses the point cloud once, then serves any number of
//! renders with varying resolution, region, exterior policy and method.
//! The border extension and the triangulation are cached between renders;
//! the triangulation is rebuilt only when the extension actually changed.

use tracing::debug;

use super::analyse::analyse_points;
use super::extend::PointStore;
use super::field::{average_cells, interpolate_field};
use super::regular::check_regular_grid;
use super::triangulate::Triangulation;
use super::{EPSREL, TRIANGULATION_WEIGHT};
use crate::grid::RasterGrid;
use crate::progress::{PhaseProgress, Progress};
use crate::types::{Point3, Point3Like, XyRange};
use crate::{Interpolation, PointStats, RasterConfig, RasterError, RasterOutput};

/// A reusable rasterization session over one point cloud.
pub struct RasterSession {
    store: PointStore,
    triangulation: Option<Triangulation>,
    regular: Option<RasterGrid>,
    epsrel: f64,
}

impl RasterSession {
    /// Analyse a point cloud with the default coincidence tolerance.
    pub fn new<P: Point3Like>(points: &[P]) -> Self {
        Self::with_epsrel(points, EPSREL)
    }

    /// Analyse a point cloud with an explicit relative coincidence
    /// tolerance (a fraction of the dedup cell side).
    pub fn with_epsrel<P: Point3Like>(points: &[P], epsrel: f64) -> Self {
        let points: Vec<Point3> = points.iter().map(Point3::from_like).collect();
        let regular = check_regular_grid(&points);
        let store = PointStore::from_analysed(analyse_points(&points, epsrel));
        Self {
            store,
            triangulation: None,
            regular,
            epsrel,
        }
    }

    /// Number of raw input points.
    pub fn num_original_points(&self) -> usize {
        self.store.num_original()
    }

    /// Number of points after merging near-coincident ones.
    pub fn num_base_points(&self) -> usize {
        self.store.num_base()
    }

    /// Deduplicated base points.
    pub fn base_points(&self) -> &[Point3] {
        self.store.base()
    }

    /// Synthesized border points from the most recent render.
    pub fn extension_points(&self) -> &[Point3] {
        self.store.extension()
    }

    /// Measured bounding box of the input.
    pub fn measured_range(&self) -> XyRange {
        self.store.bbox()
    }

    /// The input rendered directly, if its lateral positions form a
    /// complete regular lattice. Computed once at session construction.
    pub fn regular_grid(&self) -> Option<&RasterGrid> {
        self.regular.as_ref()
    }

    /// Point bookkeeping for the current session state.
    pub fn stats(&self) -> PointStats {
        PointStats {
            original: self.store.num_original(),
            merged: self.store.num_original() - self.store.num_base(),
            extension: self.store.extension().len(),
        }
    }

    /// Rasterize the point cloud onto the configured target grid.
    ///
    /// The phases run strictly in sequence: border extension,
    /// triangulation (when the method needs one and the cache is stale),
    /// then the fill pass. Any failure or cancellation drops the cached
    /// triangulation and leaves no partial output.
    pub fn rasterize(
        &mut self,
        config: &RasterConfig,
        progress: &dyn Progress,
    ) -> Result<RasterOutput, RasterError> {
        config.validate()?;
        let result = self.do_rasterize(config, progress);
        if result.is_err() {
            self.triangulation = None;
        }
        result
    }

    fn do_rasterize(
        &mut self,
        config: &RasterConfig,
        progress: &dyn Progress,
    ) -> Result<RasterOutput, RasterError> {
        let mut raster = RasterGrid::new(
            config.xres,
            config.yres,
            config.region.width(),
            config.region.height(),
        )
        .with_offset(config.region.xmin, config.region.ymin);

        let changed = self.store.extend_borders(config, true, self.epsrel);
        if changed {
            debug!("border extension changed, invalidating triangulation");
            self.triangulation = None;
        }

        let mut mask = None;
        match config.interpolation {
            Interpolation::Field => {
                interpolate_field(self.store.extended(), &mut raster, progress)?;
            }
            Interpolation::Average => {
                let mut m = config.mask_empty.then(|| RasterGrid::new_alike(&raster));
                average_cells(self.store.extended(), &mut raster, m.as_mut(), progress)?;
                mask = m;
            }
            method => {
                let (tri, fill_start) = match self.triangulation.take() {
                    Some(tri) => {
                        debug!("extension unchanged, reusing cached triangulation");
                        (tri, 0.0)
                    }
                    None => {
                        let build_progress =
                            PhaseProgress::new(progress, 0.0, TRIANGULATION_WEIGHT);
                        let tri = Triangulation::build(self.store.extended(), &build_progress)?;
                        (tri, TRIANGULATION_WEIGHT)
                    }
                };
                let fill_progress = PhaseProgress::new(progress, fill_start, 1.0);
                tri.fill_grid(method, &mut raster, &fill_progress)?;
                self.triangulation = Some(tri);
            }
        }

        Ok(RasterOutput {
            raster,
            mask,
            stats: self.stats(),
        })
    }
}
