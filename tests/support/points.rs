#![allow(dead_code)]

use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use xyz_raster::Point3;

/// Random samples over the unit square with a smooth height field.
pub fn random_surface_points(n: usize, seed: u64) -> Vec<Point3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let x: f64 = rng.gen_range(0.0..1.0);
            let y: f64 = rng.gen_range(0.0..1.0);
            let z = (5.0 * x).sin() + (3.0 * y).cos();
            Point3::new(x, y, z)
        })
        .collect()
}

/// A complete lattice of samples, in shuffled order.
///
/// Sites sit at `origin + index * step` per axis; z-values are a ramp so
/// each site has a distinct, position-derived value.
pub fn shuffled_lattice_points(
    xres: usize,
    yres: usize,
    x0: f64,
    y0: f64,
    dx: f64,
    dy: f64,
    seed: u64,
) -> Vec<Point3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(xres * yres);
    for iy in 0..yres {
        for ix in 0..xres {
            points.push(Point3::new(
                x0 + ix as f64 * dx,
                y0 + iy as f64 * dy,
                (iy * xres + ix) as f64 * 0.5 - 3.0,
            ));
        }
    }
    points.shuffle(&mut rng);
    points
}

/// Tight clusters of samples around the given centers.
///
/// Each cluster contributes `per_cluster` points spread laterally by at
/// most `spread`, with z equal to the center z plus a symmetric offset so
/// the cluster mean z equals the center z.
pub fn clustered_points(
    centers: &[(f64, f64, f64)],
    spread: f64,
    per_cluster: usize,
    seed: u64,
) -> Vec<Point3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut points = Vec::with_capacity(centers.len() * per_cluster);
    for &(cx, cy, cz) in centers {
        let mut offsets: Vec<(f64, f64)> = (0..per_cluster)
            .map(|_| {
                (
                    rng.gen_range(-spread..spread),
                    rng.gen_range(-spread..spread),
                )
            })
            .collect();
        // Recentre so the cluster mean is exactly the center.
        let mx = offsets.iter().map(|o| o.0).sum::<f64>() / per_cluster as f64;
        let my = offsets.iter().map(|o| o.1).sum::<f64>() / per_cluster as f64;
        for o in &mut offsets {
            o.0 -= mx;
            o.1 -= my;
        }
        for (k, &(ox, oy)) in offsets.iter().enumerate() {
            let dz = if per_cluster > 1 {
                (k as f64 - (per_cluster - 1) as f64 / 2.0) * 0.01
            } else {
                0.0
            };
            points.push(Point3::new(cx + ox, cy + oy, cz + dz));
        }
    }
    points
}

/// Shuffle a point list deterministically.
pub fn shuffled(mut points: Vec<Point3>, seed: u64) -> Vec<Point3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    points.shuffle(&mut rng);
    points
}
