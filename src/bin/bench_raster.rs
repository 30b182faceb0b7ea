//! Benchmark xyz-raster at various scales.
//!
//! Run with: cargo run --release --bin bench_raster
//!
//! Usage:
//!   bench_raster                  Default size (100k points, 512 px)
//!   bench_raster -n 250k -r 1024  Custom point count and resolution
//!   bench_raster -m field         Benchmark a single method

use clap::Parser;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Instant;

use xyz_raster::{
    Exterior, Interpolation, NoProgress, Point3, RasterConfig, RasterSession, XyRange,
};

fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.to_lowercase();
    let (num_str, multiplier) = if s.ends_with('m') {
        (&s[..s.len() - 1], 1_000_000)
    } else if s.ends_with('k') {
        (&s[..s.len() - 1], 1_000)
    } else {
        (s.as_str(), 1)
    };

    num_str
        .parse::<f64>()
        .map(|n| (n * multiplier as f64) as usize)
        .map_err(|e| format!("Invalid number '{}': {}", s, e))
}

fn parse_method(s: &str) -> Result<Interpolation, String> {
    match s {
        "round" => Ok(Interpolation::Round),
        "linear" => Ok(Interpolation::Linear),
        "nna" => Ok(Interpolation::NaturalNeighbor),
        "field" => Ok(Interpolation::Field),
        "average" => Ok(Interpolation::Average),
        other => Err(format!(
            "unknown method '{}' (round|linear|nna|field|average)",
            other
        )),
    }
}

#[derive(Parser)]
#[command(about = "Benchmark scattered-point rasterization")]
struct Args {
    /// Number of points (supports k/m suffixes).
    #[arg(short = 'n', long, default_value = "100k", value_parser = parse_count)]
    points: usize,

    /// Output resolution (square grid).
    #[arg(short, long, default_value_t = 512)]
    res: usize,

    /// Single method to benchmark; default runs all but the O(n·pixels)
    /// field method.
    #[arg(short, long, value_parser = parse_method)]
    method: Option<Interpolation>,

    /// Renders per method (the second one exercises the triangulation
    /// cache).
    #[arg(short, long, default_value_t = 3)]
    iters: usize,

    #[arg(long, default_value_t = 12345)]
    seed: u64,
}

/// Random surface samples over the unit square with a smooth height field.
fn random_surface(n: usize, seed: u64) -> Vec<Point3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let x: f64 = rng.gen_range(0.0..1.0);
            let y: f64 = rng.gen_range(0.0..1.0);
            let z = (6.0 * x).sin() * (4.0 * y).cos() + 0.02 * rng.gen_range(-1.0..1.0);
            Point3::new(x, y, z)
        })
        .collect()
}

fn method_name(method: Interpolation) -> &'static str {
    match method {
        Interpolation::Round => "round",
        Interpolation::Linear => "linear",
        Interpolation::NaturalNeighbor => "nna",
        Interpolation::Field => "field",
        Interpolation::Average => "average",
    }
}

fn main() {
    let args = Args::parse();

    println!(
        "generating {} points, target {}x{}",
        args.points, args.res, args.res
    );
    let points = random_surface(args.points, args.seed);

    let t = Instant::now();
    let mut session = RasterSession::new(&points);
    println!(
        "analysis: {:.1} ms ({} -> {} points)",
        t.elapsed().as_secs_f64() * 1e3,
        session.num_original_points(),
        session.num_base_points()
    );

    let methods: Vec<Interpolation> = match args.method {
        Some(m) => vec![m],
        None => vec![
            Interpolation::Round,
            Interpolation::Linear,
            Interpolation::NaturalNeighbor,
            Interpolation::Average,
        ],
    };

    let config = RasterConfig::new(
        args.res,
        args.res,
        XyRange::new(0.0, 1.0, 0.0, 1.0),
    )
    .with_exterior(Exterior::Mirror);

    for method in methods {
        let config = config.clone().with_interpolation(method);
        for iter in 0..args.iters.max(1) {
            let t = Instant::now();
            match session.rasterize(&config, &NoProgress) {
                Ok(output) => {
                    println!(
                        "{:8} iter {}: {:8.1} ms  ({} extension points)",
                        method_name(method),
                        iter,
                        t.elapsed().as_secs_f64() * 1e3,
                        output.stats.extension
                    );
                }
                Err(err) => {
                    println!("{:8} iter {}: failed: {}", method_name(method), iter, err);
                    break;
                }
            }
        }
    }
}
