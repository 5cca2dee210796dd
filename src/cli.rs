use crate::config::{parse_batch, parse_strategy, BatchSize, ScalerConfig, StrategyPreference};
use crate::logging::LogLevel;
use crate::scaler::{
    AcceleratedScaler, BlitGeometry, PixelDepth, PixelScaler, PortableScaler, ScaleFactors,
    Strategy,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::time::Instant;

/// blitscale - integer-ratio framebuffer scaler
#[derive(Parser, Debug)]
#[command(name = "blitscale")]
#[command(version)]
#[command(about = "Benchmark and verify the integer-ratio framebuffer scalers", long_about = None)]
pub struct Cli {
    /// Log verbosity (0 = nothing .. 6 = everything)
    #[arg(short, long, global = true, default_value_t = 3, value_name = "LEVEL")]
    pub verbosity: i32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Time repeated scaling of one frame size
    Bench(BenchArgs),
    /// Compare every strategy against the portable scaler
    Verify(VerifyArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Pixel depth in bits (16 or 32)
    #[arg(short, long, default_value = "32", value_parser = parse_depth)]
    pub depth: PixelDepth,

    /// Horizontal factor (1, 2 or 4)
    #[arg(short, long, default_value_t = 2)]
    pub x: u32,

    /// Vertical factor (1 to 4)
    #[arg(short, long, default_value_t = 2)]
    pub y: u32,

    /// Source width in pixels
    #[arg(long, default_value_t = 320)]
    pub width: u32,

    /// Source height in rows
    #[arg(long, default_value_t = 240)]
    pub height: u32,

    /// Frames to scale
    #[arg(short, long, default_value_t = 500)]
    pub frames: u32,

    /// Strategy (auto or portable); defaults to BLITSCALE_STRATEGY
    #[arg(short, long, value_parser = parse_strategy)]
    pub strategy: Option<StrategyPreference>,

    /// Accelerated batch size in pixels (16 or 32); defaults to BLITSCALE_BATCH
    #[arg(short, long, value_parser = parse_batch)]
    pub batch: Option<BatchSize>,

    /// Offset both buffers by this many bytes to exercise the fallback
    #[arg(long, default_value_t = 0)]
    pub misalign: usize,
}

#[derive(Args, Debug, Clone)]
pub struct VerifyArgs {
    /// Largest source width tried
    #[arg(long, default_value_t = 67)]
    pub max_width: usize,

    /// Largest source height tried
    #[arg(long, default_value_t = 3)]
    pub max_height: usize,
}

impl Default for VerifyArgs {
    fn default() -> Self {
        Self {
            max_width: 67,
            max_height: 3,
        }
    }
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::from_i32(self.verbosity)
    }
}

fn parse_depth(s: &str) -> Result<PixelDepth> {
    let bits: u32 = s.trim().parse().context("Depth must be a number")?;
    Ok(PixelDepth::from_bits(bits)?)
}

// ==============================================================================
// bench
// ==============================================================================

/// Timing for one benchmark run
#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub scaler: &'static str,
    pub frames: u32,
    pub bytes_per_frame: usize,
    pub seconds: f64,
}

impl BenchReport {
    pub fn ms_per_frame(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.seconds * 1000.0 / self.frames as f64
    }

    /// Destination throughput in MB/s
    pub fn megabytes_per_second(&self) -> f64 {
        if self.seconds <= 0.0 {
            return 0.0;
        }
        (self.bytes_per_frame as f64 * self.frames as f64) / self.seconds / 1_000_000.0
    }
}

impl std::fmt::Display for BenchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} frames, {:.3} ms/frame, {:.1} MB/s",
            self.scaler,
            self.frames,
            self.ms_per_frame(),
            self.megabytes_per_second()
        )
    }
}

/// Run the benchmark with `base` filling in options left unset
pub fn run_bench(args: &BenchArgs, base: ScalerConfig) -> Result<BenchReport> {
    let factors = ScaleFactors::try_from((args.x, args.y))?;
    let config = ScalerConfig {
        strategy: args.strategy.unwrap_or(base.strategy),
        batch: args.batch.unwrap_or(base.batch),
    };
    let geometry = BlitGeometry::for_factors(
        args.depth,
        factors,
        args.width as usize,
        args.height as usize,
        0,
        0,
    );
    let src_len = geometry
        .required_src_len()
        .context("Frame size overflows")?;
    let dst_len = geometry
        .required_dst_len()
        .context("Frame size overflows")?;
    geometry.validate(src_len, dst_len)?;

    let src_store: Vec<u8> = (0..src_len + args.misalign).map(|i| i as u8).collect();
    let mut dst_store = vec![0u8; dst_len + args.misalign];
    let src = &src_store[args.misalign..];
    let dst = &mut dst_store[args.misalign..];

    let scaler = Strategy::from_config(&config);
    log::info!(
        "bench {} {}-bit {}x{} with {} ({} px batch), misalign {}",
        factors,
        args.depth.bits(),
        args.width,
        args.height,
        scaler.name(),
        config.batch.pixels(),
        args.misalign
    );

    let start = Instant::now();
    for _ in 0..args.frames {
        scaler.scale(&geometry, std::hint::black_box(src), std::hint::black_box(&mut *dst));
    }
    let seconds = start.elapsed().as_secs_f64();

    Ok(BenchReport {
        scaler: scaler.name(),
        frames: args.frames,
        bytes_per_frame: dst_len,
        seconds,
    })
}

// ==============================================================================
// verify
// ==============================================================================

/// Outcome of a verification sweep
#[derive(Debug, Default, Clone)]
pub struct VerifyReport {
    /// Calls compared against the portable output
    pub cases: usize,
    /// One line per mismatching call
    pub mismatches: Vec<String>,
}

impl VerifyReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Sweep every depth and ratio over a range of sizes and alignments
///
/// The portable result is first checked against the replication law, then
/// each accelerated configuration, gated and ungated, must match it byte
/// for byte.
pub fn run_verify(args: &VerifyArgs) -> VerifyReport {
    let mut report = VerifyReport::default();
    let accelerated = [
        AcceleratedScaler::new(BatchSize::Pixels16),
        AcceleratedScaler::new(BatchSize::Pixels32),
    ];

    for depth in [PixelDepth::Bpp16, PixelDepth::Bpp32] {
        for factors in ScaleFactors::ALL {
            for height in 1..=args.max_height {
                for width in 1..=args.max_width {
                    for offset in 0..4 {
                        let geometry = padded_geometry(depth, factors, width, height, offset);
                        verify_case(&geometry, offset, &accelerated, &mut report);
                    }
                }
            }
            log::debug!("verified {} {}-bit", factors, depth.bits());
        }
    }
    report
}

/// Geometry with odd padding on the larger offsets so strides also go unaligned
fn padded_geometry(
    depth: PixelDepth,
    factors: ScaleFactors,
    width: usize,
    height: usize,
    offset: usize,
) -> BlitGeometry {
    let src_row = width * depth.bytes_per_pixel();
    let dst_row = src_row * factors.x.get();
    BlitGeometry::for_factors(depth, factors, width, height, src_row + offset * 2, dst_row + offset)
}

fn verify_case(
    geometry: &BlitGeometry,
    offset: usize,
    accelerated: &[AcceleratedScaler],
    report: &mut VerifyReport,
) {
    const FILL: u8 = 0x5A;
    let (src_len, dst_len) = match (geometry.required_src_len(), geometry.required_dst_len()) {
        (Some(s), Some(d)) => (s, d),
        _ => return,
    };

    let src_store: Vec<u8> = (0..src_len + offset)
        .map(|i| (i as u8).wrapping_mul(29) ^ 0x33)
        .collect();
    let src = &src_store[offset..];

    let mut expected = vec![FILL; dst_len];
    PortableScaler.scale(geometry, src, &mut expected);
    report.cases += 1;
    if let Some(at) = replication_violation(geometry, src, &expected) {
        report
            .mismatches
            .push(format!("portable {}: {}", describe(geometry, offset), at));
    }

    let mut dst_store = vec![FILL; dst_len + offset];
    for scaler in accelerated {
        for gated in [true, false] {
            dst_store.fill(FILL);
            let dst = &mut dst_store[offset..];
            if gated {
                scaler.scale(geometry, src, dst);
            } else {
                scaler.scale_vectorized(geometry, src, dst);
            }
            report.cases += 1;
            if let Some(i) = dst.iter().zip(&expected).position(|(a, b)| a != b) {
                report.mismatches.push(format!(
                    "{} {} px batch {}: first difference at byte {}",
                    if gated { "gated" } else { "ungated" },
                    scaler.batch().pixels(),
                    describe(geometry, offset),
                    i
                ));
            }
        }
    }
}

fn describe(g: &BlitGeometry, offset: usize) -> String {
    format!(
        "{}x{} {}-bit {}x{} sp {} dp {} offset {}",
        g.x.get(),
        g.ymul,
        g.depth.bits(),
        g.width,
        g.height,
        g.src_stride,
        g.dst_stride,
        offset
    )
}

/// First destination pixel that is not a copy of its source pixel
fn replication_violation(g: &BlitGeometry, src: &[u8], dst: &[u8]) -> Option<String> {
    let bpp = g.bytes_per_pixel();
    let x = g.x.get();
    for r in 0..g.dst_rows() {
        for c in 0..g.width * x {
            let d = r * g.dst_stride + c * bpp;
            let s = (r / g.ymul) * g.src_stride + (c / x) * bpp;
            if dst[d..d + bpp] != src[s..s + bpp] {
                return Some(format!("pixel ({}, {}) differs from source", r, c));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::XFactor;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_bench() {
        let cli = Cli::try_parse_from([
            "blitscale", "bench", "--depth", "16", "-x", "4", "-y", "3", "--width", "64",
            "--strategy", "portable", "--batch", "16", "--misalign", "1",
        ])
        .unwrap();
        match cli.command {
            Command::Bench(args) => {
                assert_eq!(args.depth, PixelDepth::Bpp16);
                assert_eq!((args.x, args.y), (4, 3));
                assert_eq!(args.width, 64);
                assert_eq!(args.height, 240);
                assert_eq!(args.strategy, Some(StrategyPreference::Portable));
                assert_eq!(args.batch, Some(BatchSize::Pixels16));
                assert_eq!(args.misalign, 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(cli.verbosity, 3);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(Cli::try_parse_from(["blitscale", "bench", "--depth", "24"]).is_err());
        assert!(Cli::try_parse_from(["blitscale", "bench", "--batch", "8"]).is_err());
        assert!(Cli::try_parse_from(["blitscale", "bench", "--strategy", "gpu"]).is_err());
    }

    #[test]
    fn test_parse_verify_with_global_verbosity() {
        let cli =
            Cli::try_parse_from(["blitscale", "verify", "--max-width", "9", "-v", "5"]).unwrap();
        assert_eq!(cli.log_level(), LogLevel::Debug);
        match cli.command {
            Command::Verify(args) => {
                assert_eq!(args.max_width, 9);
                assert_eq!(args.max_height, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_run_bench_small() {
        let args = BenchArgs {
            depth: PixelDepth::Bpp16,
            x: 2,
            y: 3,
            width: 17,
            height: 4,
            frames: 3,
            strategy: Some(StrategyPreference::Auto),
            batch: None,
            misalign: 1,
        };
        let report = run_bench(&args, ScalerConfig::DEFAULT).unwrap();
        assert_eq!(report.scaler, "accelerated");
        assert_eq!(report.frames, 3);
        assert_eq!(report.bytes_per_frame, 17 * 2 * 2 * 4 * 3);
    }

    #[test]
    fn test_run_bench_rejects_ratio() {
        let args = BenchArgs {
            depth: PixelDepth::Bpp32,
            x: 3,
            y: 1,
            width: 8,
            height: 8,
            frames: 1,
            strategy: None,
            batch: None,
            misalign: 0,
        };
        assert!(run_bench(&args, ScalerConfig::DEFAULT).is_err());
    }

    #[test]
    fn test_bench_report_rates() {
        let report = BenchReport {
            scaler: "portable",
            frames: 100,
            bytes_per_frame: 1_000_000,
            seconds: 2.0,
        };
        assert_eq!(report.ms_per_frame(), 20.0);
        assert_eq!(report.megabytes_per_second(), 50.0);
        assert!(report.to_string().starts_with("portable: 100 frames"));
    }

    #[test]
    fn test_run_verify_small_sweep_passes() {
        let report = run_verify(&VerifyArgs {
            max_width: 9,
            max_height: 2,
        });
        // 24 combinations x 9 widths x 2 heights x 4 offsets, 5 calls each
        assert_eq!(report.cases, 24 * 9 * 2 * 4 * 5);
        assert!(report.passed(), "{:?}", report.mismatches);
    }

    #[test]
    fn test_replication_violation_detected() {
        let g = BlitGeometry::new(PixelDepth::Bpp16, XFactor::X2, 1, 2, 1, 0, 0);
        let src = [1u8, 0, 2, 0];
        let good = [1u8, 0, 1, 0, 2, 0, 2, 0];
        let bad = [1u8, 0, 2, 0, 2, 0, 2, 0];
        assert_eq!(replication_violation(&g, &src, &good), None);
        assert!(replication_violation(&g, &src, &bad).is_some());
    }
}
