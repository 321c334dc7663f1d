use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use depth_color_align::capture_pipeline::{
    AlignmentDirection, CaptureConfig, CaptureCycle, ImageFormat, ResampleStrategy,
    SyntheticSensor, TiffCompression,
};
use depth_color_align::logger;

use tracing::info;

#[derive(Parser)]
#[command(name = "depth_color_align")]
#[command(about = "Capture color and depth frames and align one onto the other's grid")]
#[command(version)]
struct Cli {
    /// Which modality is resampled onto which grid
    #[arg(short, long, value_enum, default_value_t = Direction::DepthOntoColor)]
    direction: Direction,

    /// How the correspondence table is walked
    #[arg(short, long, value_enum, default_value_t = Strategy::Scatter)]
    strategy: Strategy,

    /// Directory receiving color<n>/depth<n> files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Output image format
    #[arg(short, long, value_enum, default_value_t = Format::Png)]
    format: Format,

    /// TIFF compression (ignored for PNG)
    #[arg(long, value_enum, default_value_t = Compression::None)]
    compression: Compression,

    /// TIFF predictor (2 = horizontal differencing)
    #[arg(long)]
    predictor: Option<u16>,

    /// Delay after opening the sensor before the first cycle
    #[arg(long, default_value = "2000")]
    warmup_ms: u64,

    /// Stop after this many cycles (runs until Ctrl+C otherwise)
    #[arg(short = 'n', long)]
    max_cycles: Option<u64>,

    /// Accept frames whose resolution differs from the session's
    #[arg(long)]
    no_validate: bool,

    /// Make every n-th poll of the synthetic sensor report no new frame
    #[arg(long)]
    miss_every: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Direction {
    DepthOntoColor,
    ColorOntoDepth,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    Scatter,
    Gather,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Png,
    Tiff,
}

#[derive(Clone, Copy, ValueEnum)]
enum Compression {
    None,
    Lzw,
    DeflateFast,
    DeflateBalanced,
    DeflateBest,
}

impl From<Direction> for AlignmentDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::DepthOntoColor => AlignmentDirection::DepthOntoColor,
            Direction::ColorOntoDepth => AlignmentDirection::ColorOntoDepth,
        }
    }
}

impl From<Strategy> for ResampleStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Scatter => ResampleStrategy::Scatter,
            Strategy::Gather => ResampleStrategy::Gather,
        }
    }
}

impl From<Format> for ImageFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Png => ImageFormat::Png,
            Format::Tiff => ImageFormat::Tiff,
        }
    }
}

impl From<Compression> for TiffCompression {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::None => TiffCompression::None,
            Compression::Lzw => TiffCompression::Lzw,
            Compression::DeflateFast => TiffCompression::DeflateFast,
            Compression::DeflateBalanced => TiffCompression::DeflateBalanced,
            Compression::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(&cli.log_level);

    info!("Starting depth_color_align...");

    let config = CaptureConfig::builder()
        .direction(cli.direction.into())
        .strategy(cli.strategy.into())
        .output_dir(&cli.output_dir)
        .image_format(cli.format.into())
        .tiff_compression(cli.compression.into())
        .tiff_predictor(cli.predictor)
        .warmup(Duration::from_millis(cli.warmup_ms))
        .max_cycles(cli.max_cycles)
        .validate_dimensions(!cli.no_validate)
        .build();

    let mut cycle = match cli.miss_every {
        None => CaptureCycle::new(config),
        Some(n) => {
            let writer = config.writer();
            CaptureCycle::with_custom(SyntheticSensor::default().with_miss_every(n), writer, config)
        }
    }
    .context("failed to start the capture session")?;

    let stop = Arc::new(AtomicBool::new(false));
    let stop_handler = stop.clone();
    ctrlc::set_handler(move || {
        stop_handler.store(true, Ordering::SeqCst);
    })?;

    info!("Capturing (press Ctrl+C to stop)");
    let summary = cycle.run(&stop)?;

    info!(
        "Wrote {} files over {} cycles ({} skipped)",
        summary.files_written, summary.cycles, summary.failed_cycles
    );
    Ok(())
}
