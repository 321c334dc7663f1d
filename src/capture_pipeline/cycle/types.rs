//! Capture configuration and per-cycle reporting types

use std::path::PathBuf;
use std::time::Duration;

use crate::capture_pipeline::alignment::{AlignmentDirection, ResampleStrategy};
use crate::capture_pipeline::sink::{
    ImageFormat, ImageWriter, PngWriter, StandardTiffWriter, TiffCompression,
};

/// Time the sensor needs after opening before frames start flowing.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(2);

/// Configuration for a capture run
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Which modality is resampled onto which grid
    pub direction: AlignmentDirection,
    /// How the correspondence table is walked
    pub strategy: ResampleStrategy,
    /// Directory receiving `color<n>` / `depth<n>` files
    pub output_dir: PathBuf,
    /// Output container
    pub image_format: ImageFormat,
    /// Compression used when `image_format` is TIFF
    pub tiff_compression: TiffCompression,
    /// Predictor used when `image_format` is TIFF (2 = horizontal differencing)
    pub tiff_predictor: Option<u16>,
    /// Delay between opening the device and the first cycle
    pub warmup: Duration,
    /// Stop after this many cycles; `None` runs until stopped externally
    pub max_cycles: Option<u64>,
    /// Whether to reject acquired frames whose resolution differs from the session's
    pub validate_dimensions: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            direction: AlignmentDirection::default(),
            strategy: ResampleStrategy::default(),
            output_dir: PathBuf::from("."),
            image_format: ImageFormat::default(),
            tiff_compression: TiffCompression::default(),
            tiff_predictor: None,
            warmup: DEFAULT_WARMUP,
            max_cycles: None,
            validate_dimensions: true,
        }
    }
}

impl CaptureConfig {
    pub fn builder() -> CaptureConfigBuilder {
        CaptureConfigBuilder::default()
    }

    /// Image writer matching `image_format`.
    pub fn writer(&self) -> Box<dyn ImageWriter> {
        match self.image_format {
            ImageFormat::Png => Box::new(PngWriter),
            ImageFormat::Tiff => Box::new(StandardTiffWriter::new(
                self.tiff_compression,
                self.tiff_predictor,
            )),
        }
    }
}

/// Builder for CaptureConfig
#[derive(Default)]
pub struct CaptureConfigBuilder {
    direction: Option<AlignmentDirection>,
    strategy: Option<ResampleStrategy>,
    output_dir: Option<PathBuf>,
    image_format: Option<ImageFormat>,
    tiff_compression: Option<TiffCompression>,
    tiff_predictor: Option<Option<u16>>,
    warmup: Option<Duration>,
    max_cycles: Option<Option<u64>>,
    validate_dimensions: Option<bool>,
}

impl CaptureConfigBuilder {
    pub fn direction(mut self, direction: AlignmentDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn strategy(mut self, strategy: ResampleStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn image_format(mut self, format: ImageFormat) -> Self {
        self.image_format = Some(format);
        self
    }

    pub fn tiff_compression(mut self, compression: TiffCompression) -> Self {
        self.tiff_compression = Some(compression);
        self
    }

    pub fn tiff_predictor(mut self, predictor: Option<u16>) -> Self {
        self.tiff_predictor = Some(predictor);
        self
    }

    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = Some(warmup);
        self
    }

    pub fn max_cycles(mut self, max: Option<u64>) -> Self {
        self.max_cycles = Some(max);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn build(self) -> CaptureConfig {
        let default = CaptureConfig::default();
        CaptureConfig {
            direction: self.direction.unwrap_or(default.direction),
            strategy: self.strategy.unwrap_or(default.strategy),
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            image_format: self.image_format.unwrap_or(default.image_format),
            tiff_compression: self.tiff_compression.unwrap_or(default.tiff_compression),
            tiff_predictor: self.tiff_predictor.unwrap_or(default.tiff_predictor),
            warmup: self.warmup.unwrap_or(default.warmup),
            max_cycles: self.max_cycles.unwrap_or(default.max_cycles),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number
    pub cycle: u64,
    pub color_refreshed: bool,
    pub depth_refreshed: bool,
    /// Aligned pixels holding a sample
    pub aligned_pixels: usize,
    pub saved: Vec<PathBuf>,
    pub write_failures: usize,
}

/// Totals over a [`run`](crate::capture_pipeline::cycle::CaptureCycle::run).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub failed_cycles: u64,
    pub files_written: u64,
    pub write_failures: u64,
}
