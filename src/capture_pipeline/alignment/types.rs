//! Alignment data model

use crate::capture_pipeline::frames::{FrameImage, Modality};

/// Fractional position in a modality's pixel grid.
///
/// Mappers emit non-finite values for pixels they cannot map; the engine
/// rejects those through the regular bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CorrespondencePoint {
    pub x: f32,
    pub y: f32,
}

impl CorrespondencePoint {
    /// Sentinel the mapper emits for pixels with no valid correspondence.
    pub const UNMAPPED: CorrespondencePoint = CorrespondencePoint {
        x: f32::NEG_INFINITY,
        y: f32::NEG_INFINITY,
    };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for CorrespondencePoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// One correspondence per pixel, in row-major order of the grid it is keyed on.
///
/// Built fresh every cycle from one depth frame and consumed immediately.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrespondenceTable {
    points: Vec<CorrespondencePoint>,
}

impl CorrespondenceTable {
    pub fn new(points: Vec<CorrespondencePoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[CorrespondencePoint] {
        &self.points
    }
}

impl From<Vec<CorrespondencePoint>> for CorrespondenceTable {
    fn from(points: Vec<CorrespondencePoint>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<CorrespondencePoint> for CorrespondenceTable {
    fn from_iter<I: IntoIterator<Item = CorrespondencePoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Source-modality samples laid out on the target modality's grid.
///
/// Pixels that received no sample stay zero (transparent color, invalid depth).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedFrame {
    pub(crate) modality: Modality,
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) bytes_per_sample: usize,
    pub(crate) data: Vec<u8>,
}

impl AlignedFrame {
    /// Modality of the stored values (the source modality).
    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let offset = (y * self.width + x) * self.bytes_per_sample;
        &self.data[offset..offset + self.bytes_per_sample]
    }

    /// Number of pixels holding a non-zero sample.
    pub fn filled_pixel_count(&self) -> usize {
        self.data
            .chunks_exact(self.bytes_per_sample)
            .filter(|sample| sample.iter().any(|&b| b != 0))
            .count()
    }

    /// Image view for the frame sink. Only meaningful when the sample size
    /// matches the modality's native pixel format.
    pub fn as_image(&self) -> FrameImage<'_> {
        FrameImage {
            width: self.width,
            height: self.height,
            format: self.modality.pixel_format(),
            data: &self.data,
        }
    }
}

/// Which modality is resampled onto which grid. One per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlignmentDirection {
    /// Depth samples on the color grid; saves raw color + aligned depth.
    #[default]
    DepthOntoColor,
    /// Color samples on the depth grid; saves aligned color + raw depth.
    ColorOntoDepth,
}

impl AlignmentDirection {
    pub fn source(self) -> Modality {
        match self {
            AlignmentDirection::DepthOntoColor => Modality::Depth,
            AlignmentDirection::ColorOntoDepth => Modality::Color,
        }
    }

    pub fn target(self) -> Modality {
        match self {
            AlignmentDirection::DepthOntoColor => Modality::Color,
            AlignmentDirection::ColorOntoDepth => Modality::Depth,
        }
    }
}

/// How the engine walks the correspondence table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResampleStrategy {
    /// Table keyed by source pixel; each accepted source pixel is pushed to
    /// its rounded target cell. Duplicate targets are last-writer-wins.
    #[default]
    Scatter,
    /// Table keyed by target pixel; each target pixel pulls the source pixel
    /// its entry rounds to. Fully deterministic.
    Gather,
}
