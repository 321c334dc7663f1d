//! Frame buffer types

use crate::capture_pipeline::common::error::{CaptureError, Result};

/// One sensor stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Color,
    Depth,
}

impl Modality {
    /// File name prefix used by the frame sink.
    pub fn file_stem(self) -> &'static str {
        match self {
            Modality::Color => "color",
            Modality::Depth => "depth",
        }
    }

    pub fn pixel_format(self) -> PixelFormat {
        match self {
            Modality::Color => PixelFormat::Bgra8,
            Modality::Depth => PixelFormat::Gray16,
        }
    }
}

/// In-memory pixel layouts produced by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 x 8-bit, B,G,R,A order
    Bgra8,
    /// 1 x 16-bit unsigned, native endian
    Gray16,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::Gray16 => 2,
        }
    }
}

/// Resolution of one sensor stream. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
}

impl FrameGeometry {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Byte length of a buffer with this geometry, rejecting empty or
    /// overflowing shapes.
    pub fn buffer_len(&self, bytes_per_pixel: usize) -> Result<usize> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidDimensions(self.width, self.height));
        }
        self.width
            .checked_mul(self.height)
            .and_then(|pixels| pixels.checked_mul(bytes_per_pixel))
            .ok_or(CaptureError::InvalidDimensions(self.width, self.height))
    }
}

/// Packed BGRA color frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrame {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl ColorFrame {
    pub const BYTES_PER_PIXEL: usize = 4;

    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        let expected = FrameGeometry::new(width, height).buffer_len(Self::BYTES_PER_PIXEL)?;
        if data.len() != expected {
            return Err(CaptureError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { width, height, data })
    }

    /// Zero-filled frame, used before the first acquisition succeeds.
    pub fn blank(geometry: FrameGeometry) -> Result<Self> {
        let len = geometry.buffer_len(Self::BYTES_PER_PIXEL)?;
        Ok(Self {
            width: geometry.width,
            height: geometry.height,
            data: vec![0u8; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// BGRA bytes of pixel `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * self.width + x) * Self::BYTES_PER_PIXEL;
        let mut bgra = [0u8; 4];
        bgra.copy_from_slice(&self.data[offset..offset + Self::BYTES_PER_PIXEL]);
        bgra
    }

    pub fn as_grid(&self) -> PixelGrid<'_> {
        PixelGrid {
            modality: Modality::Color,
            data: &self.data,
            width: self.width,
            height: self.height,
            bytes_per_sample: Self::BYTES_PER_PIXEL,
        }
    }

    pub fn as_image(&self) -> FrameImage<'_> {
        FrameImage {
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra8,
            data: &self.data,
        }
    }
}

/// Single-channel 16-bit depth frame; 0 means no return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl DepthFrame {
    pub const BYTES_PER_PIXEL: usize = 2;

    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        let expected = FrameGeometry::new(width, height).buffer_len(1)?;
        if data.len() != expected {
            return Err(CaptureError::BufferSizeMismatch {
                expected: expected * Self::BYTES_PER_PIXEL,
                actual: data.len() * Self::BYTES_PER_PIXEL,
            });
        }
        Ok(Self { width, height, data })
    }

    pub fn blank(geometry: FrameGeometry) -> Result<Self> {
        let len = geometry.buffer_len(1)?;
        Ok(Self {
            width: geometry.width,
            height: geometry.height,
            data: vec![0u16; len],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn depth_at(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.width + x]
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn as_grid(&self) -> PixelGrid<'_> {
        PixelGrid {
            modality: Modality::Depth,
            data: self.as_bytes(),
            width: self.width,
            height: self.height,
            bytes_per_sample: Self::BYTES_PER_PIXEL,
        }
    }

    pub fn as_image(&self) -> FrameImage<'_> {
        FrameImage {
            width: self.width,
            height: self.height,
            format: PixelFormat::Gray16,
            data: self.as_bytes(),
        }
    }
}

/// Read-only, row-major byte view of one frame.
#[derive(Debug, Clone, Copy)]
pub struct PixelGrid<'a> {
    pub(crate) modality: Modality,
    pub(crate) data: &'a [u8],
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) bytes_per_sample: usize,
}

impl<'a> PixelGrid<'a> {
    pub fn new(
        modality: Modality,
        data: &'a [u8],
        width: usize,
        height: usize,
        bytes_per_sample: usize,
    ) -> Result<Self> {
        if !(1..=4).contains(&bytes_per_sample) {
            return Err(CaptureError::UnsupportedSampleSize(bytes_per_sample));
        }
        let expected = FrameGeometry::new(width, height).buffer_len(bytes_per_sample)?;
        if data.len() != expected {
            return Err(CaptureError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            modality,
            data,
            width,
            height,
            bytes_per_sample,
        })
    }

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

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Borrowed image handed to an [`ImageWriter`](crate::capture_pipeline::sink::ImageWriter).
#[derive(Debug, Clone, Copy)]
pub struct FrameImage<'a> {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    pub data: &'a [u8],
}

impl FrameImage<'_> {
    pub fn expected_len(&self) -> usize {
        self.width * self.height * self.format.bytes_per_pixel()
    }
}
