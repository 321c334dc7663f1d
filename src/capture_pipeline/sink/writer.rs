use std::io::Write;
use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::FrameImage;

pub trait ImageWriter {
    /// File extension (without the dot) of the files this writer produces.
    fn extension(&self) -> &'static str;

    fn write_image(&self, image: &FrameImage<'_>, output: &mut dyn Write) -> Result<()>;
}

impl<W: ImageWriter + ?Sized> ImageWriter for Box<W> {
    fn extension(&self) -> &'static str {
        (**self).extension()
    }

    fn write_image(&self, image: &FrameImage<'_>, output: &mut dyn Write) -> Result<()> {
        (**self).write_image(image, output)
    }
}

pub(crate) fn check_image(image: &FrameImage<'_>) -> Result<(u32, u32)> {
    if image.data.len() != image.expected_len() {
        return Err(CaptureError::BufferSizeMismatch {
            expected: image.expected_len(),
            actual: image.data.len(),
        });
    }
    let width = u32::try_from(image.width)
        .map_err(|_| CaptureError::InvalidDimensions(image.width, image.height))?;
    let height = u32::try_from(image.height)
        .map_err(|_| CaptureError::InvalidDimensions(image.width, image.height))?;
    Ok((width, height))
}

/// Swaps the B and R channels of packed BGRA pixels.
pub(crate) fn bgra_to_rgba(bgra: &[u8]) -> Vec<u8> {
    bgra.chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect()
}

pub(crate) fn gray16_samples(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|b| u16::from_ne_bytes([b[0], b[1]]))
        .collect()
}
