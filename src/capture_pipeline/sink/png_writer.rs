use std::io::Write;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::{FrameImage, PixelFormat};
use crate::capture_pipeline::sink::writer::{bgra_to_rgba, check_image, ImageWriter};

/// PNG output through the `image` crate.
///
/// Color is stored as RGBA8 (the in-memory BGRA order is swapped on the way
/// out), depth as 16-bit grayscale.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngWriter;

impl ImageWriter for PngWriter {
    fn extension(&self) -> &'static str {
        "png"
    }

    fn write_image(&self, image: &FrameImage<'_>, output: &mut dyn Write) -> Result<()> {
        let (width, height) = check_image(image)?;
        debug!("Encoding PNG image: {}x{} {:?}", width, height, image.format);

        let encoder = PngEncoder::new(output);
        let written = match image.format {
            PixelFormat::Bgra8 => {
                let rgba = bgra_to_rgba(image.data);
                encoder.write_image(&rgba, width, height, ExtendedColorType::Rgba8)
            }
            PixelFormat::Gray16 => {
                encoder.write_image(image.data, width, height, ExtendedColorType::L16)
            }
        };
        written.map_err(|e| CaptureError::EncodeError(e.to_string()))
    }
}
