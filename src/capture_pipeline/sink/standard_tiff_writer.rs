use std::io::Write;
use tracing::debug;
use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::{FrameImage, PixelFormat};
use crate::capture_pipeline::sink::types::TiffCompression;
use crate::capture_pipeline::sink::writer::{bgra_to_rgba, check_image, gray16_samples, ImageWriter};

/// TIFF output through the `tiff` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardTiffWriter {
    compression: TiffCompression,
    /// Predictor value for compression (typically 2 for horizontal differencing)
    predictor: Option<u16>,
}

impl StandardTiffWriter {
    pub fn new(compression: TiffCompression, predictor: Option<u16>) -> Self {
        Self {
            compression,
            predictor,
        }
    }
}

impl ImageWriter for StandardTiffWriter {
    fn extension(&self) -> &'static str {
        "tiff"
    }

    fn write_image(&self, image: &FrameImage<'_>, output: &mut dyn Write) -> Result<()> {
        let (width, height) = check_image(image)?;
        debug!("Encoding TIFF image: {}x{} {:?}", width, height, image.format);

        // TiffEncoder needs Seek, so encode in memory first
        let mut buffer = Vec::new();

        {
            let compression = match self.compression {
                TiffCompression::None => tiff::encoder::Compression::Uncompressed,
                TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
                TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
                TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
                TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
            };

            let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
                .map_err(|e| CaptureError::EncodeError(e.to_string()))?
                .with_compression(compression);

            if let Some(predictor_val) = self.predictor {
                let predictor = match predictor_val {
                    2 => tiff::tags::Predictor::Horizontal,
                    _ => tiff::tags::Predictor::None,
                };
                encoder = encoder.with_predictor(predictor);
            }

            let written = match image.format {
                PixelFormat::Bgra8 => {
                    let rgba = bgra_to_rgba(image.data);
                    encoder.write_image::<tiff::encoder::colortype::RGBA8>(width, height, &rgba)
                }
                PixelFormat::Gray16 => {
                    let samples = gray16_samples(image.data);
                    encoder.write_image::<tiff::encoder::colortype::Gray16>(width, height, &samples)
                }
            };
            written.map_err(|e| CaptureError::EncodeError(e.to_string()))?;
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }
}
