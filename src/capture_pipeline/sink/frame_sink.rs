use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::{FrameImage, Modality};
use crate::capture_pipeline::sink::writer::ImageWriter;

/// Writes frames as `<modality><n>.<ext>` with one counter per modality.
///
/// Counters start at 0 and advance on every save attempt, successful or not,
/// so a failed write leaves a gap instead of being retried under the same name.
pub struct FrameSink<W: ImageWriter> {
    writer: W,
    output_dir: PathBuf,
    color_counter: u64,
    depth_counter: u64,
}

impl<W: ImageWriter> FrameSink<W> {
    /// Creates the sink, creating `output_dir` if needed.
    pub fn new(writer: W, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            CaptureError::OutputWriteError(format!("{}: {}", output_dir.display(), e))
        })?;
        Ok(Self {
            writer,
            output_dir,
            color_counter: 0,
            depth_counter: 0,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Sequence number the next save of `modality` will use.
    pub fn next_index(&self, modality: Modality) -> u64 {
        match modality {
            Modality::Color => self.color_counter,
            Modality::Depth => self.depth_counter,
        }
    }

    fn take_index(&mut self, modality: Modality) -> u64 {
        let counter = match modality {
            Modality::Color => &mut self.color_counter,
            Modality::Depth => &mut self.depth_counter,
        };
        let index = *counter;
        *counter += 1;
        index
    }

    pub fn path_for(&self, modality: Modality, index: u64) -> PathBuf {
        self.output_dir.join(format!(
            "{}{}.{}",
            modality.file_stem(),
            index,
            self.writer.extension()
        ))
    }

    #[instrument(skip(self, image), fields(width = image.width, height = image.height))]
    pub fn save(&mut self, modality: Modality, image: &FrameImage<'_>) -> Result<PathBuf> {
        let index = self.take_index(modality);
        let path = self.path_for(modality, index);

        let file = std::fs::File::create(&path).map_err(|e| {
            CaptureError::OutputWriteError(format!("{}: {}", path.display(), e))
        })?;
        let mut output = BufWriter::new(file);
        self.writer.write_image(image, &mut output)?;
        output.flush().map_err(|e| {
            CaptureError::OutputWriteError(format!("{}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Frame saved");
        Ok(path)
    }
}
