//! Nearest-pixel resampling between sensor grids.
//!
//! Both entry points split their outer loop into independent row ranges and
//! run them on the rayon pool. The call returns only after every row worker
//! has finished.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::capture_pipeline::alignment::types::{AlignedFrame, CorrespondencePoint, CorrespondenceTable};
use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::{FrameGeometry, PixelGrid};

/// Rounds to the nearest integer with ties going up: `floor(value + 0.5)`.
///
/// Returns `None` for non-finite input. `2.5 -> 3`, `-0.5 -> 0`, `2.4999 -> 2`.
#[inline]
pub fn round_half_up(value: f32) -> Option<i64> {
    let rounded = (value + 0.5).floor();
    if rounded.is_finite() {
        Some(rounded as i64)
    } else {
        None
    }
}

/// Flat index of the cell `point` rounds into, or `None` when it falls
/// outside a `width` x `height` grid. NaN and infinities are always rejected.
#[inline]
pub fn grid_index(point: CorrespondencePoint, width: usize, height: usize) -> Option<usize> {
    let x = round_half_up(point.x)?;
    let y = round_half_up(point.y)?;
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return None;
    }
    Some(y as usize * width + x as usize)
}

/// Packs one 1..=4 byte sample into a word so it can be stored atomically.
#[inline]
fn pack_sample(sample: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word[..sample.len()].copy_from_slice(sample);
    u32::from_le_bytes(word)
}

/// Scatters every source pixel onto the target grid.
///
/// `table` is keyed by source pixel (row-major, same order as `source`) and
/// holds positions in the target grid. Each accepted source pixel is copied
/// byte-for-byte into the cell its position rounds to; cells nobody maps to
/// stay zero.
///
/// Rows of the source grid are processed in parallel. Distinct source pixels
/// can land on the same target cell; whichever store happens last wins.
/// Every cell is a single atomic word, so a cell always holds exactly one
/// source pixel's bytes and never a mix of two.
///
/// # Errors
///
/// * [`CaptureError::PreconditionViolation`] when the table length differs
///   from the source pixel count. Nothing is written in that case.
/// * [`CaptureError::InvalidDimensions`] for an empty or overflowing target.
#[instrument(skip(source, table), fields(
    source = ?source.modality(),
    source_width = source.width(),
    source_height = source.height(),
))]
pub fn align(
    source: PixelGrid<'_>,
    table: &CorrespondenceTable,
    target_width: usize,
    target_height: usize,
) -> Result<AlignedFrame> {
    if table.len() != source.pixel_count() {
        return Err(CaptureError::PreconditionViolation {
            expected: source.pixel_count(),
            actual: table.len(),
        });
    }
    let bytes_per_sample = source.bytes_per_sample();
    let len = FrameGeometry::new(target_width, target_height).buffer_len(bytes_per_sample)?;

    let cells: Vec<AtomicU32> = (0..target_width * target_height)
        .map(|_| AtomicU32::new(0))
        .collect();

    let row_bytes = source.width() * bytes_per_sample;
    source
        .data()
        .par_chunks_exact(row_bytes)
        .zip(table.points().par_chunks_exact(source.width()))
        .for_each(|(row, points)| {
            for (sample, point) in row.chunks_exact(bytes_per_sample).zip(points) {
                if let Some(index) = grid_index(*point, target_width, target_height) {
                    cells[index].store(pack_sample(sample), Ordering::Relaxed);
                }
            }
        });

    let mut data = vec![0u8; len];
    data.par_chunks_exact_mut(bytes_per_sample)
        .zip(cells.into_par_iter())
        .for_each(|(out, cell)| {
            out.copy_from_slice(&cell.into_inner().to_le_bytes()[..bytes_per_sample]);
        });

    debug!("Scattered {} source pixels", source.pixel_count());

    Ok(AlignedFrame {
        modality: source.modality(),
        width: target_width,
        height: target_height,
        bytes_per_sample,
        data,
    })
}

/// Pulls a source pixel into every target pixel.
///
/// `table` is keyed by target pixel and holds positions in the source grid.
/// The same rounding and bounds rules as [`align`] apply, checked against
/// the source extent. Each target row is written by exactly one worker, so
/// the result is deterministic.
///
/// # Errors
///
/// * [`CaptureError::PreconditionViolation`] when the table length differs
///   from the target pixel count.
/// * [`CaptureError::InvalidDimensions`] for an empty or overflowing target.
#[instrument(skip(source, table), fields(
    source = ?source.modality(),
    source_width = source.width(),
    source_height = source.height(),
))]
pub fn align_gather(
    source: PixelGrid<'_>,
    table: &CorrespondenceTable,
    target_width: usize,
    target_height: usize,
) -> Result<AlignedFrame> {
    let bytes_per_sample = source.bytes_per_sample();
    let len = FrameGeometry::new(target_width, target_height).buffer_len(bytes_per_sample)?;
    if table.len() != target_width * target_height {
        return Err(CaptureError::PreconditionViolation {
            expected: target_width * target_height,
            actual: table.len(),
        });
    }

    let source_data = source.data();
    let mut data = vec![0u8; len];
    data.par_chunks_exact_mut(target_width * bytes_per_sample)
        .zip(table.points().par_chunks_exact(target_width))
        .for_each(|(row, points)| {
            for (out, point) in row.chunks_exact_mut(bytes_per_sample).zip(points) {
                if let Some(index) = grid_index(*point, source.width(), source.height()) {
                    let offset = index * bytes_per_sample;
                    out.copy_from_slice(&source_data[offset..offset + bytes_per_sample]);
                }
            }
        });

    Ok(AlignedFrame {
        modality: source.modality(),
        width: target_width,
        height: target_height,
        bytes_per_sample,
        data,
    })
}
