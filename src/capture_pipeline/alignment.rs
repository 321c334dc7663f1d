//! Cross-modality alignment module
//!
//! Resamples one sensor's frame onto the other sensor's pixel grid using a
//! per-pixel correspondence table supplied by the coordinate mapper.

mod engine;
pub mod types;


pub use engine::{align, align_gather, grid_index, round_half_up};
pub use types::{
    AlignedFrame,
    AlignmentDirection,
    CorrespondencePoint,
    CorrespondenceTable,
    ResampleStrategy,
};
