//! Frame buffer module
//!
//! Per-modality pixel storage refreshed every acquisition cycle, plus the
//! borrowed views the alignment engine and the frame sink operate on.

pub mod types;

pub use types::{
    ColorFrame,
    DepthFrame,
    FrameGeometry,
    FrameImage,
    Modality,
    PixelFormat,
    PixelGrid,
};
