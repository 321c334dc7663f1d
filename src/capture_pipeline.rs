//! Depth/color capture pipeline module
//!
//! Acquires color and depth frames from a sensor session, resamples one
//! modality onto the other's pixel grid and writes both frames to disk.

pub mod common;
pub mod frames;
pub mod alignment;
pub mod sensor;
pub mod sink;
pub mod cycle;

pub use common::{
    CaptureError,
    Result,
};

pub use frames::{
    ColorFrame,
    DepthFrame,
    FrameGeometry,
    Modality,
    PixelGrid,
};

pub use alignment::{
    align,
    align_gather,
    AlignedFrame,
    AlignmentDirection,
    CorrespondencePoint,
    CorrespondenceTable,
    ResampleStrategy,
};

pub use sensor::{
    CoordinateMapper,
    SensorDevice,
    SyntheticSensor,
};

pub use sink::{
    FrameSink,
    ImageFormat,
    ImageWriter,
    TiffCompression,
};

pub use cycle::{
    CaptureConfig,
    CaptureCycle,
    RunSummary,
};
