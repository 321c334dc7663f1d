use crate::capture_pipeline::alignment::CorrespondenceTable;
use crate::capture_pipeline::common::error::Result;
use crate::capture_pipeline::frames::{ColorFrame, DepthFrame, FrameGeometry};

/// Stream resolutions reported by an opened session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub color: FrameGeometry,
    pub depth: FrameGeometry,
}

pub trait SensorSession {
    /// Opens the device. Fails with `DeviceUnavailable` when no sensor answers.
    fn open(&mut self) -> Result<SessionInfo>;
    fn is_open(&self) -> bool;
    fn close(&mut self);
}

pub trait ColorSource {
    /// Non-blocking poll; `Ok(None)` when no new frame arrived since the last call.
    fn try_acquire_latest_color(&mut self) -> Result<Option<ColorFrame>>;
}

pub trait DepthSource {
    /// Non-blocking poll; `Ok(None)` when no new frame arrived since the last call.
    fn try_acquire_latest_depth(&mut self) -> Result<Option<DepthFrame>>;
}

/// Per-pixel correspondences derived from device calibration.
///
/// Both directions key off one full depth frame.
pub trait CoordinateMapper {
    /// One entry per depth pixel, holding its position in color space.
    fn map_depth_frame_to_color_space(&self, depth: &DepthFrame) -> Result<CorrespondenceTable>;

    /// One entry per color pixel, holding its position in depth space.
    fn map_color_frame_to_depth_space(&self, depth: &DepthFrame) -> Result<CorrespondenceTable>;
}

/// Everything the capture cycle needs from one physical (or simulated) sensor.
pub trait SensorDevice: SensorSession + ColorSource + DepthSource + CoordinateMapper {}

impl<T: SensorSession + ColorSource + DepthSource + CoordinateMapper> SensorDevice for T {}
