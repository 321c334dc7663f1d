//! Deterministic stand-in for a depth camera.
//!
//! Renders a sphere drifting in front of a checkered wall from both cameras
//! of a [`PinholeMapper`] rig, so the color and depth streams agree with the
//! mapper's calibration.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::capture_pipeline::alignment::CorrespondenceTable;
use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::{ColorFrame, DepthFrame};
use crate::capture_pipeline::sensor::calibration::PinholeMapper;
use crate::capture_pipeline::sensor::session::{
    ColorSource, CoordinateMapper, DepthSource, SensorSession, SessionInfo,
};

const WALL_DEPTH_MM: f32 = 2500.0;
const SPHERE_DEPTH_MM: f32 = 1500.0;
const SPHERE_RADIUS_MM: f32 = 400.0;
const SPHERE_SWING_MM: f32 = 300.0;
const CHECKER_SIZE_MM: f32 = 200.0;
/// Leftmost depth columns never return, like the IR sensor's dead band.
const DEAD_BAND_COLUMNS: usize = 8;

struct Hit {
    point: [f32; 3],
    normal: [f32; 3],
    on_sphere: bool,
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[derive(Debug, Clone)]
pub struct SyntheticSensor {
    mapper: PinholeMapper,
    available: bool,
    open: bool,
    miss_every: Option<u64>,
    color_polls: u64,
    depth_polls: u64,
    phase: u64,
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        Self::new(PinholeMapper::kinect_v2())
    }
}

impl SyntheticSensor {
    pub fn new(mapper: PinholeMapper) -> Self {
        Self {
            mapper,
            available: true,
            open: false,
            miss_every: None,
            color_polls: 0,
            depth_polls: 0,
            phase: 0,
        }
    }

    /// Every `n`-th poll of each stream reports no new frame.
    pub fn with_miss_every(mut self, n: u64) -> Self {
        self.miss_every = Some(n.max(1));
        self
    }

    /// Simulates a sensor that is not plugged in.
    pub fn unplugged(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn mapper(&self) -> &PinholeMapper {
        &self.mapper
    }

    fn is_miss(&self, poll: u64) -> bool {
        match self.miss_every {
            Some(n) => poll % n == n - 1,
            None => false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(CaptureError::AcquisitionFailed("sensor is not open".to_string()))
        }
    }

    fn sphere_center(&self) -> [f32; 3] {
        let x = SPHERE_SWING_MM * (self.phase as f32 * 0.1).sin();
        [x, 0.0, SPHERE_DEPTH_MM]
    }

    /// Intersects a ray (in depth camera coordinates) with the scene.
    fn trace(&self, origin: [f32; 3], dir: [f32; 3]) -> Option<Hit> {
        let center = self.sphere_center();
        let oc = [origin[0] - center[0], origin[1] - center[1], origin[2] - center[2]];
        let a = dot(dir, dir);
        let b = dot(oc, dir);
        let c = dot(oc, oc) - SPHERE_RADIUS_MM * SPHERE_RADIUS_MM;
        let disc = b * b - a * c;
        if disc >= 0.0 {
            let t = (-b - disc.sqrt()) / a;
            if t > 0.0 {
                let point = [origin[0] + t * dir[0], origin[1] + t * dir[1], origin[2] + t * dir[2]];
                let normal = [
                    (point[0] - center[0]) / SPHERE_RADIUS_MM,
                    (point[1] - center[1]) / SPHERE_RADIUS_MM,
                    (point[2] - center[2]) / SPHERE_RADIUS_MM,
                ];
                return Some(Hit { point, normal, on_sphere: true });
            }
        }

        if dir[2] <= 0.0 {
            return None;
        }
        let t = (WALL_DEPTH_MM - origin[2]) / dir[2];
        (t > 0.0).then(|| Hit {
            point: [origin[0] + t * dir[0], origin[1] + t * dir[1], WALL_DEPTH_MM],
            normal: [0.0, 0.0, -1.0],
            on_sphere: false,
        })
    }

    fn shade(hit: &Hit, dir: [f32; 3]) -> [u8; 4] {
        if hit.on_sphere {
            let facing = (-dot(hit.normal, dir) / dot(dir, dir).sqrt()).clamp(0.0, 1.0);
            let red = (80.0 + 175.0 * facing) as u8;
            [40, 40, red, 255]
        } else {
            let cell = (hit.point[0] / CHECKER_SIZE_MM).floor() as i64
                + (hit.point[1] / CHECKER_SIZE_MM).floor() as i64;
            let gray = if cell.rem_euclid(2) == 0 { 200 } else { 90 };
            [gray, gray, gray, 255]
        }
    }

    fn render_depth(&self) -> Result<DepthFrame> {
        let intrinsics = self.mapper.depth;
        let mut data = vec![0u16; intrinsics.geometry().pixel_count()];
        data.par_chunks_mut(intrinsics.width)
            .enumerate()
            .for_each(|(v, row)| {
                for (u, sample) in row.iter_mut().enumerate().skip(DEAD_BAND_COLUMNS) {
                    let dir = intrinsics.unproject(u as f32, v as f32, 1.0);
                    if let Some(hit) = self.trace([0.0; 3], dir) {
                        *sample = hit.point[2].round().clamp(0.0, u16::MAX as f32) as u16;
                    }
                }
            });
        DepthFrame::new(intrinsics.width, intrinsics.height, data)
    }

    fn render_color(&self) -> Result<ColorFrame> {
        let intrinsics = self.mapper.color;
        let color_to_depth = self.mapper.depth_to_color.inverse();
        let origin = color_to_depth.translation;
        let mut data = vec![0u8; intrinsics.geometry().pixel_count() * ColorFrame::BYTES_PER_PIXEL];
        data.par_chunks_mut(intrinsics.width * ColorFrame::BYTES_PER_PIXEL)
            .enumerate()
            .for_each(|(v, row)| {
                for (u, pixel) in row.chunks_exact_mut(ColorFrame::BYTES_PER_PIXEL).enumerate() {
                    let dir = color_to_depth.rotate(intrinsics.unproject(u as f32, v as f32, 1.0));
                    if let Some(hit) = self.trace(origin, dir) {
                        pixel.copy_from_slice(&Self::shade(&hit, dir));
                    }
                }
            });
        ColorFrame::new(intrinsics.width, intrinsics.height, data)
    }
}

impl SensorSession for SyntheticSensor {
    fn open(&mut self) -> Result<SessionInfo> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable(
                "no synthetic sensor attached".to_string(),
            ));
        }
        self.open = true;
        let info = SessionInfo {
            color: self.mapper.color.geometry(),
            depth: self.mapper.depth.geometry(),
        };
        info!(
            color = %format!("{}x{}", info.color.width, info.color.height),
            depth = %format!("{}x{}", info.depth.width, info.depth.height),
            "Synthetic sensor opened"
        );
        Ok(info)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if self.open {
            debug!("Synthetic sensor closed");
        }
        self.open = false;
    }
}

impl ColorSource for SyntheticSensor {
    fn try_acquire_latest_color(&mut self) -> Result<Option<ColorFrame>> {
        self.ensure_open()?;
        let poll = self.color_polls;
        self.color_polls += 1;
        if self.is_miss(poll) {
            return Ok(None);
        }
        self.phase += 1;
        self.render_color().map(Some)
    }
}

impl DepthSource for SyntheticSensor {
    fn try_acquire_latest_depth(&mut self) -> Result<Option<DepthFrame>> {
        self.ensure_open()?;
        let poll = self.depth_polls;
        self.depth_polls += 1;
        if self.is_miss(poll) {
            return Ok(None);
        }
        self.render_depth().map(Some)
    }
}

impl CoordinateMapper for SyntheticSensor {
    fn map_depth_frame_to_color_space(&self, depth: &DepthFrame) -> Result<CorrespondenceTable> {
        self.mapper.map_depth_frame_to_color_space(depth)
    }

    fn map_color_frame_to_depth_space(&self, depth: &DepthFrame) -> Result<CorrespondenceTable> {
        self.mapper.map_color_frame_to_depth_space(depth)
    }
}
