//! Pinhole calibration model and the coordinate mapper built on it.
//!
//! Depth values are millimetres along the depth camera's optical axis. The
//! extrinsic transform takes points from the depth camera frame into the
//! color camera frame.

use rayon::prelude::*;
use tracing::instrument;

use crate::capture_pipeline::alignment::{grid_index, CorrespondencePoint, CorrespondenceTable};
use crate::capture_pipeline::common::error::{CaptureError, Result};
use crate::capture_pipeline::frames::{DepthFrame, FrameGeometry};
use crate::capture_pipeline::sensor::session::CoordinateMapper;

/// Depth used to seed the color-to-depth search before the first lookup.
const INITIAL_DEPTH_GUESS_MM: f32 = 2000.0;

/// Lookups per color pixel when refining the color-to-depth correspondence.
const REFINEMENT_STEPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub width: usize,
    pub height: usize,
    /// Focal length x (pixel)
    pub fx: f32,
    /// Focal length y (pixel)
    pub fy: f32,
    /// Principal point x (pixel)
    pub cx: f32,
    /// Principal point y (pixel)
    pub cy: f32,
}

impl CameraIntrinsics {
    /// Factory-typical values of a Kinect v2 color camera (1920x1080).
    pub fn kinect_v2_color() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fx: 1081.372,
            fy: 1081.372,
            cx: 959.5,
            cy: 539.5,
        }
    }

    /// Factory-typical values of a Kinect v2 IR/depth camera (512x424).
    pub fn kinect_v2_depth() -> Self {
        Self {
            width: 512,
            height: 424,
            fx: 365.456,
            fy: 365.456,
            cx: 254.878,
            cy: 205.395,
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    /// Camera-frame point at depth `z` seen through pixel `(u, v)`.
    #[inline]
    pub fn unproject(&self, u: f32, v: f32, z: f32) -> [f32; 3] {
        [(u - self.cx) * z / self.fx, (v - self.cy) * z / self.fy, z]
    }

    /// Fractional pixel position of a camera-frame point, `None` behind the camera.
    #[inline]
    pub fn project(&self, p: [f32; 3]) -> Option<CorrespondencePoint> {
        if p[2] <= 0.0 {
            return None;
        }
        Some(CorrespondencePoint::new(
            p[0] / p[2] * self.fx + self.cx,
            p[1] / p[2] * self.fy + self.cy,
        ))
    }
}

/// Rigid transform `p' = R p + t`, translation in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrinsics {
    pub rotation: [[f32; 3]; 3],
    pub translation: [f32; 3],
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0; 3],
        }
    }
}

impl Extrinsics {
    /// Depth-to-color transform of a Kinect v2: the color camera sits about
    /// 52 mm beside the IR camera with parallel optical axes.
    pub fn kinect_v2() -> Self {
        Self {
            translation: [52.0, 0.0, 0.0],
            ..Self::default()
        }
    }

    #[inline]
    pub fn rotate(&self, p: [f32; 3]) -> [f32; 3] {
        let r = &self.rotation;
        [
            r[0][0] * p[0] + r[0][1] * p[1] + r[0][2] * p[2],
            r[1][0] * p[0] + r[1][1] * p[1] + r[1][2] * p[2],
            r[2][0] * p[0] + r[2][1] * p[1] + r[2][2] * p[2],
        ]
    }

    #[inline]
    pub fn apply(&self, p: [f32; 3]) -> [f32; 3] {
        let q = self.rotate(p);
        [
            q[0] + self.translation[0],
            q[1] + self.translation[1],
            q[2] + self.translation[2],
        ]
    }

    /// `p = R^T (p' - t)`
    pub fn inverse(&self) -> Self {
        let r = &self.rotation;
        let rotation = [
            [r[0][0], r[1][0], r[2][0]],
            [r[0][1], r[1][1], r[2][1]],
            [r[0][2], r[1][2], r[2][2]],
        ];
        let mut inverse = Self {
            rotation,
            translation: [0.0; 3],
        };
        let t = inverse.rotate(self.translation);
        inverse.translation = [-t[0], -t[1], -t[2]];
        inverse
    }
}

/// Coordinate mapper driven by pinhole intrinsics of both cameras and the
/// depth-to-color extrinsics. Emits [`CorrespondencePoint::UNMAPPED`] for
/// pixels without a valid depth return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeMapper {
    pub depth: CameraIntrinsics,
    pub color: CameraIntrinsics,
    pub depth_to_color: Extrinsics,
}

impl PinholeMapper {
    pub fn new(depth: CameraIntrinsics, color: CameraIntrinsics, depth_to_color: Extrinsics) -> Self {
        Self {
            depth,
            color,
            depth_to_color,
        }
    }

    pub fn kinect_v2() -> Self {
        Self::new(
            CameraIntrinsics::kinect_v2_depth(),
            CameraIntrinsics::kinect_v2_color(),
            Extrinsics::kinect_v2(),
        )
    }

    fn check_depth_frame(&self, depth: &DepthFrame) -> Result<()> {
        if depth.geometry() != self.depth.geometry() {
            return Err(CaptureError::MappingFailed(format!(
                "depth frame is {}x{}, calibration expects {}x{}",
                depth.width(),
                depth.height(),
                self.depth.width,
                self.depth.height
            )));
        }
        Ok(())
    }

    /// Walks the color ray through `(u, v)` until it meets the depth surface.
    fn color_pixel_to_depth_space(
        &self,
        depth: &DepthFrame,
        color_to_depth: &Extrinsics,
        u: f32,
        v: f32,
    ) -> CorrespondencePoint {
        let ray = color_to_depth.rotate(self.color.unproject(u, v, 1.0));
        if ray[2] <= 0.0 {
            return CorrespondencePoint::UNMAPPED;
        }

        let mut z = INITIAL_DEPTH_GUESS_MM;
        for _ in 0..REFINEMENT_STEPS {
            let p = color_to_depth.apply(self.color.unproject(u, v, z));
            let Some(position) = self.depth.project(p) else {
                return CorrespondencePoint::UNMAPPED;
            };
            let Some(index) = grid_index(position, self.depth.width, self.depth.height) else {
                return CorrespondencePoint::UNMAPPED;
            };
            let measured = depth.data()[index];
            if measured == 0 {
                return CorrespondencePoint::UNMAPPED;
            }
            z = (measured as f32 - color_to_depth.translation[2]) / ray[2];
        }

        let p = color_to_depth.apply(self.color.unproject(u, v, z));
        self.depth.project(p).unwrap_or(CorrespondencePoint::UNMAPPED)
    }
}

impl CoordinateMapper for PinholeMapper {
    #[instrument(skip_all, fields(width = depth.width(), height = depth.height()))]
    fn map_depth_frame_to_color_space(&self, depth: &DepthFrame) -> Result<CorrespondenceTable> {
        self.check_depth_frame(depth)?;

        let width = self.depth.width;
        let mut points = vec![CorrespondencePoint::UNMAPPED; self.depth.geometry().pixel_count()];
        points
            .par_chunks_mut(width)
            .zip(depth.data().par_chunks(width))
            .enumerate()
            .for_each(|(v, (row, samples))| {
                for (u, (point, &d)) in row.iter_mut().zip(samples).enumerate() {
                    if d == 0 {
                        continue;
                    }
                    let p = self.depth.unproject(u as f32, v as f32, d as f32);
                    if let Some(position) = self.color.project(self.depth_to_color.apply(p)) {
                        *point = position;
                    }
                }
            });

        Ok(CorrespondenceTable::new(points))
    }

    #[instrument(skip_all, fields(width = self.color.width, height = self.color.height))]
    fn map_color_frame_to_depth_space(&self, depth: &DepthFrame) -> Result<CorrespondenceTable> {
        self.check_depth_frame(depth)?;

        let color_to_depth = self.depth_to_color.inverse();
        let width = self.color.width;
        let mut points = vec![CorrespondencePoint::UNMAPPED; self.color.geometry().pixel_count()];
        points
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(v, row)| {
                for (u, point) in row.iter_mut().enumerate() {
                    *point = self.color_pixel_to_depth_space(depth, &color_to_depth, u as f32, v as f32);
                }
            });

        Ok(CorrespondenceTable::new(points))
    }
}
