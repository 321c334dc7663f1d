//! Sensor collaborator module
//!
//! The capture cycle only talks to the device through the traits in
//! [`session`]. A deterministic synthetic device and a calibration-driven
//! coordinate mapper stand in for vendor hardware.

mod session;
mod calibration;
mod synthetic;


pub use session::{
    ColorSource,
    CoordinateMapper,
    DepthSource,
    SensorDevice,
    SensorSession,
    SessionInfo,
};
pub use calibration::{CameraIntrinsics, Extrinsics, PinholeMapper};
pub use synthetic::SyntheticSensor;
