//! Capture cycle module
//!
//! Orchestrates acquire -> map -> align -> save iterations against one sensor.

mod controller;
pub mod types;

#[cfg(test)]
mod tests;

pub use controller::CaptureCycle;
pub use types::{CaptureConfig, CaptureConfigBuilder, CycleReport, RunSummary};
