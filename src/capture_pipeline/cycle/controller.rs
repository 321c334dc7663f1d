use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, instrument, trace, warn};

use crate::capture_pipeline::{
    alignment::{align, align_gather, AlignedFrame, AlignmentDirection, ResampleStrategy},
    common::error::{CaptureError, Result},
    cycle::types::{CaptureConfig, CycleReport, RunSummary},
    frames::{ColorFrame, DepthFrame, FrameGeometry, Modality},
    sensor::{SensorDevice, SessionInfo, SyntheticSensor},
    sink::{FrameSink, ImageWriter},
};

/// Owns the sensor session, the current color/depth buffers and the sink.
///
/// Acquired frames replace the held buffers wholesale; the alignment engine
/// only ever sees them through read-only views.
pub struct CaptureCycle<D: SensorDevice, W: ImageWriter> {
    device: D,
    sink: FrameSink<W>,
    config: CaptureConfig,
    session: SessionInfo,
    color: ColorFrame,
    depth: DepthFrame,
    cycles: u64,
}

impl CaptureCycle<SyntheticSensor, Box<dyn ImageWriter>> {
    /// Synthetic Kinect-v2-shaped sensor with the writer chosen by `config`.
    pub fn new(config: CaptureConfig) -> Result<Self> {
        let writer = config.writer();
        Self::with_custom(SyntheticSensor::default(), writer, config)
    }
}

impl<D: SensorDevice, W: ImageWriter> CaptureCycle<D, W> {
    /// Opens `device` and prepares zero-filled buffers of its resolution.
    ///
    /// Fails with [`CaptureError::DeviceUnavailable`] when the session cannot
    /// be opened or reports itself closed right after opening.
    pub fn with_custom(mut device: D, writer: W, config: CaptureConfig) -> Result<Self> {
        let sink = FrameSink::new(writer, &config.output_dir)?;

        let session = device.open()?;
        if !device.is_open() {
            device.close();
            return Err(CaptureError::DeviceUnavailable(
                "sensor reported closed after open".to_string(),
            ));
        }

        let buffers = ColorFrame::blank(session.color)
            .and_then(|color| Ok((color, DepthFrame::blank(session.depth)?)));
        let (color, depth) = match buffers {
            Ok(buffers) => buffers,
            Err(e) => {
                device.close();
                return Err(e);
            }
        };

        info!(
            direction = ?config.direction,
            strategy = ?config.strategy,
            output_dir = %config.output_dir.display(),
            "Capture session ready"
        );

        if !config.warmup.is_zero() {
            info!("Waiting {:?} for the sensor to start streaming", config.warmup);
            std::thread::sleep(config.warmup);
        }

        Ok(Self {
            device,
            sink,
            config,
            session,
            color,
            depth,
            cycles: 0,
        })
    }

    fn check_geometry(&self, modality: Modality, actual: FrameGeometry) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }
        let expected = match modality {
            Modality::Color => self.session.color,
            Modality::Depth => self.session.depth,
        };
        if actual != expected {
            warn!(
                ?modality,
                "Frame is {}x{}, session is {}x{}",
                actual.width,
                actual.height,
                expected.width,
                expected.height
            );
            return Err(CaptureError::InvalidDimensions(actual.width, actual.height));
        }
        Ok(())
    }

    fn update_color(&mut self) -> Result<bool> {
        let _span = tracing::info_span!("acquire_color").entered();
        match self.device.try_acquire_latest_color()? {
            Some(frame) => {
                self.check_geometry(Modality::Color, frame.geometry())?;
                self.color = frame;
                Ok(true)
            }
            None => {
                trace!("No new color frame, keeping previous buffer");
                Ok(false)
            }
        }
    }

    fn update_depth(&mut self) -> Result<bool> {
        let _span = tracing::info_span!("acquire_depth").entered();
        match self.device.try_acquire_latest_depth()? {
            Some(frame) => {
                self.check_geometry(Modality::Depth, frame.geometry())?;
                self.depth = frame;
                Ok(true)
            }
            None => {
                trace!("No new depth frame, keeping previous buffer");
                Ok(false)
            }
        }
    }

    /// Builds this cycle's correspondence table and resamples the source
    /// modality onto the target grid.
    fn align_frames(&self) -> Result<AlignedFrame> {
        let direction = self.config.direction;
        let strategy = self.config.strategy;

        let table = {
            let _span = tracing::info_span!("map_coordinates").entered();
            match (direction, strategy) {
                (AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter)
                | (AlignmentDirection::ColorOntoDepth, ResampleStrategy::Gather) => {
                    self.device.map_depth_frame_to_color_space(&self.depth)?
                }
                (AlignmentDirection::ColorOntoDepth, ResampleStrategy::Scatter)
                | (AlignmentDirection::DepthOntoColor, ResampleStrategy::Gather) => {
                    self.device.map_color_frame_to_depth_space(&self.depth)?
                }
            }
        };

        let (source, target) = match direction {
            AlignmentDirection::DepthOntoColor => (self.depth.as_grid(), self.color.geometry()),
            AlignmentDirection::ColorOntoDepth => (self.color.as_grid(), self.depth.geometry()),
        };

        let _span = tracing::info_span!("resample").entered();
        match strategy {
            ResampleStrategy::Scatter => align(source, &table, target.width, target.height),
            ResampleStrategy::Gather => align_gather(source, &table, target.width, target.height),
        }
    }

    /// Runs one acquire -> align -> save iteration.
    ///
    /// Acquisition misses keep the previous buffers. Mapping, alignment and
    /// acquisition errors abort the cycle before anything is written. Write
    /// failures are counted in the report and do not fail the cycle.
    #[instrument(skip(self), fields(cycle = self.cycles + 1))]
    pub fn run_cycle(&mut self) -> Result<CycleReport> {
        self.cycles += 1;

        let color_refreshed = self.update_color()?;
        let depth_refreshed = self.update_depth()?;
        let aligned = self.align_frames()?;

        let mut report = CycleReport {
            cycle: self.cycles,
            color_refreshed,
            depth_refreshed,
            aligned_pixels: aligned.filled_pixel_count(),
            ..CycleReport::default()
        };

        let _span = tracing::info_span!("save").entered();
        let aligned_image = aligned.as_image();
        let (color_image, depth_image) = match self.config.direction {
            AlignmentDirection::DepthOntoColor => (self.color.as_image(), aligned_image),
            AlignmentDirection::ColorOntoDepth => (aligned_image, self.depth.as_image()),
        };
        for (modality, image) in [(Modality::Color, color_image), (Modality::Depth, depth_image)] {
            match self.sink.save(modality, &image) {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    warn!(?modality, error = %e, "Failed to save frame");
                    report.write_failures += 1;
                }
            }
        }

        debug!(
            aligned_pixels = report.aligned_pixels,
            saved = report.saved.len(),
            "Cycle complete"
        );
        Ok(report)
    }

    /// Repeats [`run_cycle`](Self::run_cycle) until `stop` is raised or
    /// `max_cycles` is reached. Per-cycle errors are logged and skipped.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        loop {
            if stop.load(Ordering::Relaxed) {
                info!("Stop requested");
                break;
            }
            if let Some(max) = self.config.max_cycles {
                if summary.cycles >= max {
                    break;
                }
            }

            match self.run_cycle() {
                Ok(report) => {
                    summary.files_written += report.saved.len() as u64;
                    summary.write_failures += report.write_failures as u64;
                }
                Err(e) if e.is_per_cycle() => {
                    warn!(error = %e, "Cycle skipped");
                    summary.failed_cycles += 1;
                }
                Err(e) => return Err(e),
            }
            summary.cycles += 1;
        }

        info!(
            cycles = summary.cycles,
            failed_cycles = summary.failed_cycles,
            files_written = summary.files_written,
            write_failures = summary.write_failures,
            "Capture finished"
        );
        Ok(summary)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn session(&self) -> SessionInfo {
        self.session
    }

    pub fn sink(&self) -> &FrameSink<W> {
        &self.sink
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn color(&self) -> &ColorFrame {
        &self.color
    }

    pub fn depth(&self) -> &DepthFrame {
        &self.depth
    }
}

impl<D: SensorDevice, W: ImageWriter> Drop for CaptureCycle<D, W> {
    fn drop(&mut self) {
        self.device.close();
    }
}
