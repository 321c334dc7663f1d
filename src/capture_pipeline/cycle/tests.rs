#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::capture_pipeline::alignment::{
        AlignmentDirection, CorrespondencePoint, CorrespondenceTable, ResampleStrategy,
    };
    use crate::capture_pipeline::common::error::{CaptureError, Result};
    use crate::capture_pipeline::cycle::{CaptureConfig, CaptureCycle};
    use crate::capture_pipeline::frames::{
        ColorFrame, DepthFrame, FrameGeometry, FrameImage, Modality, PixelFormat,
    };
    use crate::capture_pipeline::sensor::{
        ColorSource, CoordinateMapper, DepthSource, SensorSession, SessionInfo,
    };
    use crate::capture_pipeline::sink::{ImageFormat, ImageWriter, TiffCompression};

    #[derive(Default)]
    struct DeviceLog {
        closed: bool,
        mapper_calls: Vec<&'static str>,
    }

    struct MockDevice {
        available: bool,
        report_open: bool,
        open: bool,
        color_frames: VecDeque<Option<ColorFrame>>,
        depth_frames: VecDeque<Option<DepthFrame>>,
        depth_to_color: Option<Vec<(f32, f32)>>,
        color_to_depth: Option<Vec<(f32, f32)>>,
        log: Arc<Mutex<DeviceLog>>,
    }

    impl MockDevice {
        fn new() -> Self {
            Self {
                available: true,
                report_open: true,
                open: false,
                color_frames: VecDeque::from(vec![Some(color_frame())]),
                depth_frames: VecDeque::from(vec![Some(depth_frame())]),
                depth_to_color: Some(vec![(1.0, 1.0), (0.0, 0.0)]),
                color_to_depth: Some(vec![(1.0, 0.0), (9.0, 9.0), (0.0, 0.0), (f32::NAN, 0.0)]),
                log: Arc::new(Mutex::new(DeviceLog::default())),
            }
        }
    }

    fn table(points: &Option<Vec<(f32, f32)>>) -> Result<CorrespondenceTable> {
        points
            .as_ref()
            .map(|points| points.iter().copied().map(CorrespondencePoint::from).collect())
            .ok_or_else(|| CaptureError::MappingFailed("Mock mapping error".to_string()))
    }

    impl SensorSession for MockDevice {
        fn open(&mut self) -> Result<SessionInfo> {
            if !self.available {
                return Err(CaptureError::DeviceUnavailable("Mock device missing".to_string()));
            }
            self.open = self.report_open;
            Ok(SessionInfo {
                color: FrameGeometry::new(2, 2),
                depth: FrameGeometry::new(2, 1),
            })
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn close(&mut self) {
            self.open = false;
            self.log.lock().unwrap().closed = true;
        }
    }

    impl ColorSource for MockDevice {
        fn try_acquire_latest_color(&mut self) -> Result<Option<ColorFrame>> {
            Ok(self.color_frames.pop_front().flatten())
        }
    }

    impl DepthSource for MockDevice {
        fn try_acquire_latest_depth(&mut self) -> Result<Option<DepthFrame>> {
            Ok(self.depth_frames.pop_front().flatten())
        }
    }

    impl CoordinateMapper for MockDevice {
        fn map_depth_frame_to_color_space(&self, _depth: &DepthFrame) -> Result<CorrespondenceTable> {
            self.log.lock().unwrap().mapper_calls.push("depth_to_color");
            table(&self.depth_to_color)
        }

        fn map_color_frame_to_depth_space(&self, _depth: &DepthFrame) -> Result<CorrespondenceTable> {
            self.log.lock().unwrap().mapper_calls.push("color_to_depth");
            table(&self.color_to_depth)
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct WrittenImage {
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    }

    struct MockWriter {
        should_fail: bool,
        written_data: Arc<Mutex<Vec<WrittenImage>>>,
    }

    impl ImageWriter for MockWriter {
        fn extension(&self) -> &'static str {
            "raw"
        }

        fn write_image(&self, image: &FrameImage<'_>, output: &mut dyn Write) -> Result<()> {
            if self.should_fail {
                return Err(CaptureError::EncodeError("Mock encode error".to_string()));
            }
            output.write_all(image.data)?;
            self.written_data.lock().unwrap().push(WrittenImage {
                width: image.width,
                height: image.height,
                format: image.format,
                data: image.data.to_vec(),
            });
            Ok(())
        }
    }

    fn color_frame() -> ColorFrame {
        ColorFrame::new(2, 2, [[1u8; 4], [2; 4], [3; 4], [4; 4]].concat()).unwrap()
    }

    fn depth_frame() -> DepthFrame {
        DepthFrame::new(2, 1, vec![100, 200]).unwrap()
    }

    fn gray16(samples: &[u16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_ne_bytes()).collect()
    }

    fn config(dir: &Path, direction: AlignmentDirection, strategy: ResampleStrategy) -> CaptureConfig {
        CaptureConfig::builder()
            .direction(direction)
            .strategy(strategy)
            .output_dir(dir)
            .warmup(Duration::ZERO)
            .build()
    }

    fn writer(should_fail: bool) -> (MockWriter, Arc<Mutex<Vec<WrittenImage>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = MockWriter {
            should_fail,
            written_data: written.clone(),
        };
        (writer, written)
    }

    #[test]
    fn test_config_builder() {
        let config = CaptureConfig::builder()
            .direction(AlignmentDirection::ColorOntoDepth)
            .strategy(ResampleStrategy::Gather)
            .image_format(ImageFormat::Tiff)
            .tiff_compression(TiffCompression::DeflateBest)
            .tiff_predictor(Some(2))
            .max_cycles(Some(10))
            .validate_dimensions(false)
            .build();

        assert_eq!(config.direction, AlignmentDirection::ColorOntoDepth);
        assert_eq!(config.strategy, ResampleStrategy::Gather);
        assert_eq!(config.image_format, ImageFormat::Tiff);
        assert_eq!(config.tiff_compression, TiffCompression::DeflateBest);
        assert_eq!(config.tiff_predictor, Some(2));
        assert_eq!(config.max_cycles, Some(10));
        assert!(!config.validate_dimensions);
        assert_eq!(config.writer().extension(), "tiff");
    }

    #[test]
    fn test_config_defaults() {
        let config = CaptureConfig::default();

        assert_eq!(config.direction, AlignmentDirection::DepthOntoColor);
        assert_eq!(config.strategy, ResampleStrategy::Scatter);
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.warmup, Duration::from_secs(2));
        assert_eq!(config.max_cycles, None);
        assert!(config.validate_dimensions);
        assert_eq!(config.writer().extension(), "png");
    }

    #[test]
    fn test_missing_device_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new();
        device.available = false;
        let (writer, _) = writer(false);

        let result = CaptureCycle::with_custom(
            device,
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        );

        assert!(matches!(result.err(), Some(CaptureError::DeviceUnavailable(_))));
    }

    #[test]
    fn test_device_closed_after_open_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new();
        device.report_open = false;
        let log = device.log.clone();
        let (writer, _) = writer(false);

        let result = CaptureCycle::with_custom(
            device,
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        );

        assert!(matches!(result.err(), Some(CaptureError::DeviceUnavailable(_))));
        assert!(log.lock().unwrap().closed);
    }

    #[test]
    fn test_depth_onto_color_saves_raw_color_and_aligned_depth() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();

        let report = cycle.run_cycle().unwrap();

        assert_eq!(report.cycle, 1);
        assert!(report.color_refreshed && report.depth_refreshed);
        assert_eq!(report.aligned_pixels, 2);
        assert_eq!(
            report.saved,
            vec![dir.path().join("color0.raw"), dir.path().join("depth0.raw")]
        );

        let written = written.lock().unwrap();
        assert_eq!(
            written[0],
            WrittenImage {
                width: 2,
                height: 2,
                format: PixelFormat::Bgra8,
                data: color_frame().data().to_vec(),
            }
        );
        assert_eq!(
            written[1],
            WrittenImage {
                width: 2,
                height: 2,
                format: PixelFormat::Gray16,
                data: gray16(&[200, 0, 0, 100]),
            }
        );
        assert_eq!(cycle.device().log.lock().unwrap().mapper_calls, vec!["depth_to_color"]);
    }

    #[test]
    fn test_color_onto_depth_saves_aligned_color_and_raw_depth() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::ColorOntoDepth, ResampleStrategy::Scatter),
        )
        .unwrap();

        cycle.run_cycle().unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written[0].format, PixelFormat::Bgra8);
        assert_eq!((written[0].width, written[0].height), (2, 1));
        assert_eq!(written[0].data, [[3u8; 4], [1; 4]].concat());
        assert_eq!(written[1].format, PixelFormat::Gray16);
        assert_eq!(written[1].data, gray16(&[100, 200]));
        assert_eq!(cycle.device().log.lock().unwrap().mapper_calls, vec!["color_to_depth"]);
    }

    #[test]
    fn test_gather_uses_target_keyed_table() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Gather),
        )
        .unwrap();

        cycle.run_cycle().unwrap();

        let written = written.lock().unwrap();
        assert_eq!(written[1].data, gray16(&[200, 0, 100, 0]));
        assert_eq!(cycle.device().log.lock().unwrap().mapper_calls, vec!["color_to_depth"]);
    }

    #[test]
    fn test_color_onto_depth_gather_uses_depth_keyed_table() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::ColorOntoDepth, ResampleStrategy::Gather),
        )
        .unwrap();

        cycle.run_cycle().unwrap();

        let written = written.lock().unwrap();
        assert_eq!((written[0].width, written[0].height), (2, 1));
        assert_eq!(written[0].format, PixelFormat::Bgra8);
        assert_eq!(written[0].data, [[4u8; 4], [1; 4]].concat());
        assert_eq!(written[1].data, gray16(&[100, 200]));
        assert_eq!(cycle.device().log.lock().unwrap().mapper_calls, vec!["depth_to_color"]);
    }

    #[test]
    fn test_default_cycle_writes_synthetic_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let config = CaptureConfig::builder()
            .output_dir(dir.path())
            .warmup(Duration::ZERO)
            .max_cycles(Some(1))
            .build();
        let mut cycle = CaptureCycle::new(config).unwrap();
        let session = cycle.session();
        assert_eq!((session.color.width, session.color.height), (1920, 1080));
        assert_eq!((session.depth.width, session.depth.height), (512, 424));

        let summary = cycle.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.failed_cycles, 0);
        assert_eq!(summary.files_written, 2);
        assert_eq!(cycle.color().geometry(), session.color);
        let color = image::open(dir.path().join("color0.png")).unwrap().to_rgba8();
        assert_eq!(color.dimensions(), (1920, 1080));
        let depth = image::open(dir.path().join("depth0.png")).unwrap().to_luma16();
        assert_eq!(depth.dimensions(), (1920, 1080));
        assert!(depth.pixels().any(|p| p.0[0] > 0));
    }

    #[test]
    fn test_acquisition_miss_keeps_previous_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();

        cycle.run_cycle().unwrap();
        let second = cycle.run_cycle().unwrap();

        assert!(!second.color_refreshed);
        assert!(!second.depth_refreshed);
        assert_eq!(second.cycle, 2);
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 4);
        assert_eq!(written[0], written[2]);
        assert_eq!(written[1], written[3]);
        assert!(dir.path().join("color1.raw").exists());
    }

    #[test]
    fn test_precondition_violation_skips_cycle_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new();
        device.depth_to_color = Some(vec![(0.0, 0.0)]);
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            device,
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();

        let result = cycle.run_cycle();

        assert!(matches!(
            result.unwrap_err(),
            CaptureError::PreconditionViolation { expected: 2, actual: 1 }
        ));
        assert!(written.lock().unwrap().is_empty());
        assert_eq!(cycle.sink().next_index(Modality::Color), 0);
        assert_eq!(cycle.sink().next_index(Modality::Depth), 0);
    }

    #[test]
    fn test_write_failures_are_reported_and_counters_advance() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, _) = writer(true);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();

        let report = cycle.run_cycle().unwrap();

        assert!(report.saved.is_empty());
        assert_eq!(report.write_failures, 2);
        assert_eq!(cycle.sink().next_index(Modality::Color), 1);
        assert_eq!(cycle.sink().next_index(Modality::Depth), 1);
    }

    #[test]
    fn test_foreign_resolution_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new();
        device.depth_frames = VecDeque::from(vec![Some(DepthFrame::new(3, 1, vec![1, 2, 3]).unwrap())]);
        let (writer, _) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            device,
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();

        let result = cycle.run_cycle();

        assert!(matches!(result.unwrap_err(), CaptureError::InvalidDimensions(3, 1)));
        assert_eq!(cycle.depth().data(), &[0, 0]);
    }

    #[test]
    fn test_run_stops_after_max_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let config = CaptureConfig::builder()
            .output_dir(dir.path())
            .warmup(Duration::ZERO)
            .max_cycles(Some(3))
            .build();
        let mut cycle = CaptureCycle::with_custom(MockDevice::new(), writer, config).unwrap();

        let summary = cycle.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.failed_cycles, 0);
        assert_eq!(summary.files_written, 6);
        assert_eq!(written.lock().unwrap().len(), 6);
        assert!(dir.path().join("depth2.raw").exists());
    }

    #[test]
    fn test_run_survives_failing_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let mut device = MockDevice::new();
        device.depth_to_color = None;
        let (writer, _) = writer(false);
        let config = CaptureConfig::builder()
            .output_dir(dir.path())
            .warmup(Duration::ZERO)
            .max_cycles(Some(2))
            .build();
        let mut cycle = CaptureCycle::with_custom(device, writer, config).unwrap();

        let summary = cycle.run(&AtomicBool::new(false)).unwrap();

        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.failed_cycles, 2);
        assert_eq!(summary.files_written, 0);
    }

    #[test]
    fn test_run_honours_stop_flag() {
        let dir = tempfile::tempdir().unwrap();
        let (writer, written) = writer(false);
        let mut cycle = CaptureCycle::with_custom(
            MockDevice::new(),
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();

        let summary = cycle.run(&AtomicBool::new(true)).unwrap();

        assert_eq!(summary.cycles, 0);
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_drop_closes_session() {
        let dir = tempfile::tempdir().unwrap();
        let device = MockDevice::new();
        let log = device.log.clone();
        let (writer, _) = writer(false);
        let cycle = CaptureCycle::with_custom(
            device,
            writer,
            config(dir.path(), AlignmentDirection::DepthOntoColor, ResampleStrategy::Scatter),
        )
        .unwrap();
        assert!(!log.lock().unwrap().closed);

        drop(cycle);

        assert!(log.lock().unwrap().closed);
    }
}
