//! Menu operations wired to a vision backend.

use std::io::Write;
use std::path::PathBuf;

use fiducial_core::CameraParameters;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::capability::{
    FrameOf, MarkerCodebook, MarkerDetector, PoseEstimator, Preview, VideoDevice,
};
use crate::config::SessionConfig;
use crate::detection::{DetectionLoop, DetectionSummary, LoopSettings};
use crate::error::SessionError;
use crate::menu::Operations;
use crate::sink::{StatisticsLog, StatisticsSink};
use crate::stats::SampleCollector;

/// A configured session over backend `B`.
pub struct Session<B> {
    config: SessionConfig,
    settings: LoopSettings,
    backend: B,
    sink: Box<dyn StatisticsSink>,
}

impl<B> Session<B> {
    /// Validate `config` and resolve the detector parameters once.
    ///
    /// Statistics go to the configured log file unless replaced with
    /// [`Session::with_sink`].
    pub fn new(config: SessionConfig, backend: B) -> Result<Self, SessionError> {
        config.validate()?;
        let detector = config.resolve_detector_params()?;
        detector.validate()?;
        let settings = config.loop_settings(detector);
        let sink = Box::new(StatisticsLog::new(config.stats_log_path.clone()));
        Ok(Self {
            config,
            settings,
            backend,
            sink,
        })
    }

    pub fn with_sink(mut self, sink: impl StatisticsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Camera intrinsics, or `None` (after reporting why) when the file is
    /// missing or malformed.
    fn load_camera(&self, console: &mut dyn Write) -> Result<Option<CameraParameters>, SessionError> {
        let path = &self.config.camera_params_path;
        match CameraParameters::load(path) {
            Ok(camera) => {
                log::debug!("camera parameters loaded from {}", path.display());
                Ok(Some(camera))
            }
            Err(err) => {
                log::error!("invalid camera file: {err}");
                writeln!(console, "Invalid camera file ({err}), continuing uncalibrated")?;
                Ok(None)
            }
        }
    }
}

impl<B> Operations for Session<B>
where
    B: VideoDevice
        + MarkerCodebook
        + MarkerDetector<FrameOf<B>>
        + PoseEstimator
        + Preview<FrameOf<B>>,
{
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    fn generate_marker(&mut self, _console: &mut dyn Write) -> Result<PathBuf, SessionError> {
        let spec = self.config.marker;
        spec.validate()?;
        let image = self.backend.render_marker(&spec)?;
        let path = self.config.marker_output.clone();
        image.save(&path)?;
        log::info!(
            "wrote marker {} of {} ({} px) to {}",
            spec.marker_id,
            spec.dictionary,
            spec.side_pixels,
            path.display()
        );
        Ok(path)
    }

    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, console)))]
    fn detect(
        &mut self,
        sampling: bool,
        console: &mut dyn Write,
    ) -> Result<DetectionSummary, SessionError> {
        let camera = self.load_camera(console)?;

        let index = self.config.camera_index;
        let mut source = self.backend.open(index)?;
        log::info!("video source {index} opened");

        let mut detection = DetectionLoop::new(&mut self.backend, &self.settings, camera.as_ref());
        if sampling {
            let collector = SampleCollector::with_capacity(self.config.sample_quota);
            detection = detection.with_sampling(collector, self.sink.as_mut());
        }
        let summary = detection.run(&mut source, console);
        drop(source);
        log::info!("video source {index} released");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::LoopOutcome;
    use crate::error::VisionError;
    use crate::testing::{pose_frame, FakeBackend};
    use fiducial_aruco::MarkerSpecError;

    const CAMERA_YAML: &str = "%YAML:1.0
camera_matrix: !!opencv-matrix
   rows: 3
   cols: 3
   dt: d
   data: [ 800., 0., 320., 0., 800., 240., 0., 0., 1. ]
distortion_coefficients: !!opencv-matrix
   rows: 1
   cols: 5
   dt: d
   data: [ 0., 0., 0., 0., 0. ]
";

    fn config_in(dir: &std::path::Path) -> SessionConfig {
        SessionConfig {
            marker_output: dir.join("fiducial.png"),
            camera_params_path: dir.join("camera.yaml"),
            stats_log_path: dir.join("testData.txt"),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn generates_the_configured_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = Session::new(config_in(dir.path()), FakeBackend::default()).expect("session");

        let path = session.generate_marker(&mut Vec::new()).expect("generate");
        assert_eq!(path, dir.path().join("fiducial.png"));
        assert!(path.is_file());
        assert_eq!(session.backend().rendered[0].marker_id, 23);
    }

    #[test]
    fn rejects_marker_ids_outside_the_dictionary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config_in(dir.path());
        config.marker.marker_id = 250;
        let mut session = Session::new(config, FakeBackend::default()).expect("session");

        let err = session.generate_marker(&mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Marker(MarkerSpecError::IdOutOfRange { id: 250, .. })
        ));
        assert!(session.backend().rendered.is_empty());
    }

    #[test]
    fn missing_camera_file_falls_back_to_uncalibrated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FakeBackend {
            script: Some(vec![pose_frame(&[(1, 0.0)])]),
            ..FakeBackend::default()
        };
        let mut session = Session::new(config_in(dir.path()), backend).expect("session");
        let mut console = Vec::new();

        let summary = session.detect(false, &mut console).expect("detect");
        assert_eq!(summary.outcome, LoopOutcome::SourceEnded);
        assert_eq!(session.backend().focal_lengths, vec![640.0]);
        let text = String::from_utf8(console).expect("utf8");
        assert!(text.contains("Invalid camera file"), "{text}");
    }

    #[test]
    fn uses_the_camera_file_when_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("camera.yaml"), CAMERA_YAML).expect("write");
        let backend = FakeBackend {
            script: Some(vec![pose_frame(&[(1, 0.0)])]),
            ..FakeBackend::default()
        };
        let mut session = Session::new(config_in(dir.path()), backend).expect("session");
        let mut console = Vec::new();

        session.detect(false, &mut console).expect("detect");
        assert_eq!(session.backend().focal_lengths, vec![800.0]);
        assert!(!String::from_utf8(console).expect("utf8").contains("Invalid camera file"));
    }

    #[test]
    fn open_failure_aborts_the_operation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = FakeBackend {
            script: None,
            ..FakeBackend::default()
        };
        let mut session = Session::new(config_in(dir.path()), backend).expect("session");

        let err = session.detect(true, &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Vision(VisionError::SourceUnavailable { index: 0 })
        ));
        assert_eq!(session.backend().opened, vec![0]);
        assert_eq!(session.backend().detect_calls, 0);
    }

    #[test]
    fn source_is_released_on_every_exit_path() {
        let dir = tempfile::tempdir().expect("tempdir");

        // Source ends.
        let mut session =
            Session::new(config_in(dir.path()), FakeBackend::default()).expect("session");
        session.detect(false, &mut Vec::new()).expect("detect");
        assert_eq!(session.backend().released.get(), 1);

        // Cancelled.
        let backend = FakeBackend {
            script: Some(vec![pose_frame(&[]); 3]),
            keys: vec![Some(27)].into(),
            ..FakeBackend::default()
        };
        let mut session = Session::new(config_in(dir.path()), backend).expect("session");
        let summary = session.detect(false, &mut Vec::new()).expect("detect");
        assert_eq!(summary.outcome, LoopOutcome::Cancelled);
        assert_eq!(session.backend().released.get(), 1);

        // Backend error mid-run.
        let backend = FakeBackend {
            script: Some(vec![pose_frame(&[]); 3]),
            fail_detection_on: Some(2),
            ..FakeBackend::default()
        };
        let mut session = Session::new(config_in(dir.path()), backend).expect("session");
        session.detect(false, &mut Vec::new()).unwrap_err();
        assert_eq!(session.backend().released.get(), 1);
    }

    #[test]
    fn sampling_appends_one_line_per_completed_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config_in(dir.path());
        config.sample_quota = 2;

        for _ in 0..2 {
            let backend = FakeBackend {
                script: Some(vec![pose_frame(&[(1, 0.0), (2, 0.0)]), pose_frame(&[(1, 1.0)])]),
                ..FakeBackend::default()
            };
            let mut session = Session::new(config.clone(), backend).expect("session");
            let mut console = Vec::new();
            let summary = session.detect(true, &mut console).expect("detect");
            assert_eq!(summary.frames, 1);
            assert!(String::from_utf8(console)
                .expect("utf8")
                .contains("mean: 0  std dev: 0"));
        }

        let log = std::fs::read_to_string(dir.path().join("testData.txt")).expect("log");
        assert_eq!(log, "mean: 0  std dev: 0\nmean: 0  std dev: 0\n");
    }

    #[test]
    fn detect_only_never_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = config_in(dir.path());
        config.sample_quota = 1;
        let backend = FakeBackend {
            script: Some(vec![pose_frame(&[(1, 0.0)]); 4]),
            ..FakeBackend::default()
        };
        let mut session = Session::new(config, backend).expect("session");

        let summary = session.detect(false, &mut Vec::new()).expect("detect");
        assert_eq!(summary.outcome, LoopOutcome::SourceEnded);
        assert_eq!(summary.frames, 4);
        assert!(!dir.path().join("testData.txt").exists());
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = SessionConfig {
            sample_quota: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            Session::new(config, FakeBackend::default()),
            Err(SessionError::Config(_))
        ));
    }
}
