//! Per-frame detection loop.
//!
//! Each iteration grabs a frame, detects markers, estimates their poses,
//! prints one reading per marker, optionally feeds the sample window, and
//! shows the annotated preview. The loop stops when the source runs dry,
//! when the sample window completes, or when the cancel key is pressed,
//! checked in that order.

use std::borrow::Cow;
use std::fmt;
use std::io::Write;
use std::time::Duration;

use fiducial_aruco::{DetectorParams, PredefinedDictionary};
use fiducial_core::{CameraParameters, MarkerPose, RotationComponent};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::capability::{Annotations, Frame, MarkerDetector, PoseEstimator, Preview, VideoSource};
use crate::error::SessionError;
use crate::sink::StatisticsSink;
use crate::stats::{SampleCollector, Statistics};

/// Fixed inputs of one detection run.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopSettings {
    pub dictionary: PredefinedDictionary,
    pub detector: DetectorParams,
    pub marker_length: f64,
    pub axis_length: f64,
    pub tracked: RotationComponent,
    pub key_wait: Duration,
    /// Compared against the low byte of the pressed key code.
    pub cancel_key: i32,
}

/// Why a detection run ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LoopOutcome {
    SourceEnded,
    SamplingComplete(Statistics),
    Cancelled,
}

/// Result of a detection run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionSummary {
    pub outcome: LoopOutcome,
    pub frames: usize,
    /// Marker poses seen across all frames.
    pub observations: usize,
}

impl fmt::Display for DetectionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            LoopOutcome::SourceEnded => f.write_str("video source ended")?,
            LoopOutcome::Cancelled => f.write_str("detection cancelled")?,
            LoopOutcome::SamplingComplete(stats) => write!(f, "sampling complete ({stats})")?,
        }
        write!(
            f,
            " after {} frames, {} marker observations",
            self.frames, self.observations
        )
    }
}

struct Sampling<'a> {
    collector: SampleCollector,
    sink: &'a mut dyn StatisticsSink,
}

/// One detection run over a borrowed backend.
pub struct DetectionLoop<'a, B> {
    backend: &'a mut B,
    settings: &'a LoopSettings,
    camera: Option<&'a CameraParameters>,
    sampling: Option<Sampling<'a>>,
}

impl<'a, B> DetectionLoop<'a, B> {
    /// Without `camera`, poses are solved with rough intrinsics derived from
    /// each frame's size.
    pub fn new(
        backend: &'a mut B,
        settings: &'a LoopSettings,
        camera: Option<&'a CameraParameters>,
    ) -> Self {
        Self {
            backend,
            settings,
            camera,
            sampling: None,
        }
    }

    /// Feed the tracked angle of every pose into `collector`; when it
    /// completes, its statistics go to `sink` and the run ends.
    pub fn with_sampling(
        mut self,
        collector: SampleCollector,
        sink: &'a mut dyn StatisticsSink,
    ) -> Self {
        self.sampling = Some(Sampling { collector, sink });
        self
    }

    /// Run until one of the stop conditions holds. The source is only
    /// borrowed; the caller releases it.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run<S, W>(mut self, source: &mut S, console: &mut W) -> Result<DetectionSummary, SessionError>
    where
        S: VideoSource,
        B: MarkerDetector<S::Frame> + PoseEstimator + Preview<S::Frame>,
        W: Write + ?Sized,
    {
        let settings = self.settings;
        let mut frames = 0usize;
        let mut observations = 0usize;

        let outcome = loop {
            let Some(frame) = source.next_frame()? else {
                log::info!("video source exhausted");
                break LoopOutcome::SourceEnded;
            };
            frames += 1;

            let detections =
                self.backend
                    .detect_markers(&frame, settings.dictionary, &settings.detector)?;

            let camera = match self.camera {
                Some(camera) => Cow::Borrowed(camera),
                None => {
                    let (w, h) = frame.size();
                    Cow::Owned(CameraParameters::uncalibrated(w, h))
                }
            };

            let poses = if detections.is_empty() {
                Vec::new()
            } else {
                self.backend
                    .estimate_poses(&detections.markers, settings.marker_length, &camera)?
            };

            for pose in &poses {
                observations += 1;
                write_reading(console, pose, settings.tracked)?;
                if let Some(sampling) = self.sampling.as_mut() {
                    sampling.collector.record(pose.angle_degrees(settings.tracked));
                }
            }

            self.backend.show(
                &frame,
                &Annotations {
                    detections: &detections,
                    poses: &poses,
                    camera: &camera,
                    axis_length: settings.axis_length,
                },
            )?;

            if let Some(Sampling { collector, sink }) =
                self.sampling.take_if(|s| s.collector.is_complete())
            {
                let stats = collector.finish(sink)?;
                writeln!(console, "{stats}")?;
                log::info!("sample window complete: {stats}");
                break LoopOutcome::SamplingComplete(stats);
            }

            if let Some(key) = self.backend.wait_key(settings.key_wait)? {
                if key & 0xff == settings.cancel_key {
                    log::info!("cancel key pressed");
                    break LoopOutcome::Cancelled;
                }
            }
        };

        log::debug!("detection stopped after {frames} frames ({observations} observations)");
        Ok(DetectionSummary {
            outcome,
            frames,
            observations,
        })
    }
}

fn write_reading<W: Write + ?Sized>(
    console: &mut W,
    pose: &MarkerPose,
    tracked: RotationComponent,
) -> std::io::Result<()> {
    let deg = pose.rvec_degrees();
    writeln!(
        console,
        "marker {:>4}  {}: {:>9.3}  (x: {:>9.3}  y: {:>9.3}  z: {:>9.3} deg)",
        pose.id,
        tracked.label(),
        deg[tracked.index()],
        deg.x,
        deg.y,
        deg.z
    )
}
