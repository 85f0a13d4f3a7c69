//! Scripted backend used by the unit tests.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use fiducial_aruco::{DetectorParams, MarkerSpec, PredefinedDictionary};
use fiducial_core::{CameraParameters, DetectedMarker, GrayImage, MarkerDetections, MarkerPose};
use nalgebra::{Point2, Vector3};

use crate::capability::{
    Annotations, Frame, MarkerCodebook, MarkerDetector, PoseEstimator, Preview, VideoDevice,
    VideoSource,
};
use crate::error::VisionError;

/// A 640x480 frame carrying the markers it "shows" as `(id, angle_radians)`.
#[derive(Clone, Debug)]
pub struct FakeFrame {
    markers: Vec<(i32, f64)>,
}

impl Frame for FakeFrame {
    fn size(&self) -> (u32, u32) {
        (640, 480)
    }
}

pub fn pose_frame(markers: &[(i32, f64)]) -> FakeFrame {
    FakeFrame {
        markers: markers.to_vec(),
    }
}

pub struct FakeSource {
    frames: VecDeque<FakeFrame>,
    released: Rc<Cell<usize>>,
}

impl FakeSource {
    pub fn new(frames: Vec<FakeFrame>) -> Self {
        Self {
            frames: frames.into(),
            released: Rc::default(),
        }
    }
}

impl VideoSource for FakeSource {
    type Frame = FakeFrame;

    fn next_frame(&mut self) -> Result<Option<FakeFrame>, VisionError> {
        Ok(self.frames.pop_front())
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

pub struct FakeBackend {
    /// Served by the next `open`; `None` makes `open` fail.
    pub script: Option<Vec<FakeFrame>>,
    pub opened: Vec<i32>,
    pub released: Rc<Cell<usize>>,
    pub keys: VecDeque<Option<i32>>,
    /// Which rvec component carries each marker's angle.
    pub rvec_axis: usize,
    pub fail_detection_on: Option<usize>,
    pub detect_calls: usize,
    pub pose_calls: usize,
    pub shown: usize,
    pub focal_lengths: Vec<f64>,
    pub rendered: Vec<MarkerSpec>,
    pub(crate) pending: Vec<f64>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            script: Some(Vec::new()),
            opened: Vec::new(),
            released: Rc::default(),
            keys: VecDeque::new(),
            rvec_axis: 2,
            fail_detection_on: None,
            detect_calls: 0,
            pose_calls: 0,
            shown: 0,
            focal_lengths: Vec::new(),
            rendered: Vec::new(),
            pending: Vec::new(),
        }
    }
}

impl VideoDevice for FakeBackend {
    type Source = FakeSource;

    fn open(&mut self, index: i32) -> Result<FakeSource, VisionError> {
        self.opened.push(index);
        let frames = self
            .script
            .take()
            .ok_or(VisionError::SourceUnavailable { index })?;
        Ok(FakeSource {
            frames: frames.into(),
            released: Rc::clone(&self.released),
        })
    }
}

impl MarkerCodebook for FakeBackend {
    fn render_marker(&mut self, spec: &MarkerSpec) -> Result<GrayImage, VisionError> {
        self.rendered.push(*spec);
        let side = spec.side_pixels as usize;
        Ok(GrayImage::filled(side, side, 0))
    }
}

impl MarkerDetector<FakeFrame> for FakeBackend {
    fn detect_markers(
        &mut self,
        frame: &FakeFrame,
        _dictionary: PredefinedDictionary,
        _params: &DetectorParams,
    ) -> Result<MarkerDetections, VisionError> {
        self.detect_calls += 1;
        if self.fail_detection_on == Some(self.detect_calls) {
            return Err(VisionError::backend("detect markers", "scripted failure"));
        }
        self.pending = frame.markers.iter().map(|&(_, angle)| angle).collect();
        let markers = frame
            .markers
            .iter()
            .map(|&(id, _)| DetectedMarker {
                id,
                corners: [Point2::origin(); 4],
            })
            .collect();
        Ok(MarkerDetections {
            markers,
            rejected: Vec::new(),
        })
    }
}

impl PoseEstimator for FakeBackend {
    fn estimate_poses(
        &mut self,
        markers: &[DetectedMarker],
        _marker_length: f64,
        camera: &CameraParameters,
    ) -> Result<Vec<MarkerPose>, VisionError> {
        self.pose_calls += 1;
        self.focal_lengths.push(camera.fx());
        Ok(markers
            .iter()
            .zip(&self.pending)
            .map(|(m, &angle)| {
                let mut rvec = Vector3::zeros();
                rvec[self.rvec_axis] = angle;
                MarkerPose {
                    id: m.id,
                    rvec,
                    tvec: Vector3::new(0.0, 0.0, 1.0),
                }
            })
            .collect())
    }
}

impl Preview<FakeFrame> for FakeBackend {
    fn show(&mut self, _frame: &FakeFrame, _annotations: &Annotations<'_>) -> Result<(), VisionError> {
        self.shown += 1;
        Ok(())
    }

    fn wait_key(&mut self, _timeout: Duration) -> Result<Option<i32>, VisionError> {
        Ok(self.keys.pop_front().flatten())
    }
}
