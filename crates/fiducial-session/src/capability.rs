//! Interfaces to the vision backend.
//!
//! Marker encoding, detection, pose estimation, video capture and preview
//! windows all live behind these traits. The session logic only moves data
//! between them.

use std::time::Duration;

use fiducial_aruco::{DetectorParams, MarkerSpec, PredefinedDictionary};
use fiducial_core::{CameraParameters, DetectedMarker, GrayImage, MarkerDetections, MarkerPose};

use crate::error::VisionError;

/// A captured video frame.
pub trait Frame {
    /// `(width, height)` in pixels.
    fn size(&self) -> (u32, u32);
}

/// A stream of frames. Dropping the source releases the device.
pub trait VideoSource {
    type Frame: Frame;

    /// Block until the next frame is available; `None` once the stream ends.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, VisionError>;
}

/// Opens video sources by device index.
pub trait VideoDevice {
    type Source: VideoSource;

    fn open(&mut self, index: i32) -> Result<Self::Source, VisionError>;
}

/// Frame type produced by a backend's video sources.
pub type FrameOf<B> = <<B as VideoDevice>::Source as VideoSource>::Frame;

/// Produces printable marker images.
pub trait MarkerCodebook {
    fn render_marker(&mut self, spec: &MarkerSpec) -> Result<GrayImage, VisionError>;
}

/// Finds markers in a frame.
pub trait MarkerDetector<F> {
    fn detect_markers(
        &mut self,
        frame: &F,
        dictionary: PredefinedDictionary,
        params: &DetectorParams,
    ) -> Result<MarkerDetections, VisionError>;
}

/// Solves marker poses from detected corners.
pub trait PoseEstimator {
    /// One pose per marker, in input order. `marker_length` is the printed
    /// side length; translations come back in the same unit.
    fn estimate_poses(
        &mut self,
        markers: &[DetectedMarker],
        marker_length: f64,
        camera: &CameraParameters,
    ) -> Result<Vec<MarkerPose>, VisionError>;
}

/// What to draw over a frame.
#[derive(Clone, Copy, Debug)]
pub struct Annotations<'a> {
    pub detections: &'a MarkerDetections,
    pub poses: &'a [MarkerPose],
    pub camera: &'a CameraParameters,
    pub axis_length: f64,
}

/// Shows annotated frames and polls the keyboard.
pub trait Preview<F> {
    fn show(&mut self, frame: &F, annotations: &Annotations<'_>) -> Result<(), VisionError>;

    /// Wait up to `timeout` for a key press.
    fn wait_key(&mut self, timeout: Duration) -> Result<Option<i32>, VisionError>;
}
