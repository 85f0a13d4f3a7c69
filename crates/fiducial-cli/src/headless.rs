//! Backend for builds without OpenCV.
//!
//! Markers are rasterized from a JSON code table; there is no camera.

use std::path::PathBuf;
use std::time::Duration;

use fiducial_aruco::{CodeTable, DetectorParams, MarkerSpec, PredefinedDictionary};
use fiducial_core::{CameraParameters, DetectedMarker, GrayImage, MarkerDetections, MarkerPose};
use fiducial_session::capability::{
    Annotations, Frame, MarkerCodebook, MarkerDetector, PoseEstimator, Preview, VideoDevice,
    VideoSource,
};
use fiducial_session::VisionError;

/// A frame that cannot exist.
pub enum NoFrame {}

impl Frame for NoFrame {
    fn size(&self) -> (u32, u32) {
        match *self {}
    }
}

/// A source that cannot be opened.
pub enum NoSource {}

impl VideoSource for NoSource {
    type Frame = NoFrame;

    fn next_frame(&mut self) -> Result<Option<NoFrame>, VisionError> {
        match *self {}
    }
}

pub struct HeadlessVision {
    code_table: Option<PathBuf>,
}

impl HeadlessVision {
    pub fn new(code_table: Option<PathBuf>) -> Self {
        Self { code_table }
    }

    fn load_table(&self, dictionary: PredefinedDictionary) -> Result<CodeTable, VisionError> {
        let Some(path) = &self.code_table else {
            return Err(VisionError::CodebookUnavailable(format!(
                "no code table configured for {dictionary}; set code_table_path"
            )));
        };
        let table = CodeTable::load_json(path).map_err(|err| {
            VisionError::CodebookUnavailable(format!("{}: {err}", path.display()))
        })?;
        if table.marker_size != dictionary.marker_size() {
            return Err(VisionError::CodebookUnavailable(format!(
                "code table {name} has {have}x{have} markers, {dictionary} needs {need}x{need}",
                name = table.name,
                have = table.marker_size,
                need = dictionary.marker_size()
            )));
        }
        Ok(table)
    }
}

impl MarkerCodebook for HeadlessVision {
    fn render_marker(&mut self, spec: &MarkerSpec) -> Result<GrayImage, VisionError> {
        let table = self.load_table(spec.dictionary)?;
        spec.render(&table)
            .map_err(|err| VisionError::backend("render marker", err))
    }
}

impl VideoDevice for HeadlessVision {
    type Source = NoSource;

    fn open(&mut self, index: i32) -> Result<NoSource, VisionError> {
        Err(VisionError::SourceUnavailable { index })
    }
}

impl MarkerDetector<NoFrame> for HeadlessVision {
    fn detect_markers(
        &mut self,
        frame: &NoFrame,
        _dictionary: PredefinedDictionary,
        _params: &DetectorParams,
    ) -> Result<MarkerDetections, VisionError> {
        match *frame {}
    }
}

impl PoseEstimator for HeadlessVision {
    fn estimate_poses(
        &mut self,
        _markers: &[DetectedMarker],
        _marker_length: f64,
        _camera: &CameraParameters,
    ) -> Result<Vec<MarkerPose>, VisionError> {
        Err(VisionError::backend(
            "estimate poses",
            "no pose solver in a build without OpenCV",
        ))
    }
}

impl Preview<NoFrame> for HeadlessVision {
    fn show(&mut self, frame: &NoFrame, _annotations: &Annotations<'_>) -> Result<(), VisionError> {
        match *frame {}
    }

    fn wait_key(&mut self, _timeout: Duration) -> Result<Option<i32>, VisionError> {
        Ok(None)
    }
}
