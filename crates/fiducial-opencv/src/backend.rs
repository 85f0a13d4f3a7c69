use std::time::Duration;

use fiducial_aruco::{DetectorParams, MarkerSpec, PredefinedDictionary};
use fiducial_core::{CameraParameters, DetectedMarker, GrayImage, MarkerDetections, MarkerPose};
use fiducial_session::capability::{
    Annotations, MarkerCodebook, MarkerDetector, PoseEstimator, Preview, VideoDevice,
};
use fiducial_session::VisionError;
use opencv::calib3d::{draw_frame_axes, solve_pnp, SOLVEPNP_IPPE_SQUARE};
use opencv::core::{Mat, Point2f, Scalar, Vector};
use opencv::highgui::{imshow, wait_key};
use opencv::objdetect::{
    draw_detected_markers, generate_image_marker, get_predefined_dictionary, ArucoDetector,
    ArucoDetectorTraitConst, RefineParameters,
};
use opencv::prelude::*;

use crate::capture::{CvFrame, OpenCvCamera};
use crate::convert::{
    camera_matrix, corner_quad, detector_parameters, distortion, gray_image,
    marker_object_points, opencv_dictionary, quad_points, vector3, CvContext,
};

/// Title of the preview window.
pub const PREVIEW_WINDOW: &str = "fiducial";

struct CachedDetector {
    dictionary: PredefinedDictionary,
    params: DetectorParams,
    detector: ArucoDetector,
}

/// Every capability backed by OpenCV.
///
/// The ArUco detector is rebuilt only when the dictionary or parameters
/// change between frames.
#[derive(Default)]
pub struct OpenCvVision {
    cached: Option<CachedDetector>,
}

impl OpenCvVision {
    pub fn new() -> Self {
        Self::default()
    }

    fn detector(
        &mut self,
        dictionary: PredefinedDictionary,
        params: &DetectorParams,
    ) -> Result<&ArucoDetector, VisionError> {
        let stale = !matches!(
            &self.cached,
            Some(c) if c.dictionary == dictionary && &c.params == params
        );
        if stale {
            log::debug!("building ArUco detector for {dictionary}");
            let dict = get_predefined_dictionary(opencv_dictionary(dictionary))
                .context("load dictionary")?;
            let cv_params = detector_parameters(params).context("detector parameters")?;
            let refine = RefineParameters::new(10.0, 3.0, true).context("refine parameters")?;
            let detector =
                ArucoDetector::new(&dict, &cv_params, refine).context("create detector")?;
            self.cached = Some(CachedDetector {
                dictionary,
                params: params.clone(),
                detector,
            });
        }
        match &self.cached {
            Some(cached) => Ok(&cached.detector),
            None => Err(VisionError::backend("create detector", "detector cache empty")),
        }
    }
}

impl VideoDevice for OpenCvVision {
    type Source = OpenCvCamera;

    fn open(&mut self, index: i32) -> Result<OpenCvCamera, VisionError> {
        OpenCvCamera::open(index)
    }
}

impl MarkerCodebook for OpenCvVision {
    fn render_marker(&mut self, spec: &MarkerSpec) -> Result<GrayImage, VisionError> {
        let dict = get_predefined_dictionary(opencv_dictionary(spec.dictionary))
            .context("load dictionary")?;
        let mut image = Mat::default();
        generate_image_marker(
            &dict,
            spec.marker_id,
            spec.side_pixels as i32,
            &mut image,
            spec.border_bits as i32,
        )
        .context("generate marker")?;
        gray_image(&image)
    }
}

impl MarkerDetector<CvFrame> for OpenCvVision {
    fn detect_markers(
        &mut self,
        frame: &CvFrame,
        dictionary: PredefinedDictionary,
        params: &DetectorParams,
    ) -> Result<MarkerDetections, VisionError> {
        let detector = self.detector(dictionary, params)?;
        let mut corners = Vector::<Vector<Point2f>>::new();
        let mut ids = Vector::<i32>::new();
        let mut rejected = Vector::<Vector<Point2f>>::new();
        detector
            .detect_markers(&frame.0, &mut corners, &mut ids, &mut rejected)
            .context("detect markers")?;

        let markers = ids
            .iter()
            .zip(corners.iter())
            .filter_map(|(id, quad)| corner_quad(&quad).map(|corners| DetectedMarker { id, corners }))
            .collect();
        let rejected = rejected.iter().filter_map(|quad| corner_quad(&quad)).collect();
        Ok(MarkerDetections { markers, rejected })
    }
}

impl PoseEstimator for OpenCvVision {
    fn estimate_poses(
        &mut self,
        markers: &[DetectedMarker],
        marker_length: f64,
        camera: &CameraParameters,
    ) -> Result<Vec<MarkerPose>, VisionError> {
        let k = camera_matrix(camera).context("camera matrix")?;
        let dist = distortion(camera);
        let object = marker_object_points(marker_length);

        markers
            .iter()
            .map(|marker| {
                let mut rvec = Mat::default();
                let mut tvec = Mat::default();
                solve_pnp(
                    &object,
                    &quad_points(&marker.corners),
                    &k,
                    &dist,
                    &mut rvec,
                    &mut tvec,
                    false,
                    SOLVEPNP_IPPE_SQUARE,
                )
                .context("solve marker pose")?;
                Ok(MarkerPose {
                    id: marker.id,
                    rvec: vector3(&rvec).context("rotation vector")?,
                    tvec: vector3(&tvec).context("translation vector")?,
                })
            })
            .collect()
    }
}

impl Preview<CvFrame> for OpenCvVision {
    fn show(&mut self, frame: &CvFrame, annotations: &Annotations<'_>) -> Result<(), VisionError> {
        let mut canvas = frame.0.try_clone().context("copy frame")?;
        let detections = annotations.detections;

        if !detections.is_empty() {
            let corners: Vector<Vector<Point2f>> = detections
                .markers
                .iter()
                .map(|m| quad_points(&m.corners))
                .collect();
            let ids: Vector<i32> = detections.ids().collect();
            draw_detected_markers(&mut canvas, &corners, &ids, Scalar::new(0.0, 255.0, 0.0, 0.0))
                .context("draw markers")?;
        }

        if !annotations.poses.is_empty() {
            let k = camera_matrix(annotations.camera).context("camera matrix")?;
            let dist = distortion(annotations.camera);
            for pose in annotations.poses {
                let rvec = Vector::<f64>::from_slice(pose.rvec.as_slice());
                let tvec = Vector::<f64>::from_slice(pose.tvec.as_slice());
                draw_frame_axes(
                    &mut canvas,
                    &k,
                    &dist,
                    &rvec,
                    &tvec,
                    annotations.axis_length as f32,
                    3,
                )
                .context("draw axes")?;
            }
        }

        imshow(PREVIEW_WINDOW, &canvas).context("show preview")
    }

    fn wait_key(&mut self, timeout: Duration) -> Result<Option<i32>, VisionError> {
        let delay = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX).max(1);
        let key = wait_key(delay).context("wait key")?;
        Ok((key >= 0).then_some(key))
    }
}
