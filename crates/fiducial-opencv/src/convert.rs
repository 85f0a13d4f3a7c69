//! Conversions between the session types and OpenCV values.

use fiducial_aruco::{DetectorParams, PredefinedDictionary};
use fiducial_core::{CameraParameters, GrayImage};
use fiducial_session::VisionError;
use nalgebra::{Point2, Vector3};
use opencv::core::{Mat, MatTraitConst, Point2f, Point3f, Vector, CV_8UC1};
use opencv::objdetect::{DetectorParameters, DetectorParametersTrait, PredefinedDictionaryType};

/// Attach a call description to OpenCV errors.
pub(crate) trait CvContext<T> {
    fn context(self, context: &'static str) -> Result<T, VisionError>;
}

impl<T> CvContext<T> for opencv::Result<T> {
    fn context(self, context: &'static str) -> Result<T, VisionError> {
        self.map_err(|err| VisionError::backend(context, err))
    }
}

/// OpenCV's enum for a predefined dictionary.
pub fn opencv_dictionary(dict: PredefinedDictionary) -> PredefinedDictionaryType {
    use PredefinedDictionary as P;
    use PredefinedDictionaryType as T;
    match dict {
        P::Dict4x4_50 => T::DICT_4X4_50,
        P::Dict4x4_100 => T::DICT_4X4_100,
        P::Dict4x4_250 => T::DICT_4X4_250,
        P::Dict4x4_1000 => T::DICT_4X4_1000,
        P::Dict5x5_50 => T::DICT_5X5_50,
        P::Dict5x5_100 => T::DICT_5X5_100,
        P::Dict5x5_250 => T::DICT_5X5_250,
        P::Dict5x5_1000 => T::DICT_5X5_1000,
        P::Dict6x6_50 => T::DICT_6X6_50,
        P::Dict6x6_100 => T::DICT_6X6_100,
        P::Dict6x6_250 => T::DICT_6X6_250,
        P::Dict6x6_1000 => T::DICT_6X6_1000,
        P::Dict7x7_50 => T::DICT_7X7_50,
        P::Dict7x7_100 => T::DICT_7X7_100,
        P::Dict7x7_250 => T::DICT_7X7_250,
        P::Dict7x7_1000 => T::DICT_7X7_1000,
        P::ArucoOriginal => T::DICT_ARUCO_ORIGINAL,
        P::AprilTag16h5 => T::DICT_APRILTAG_16h5,
        P::AprilTag25h9 => T::DICT_APRILTAG_25h9,
        P::AprilTag36h10 => T::DICT_APRILTAG_36h10,
        P::AprilTag36h11 => T::DICT_APRILTAG_36h11,
    }
}

pub(crate) fn detector_parameters(params: &DetectorParams) -> opencv::Result<DetectorParameters> {
    let mut cv = DetectorParameters::default()?;
    cv.set_adaptive_thresh_win_size_min(params.adaptive_thresh_win_size_min);
    cv.set_adaptive_thresh_win_size_max(params.adaptive_thresh_win_size_max);
    cv.set_adaptive_thresh_win_size_step(params.adaptive_thresh_win_size_step);
    cv.set_adaptive_thresh_constant(params.adaptive_thresh_constant);
    cv.set_min_marker_perimeter_rate(params.min_marker_perimeter_rate);
    cv.set_max_marker_perimeter_rate(params.max_marker_perimeter_rate);
    cv.set_polygonal_approx_accuracy_rate(params.polygonal_approx_accuracy_rate);
    cv.set_min_corner_distance_rate(params.min_corner_distance_rate);
    cv.set_min_distance_to_border(params.min_distance_to_border);
    cv.set_min_marker_distance_rate(params.min_marker_distance_rate);
    cv.set_corner_refinement_method(params.corner_refinement.opencv_method());
    cv.set_corner_refinement_win_size(params.corner_refinement_win_size);
    cv.set_corner_refinement_max_iterations(params.corner_refinement_max_iterations);
    cv.set_corner_refinement_min_accuracy(params.corner_refinement_min_accuracy);
    cv.set_marker_border_bits(params.marker_border_bits);
    cv.set_perspective_remove_pixel_per_cell(params.perspective_remove_pixel_per_cell);
    cv.set_perspective_remove_ignored_margin_per_cell(
        params.perspective_remove_ignored_margin_per_cell,
    );
    cv.set_max_erroneous_bits_in_border_rate(params.max_erroneous_bits_in_border_rate);
    cv.set_min_otsu_std_dev(params.min_otsu_std_dev);
    cv.set_error_correction_rate(params.error_correction_rate);
    Ok(cv)
}

pub(crate) fn camera_matrix(camera: &CameraParameters) -> opencv::Result<Mat> {
    let rows = camera.matrix_rows();
    Mat::from_slice_2d(&rows)
}

pub(crate) fn distortion(camera: &CameraParameters) -> Vector<f64> {
    Vector::from_slice(&camera.distortion)
}

/// Marker corners in the marker frame, in the order the detector reports
/// image corners (IPPE square layout).
pub(crate) fn marker_object_points(marker_length: f64) -> Vector<Point3f> {
    let h = (marker_length * 0.5) as f32;
    Vector::from_iter([
        Point3f::new(-h, h, 0.0),
        Point3f::new(h, h, 0.0),
        Point3f::new(h, -h, 0.0),
        Point3f::new(-h, -h, 0.0),
    ])
}

pub(crate) fn corner_quad(points: &Vector<Point2f>) -> Option<[Point2<f32>; 4]> {
    if points.len() != 4 {
        return None;
    }
    let mut quad = [Point2::origin(); 4];
    for (dst, src) in quad.iter_mut().zip(points.iter()) {
        *dst = Point2::new(src.x, src.y);
    }
    Some(quad)
}

pub(crate) fn quad_points(quad: &[Point2<f32>; 4]) -> Vector<Point2f> {
    quad.iter().map(|p| Point2f::new(p.x, p.y)).collect()
}

/// Read a 3x1 (or 1x3) `CV_64F` vector.
pub(crate) fn vector3(mat: &Mat) -> opencv::Result<Vector3<f64>> {
    Ok(Vector3::new(
        *mat.at::<f64>(0)?,
        *mat.at::<f64>(1)?,
        *mat.at::<f64>(2)?,
    ))
}

/// Copy a single-channel 8-bit `Mat` into a [`GrayImage`].
pub(crate) fn gray_image(mat: &Mat) -> Result<GrayImage, VisionError> {
    if mat.typ() != CV_8UC1 {
        return Err(VisionError::backend(
            "marker image",
            format!("expected CV_8UC1, got type {}", mat.typ()),
        ));
    }
    let continuous = if mat.is_continuous() {
        None
    } else {
        Some(mat.try_clone().context("marker image")?)
    };
    let src = continuous.as_ref().unwrap_or(mat);
    let data = src.data_bytes().context("marker image")?.to_vec();
    Ok(GrayImage {
        width: src.cols() as usize,
        height: src.rows() as usize,
        data,
    })
}
