//! Detector configuration.
//!
//! Field names serialize with OpenCV's `DetectorParameters` spelling so a
//! parameter file written for OpenCV can be read as-is.

use std::fs;
use std::path::Path;

use fiducial_core::yaml::from_opencv_yaml;
use serde::{Deserialize, Deserializer, Serialize};

/// Corner refinement applied after quad detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerRefinement {
    None,
    #[default]
    Subpix,
    Contour,
    Apriltag,
}

impl CornerRefinement {
    /// OpenCV `CORNER_REFINE_*` value.
    #[inline]
    pub fn opencv_method(self) -> i32 {
        self as i32
    }

    #[inline]
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RefinementRepr {
    Toggle(bool),
    Method(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for CornerRefinement {
    /// Accepts the legacy `doCornerRefinement` boolean, an OpenCV method
    /// number, or a method name.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;
        match RefinementRepr::deserialize(deserializer)? {
            RefinementRepr::Toggle(true) => Ok(Self::Subpix),
            RefinementRepr::Toggle(false) => Ok(Self::None),
            RefinementRepr::Method(0) => Ok(Self::None),
            RefinementRepr::Method(1) => Ok(Self::Subpix),
            RefinementRepr::Method(2) => Ok(Self::Contour),
            RefinementRepr::Method(3) => Ok(Self::Apriltag),
            RefinementRepr::Method(other) => Err(D::Error::custom(format!(
                "unknown corner refinement method {other}"
            ))),
            RefinementRepr::Name(name) => match name.to_ascii_lowercase().as_str() {
                "none" => Ok(Self::None),
                "subpix" => Ok(Self::Subpix),
                "contour" => Ok(Self::Contour),
                "apriltag" => Ok(Self::Apriltag),
                _ => Err(D::Error::custom(format!(
                    "unknown corner refinement `{name}`"
                ))),
            },
        }
    }
}

/// Marker detector tuning, mirroring OpenCV's `aruco::DetectorParameters`.
///
/// Defaults match OpenCV except that corner refinement is on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectorParams {
    /// Smallest adaptive-threshold window, in pixels.
    pub adaptive_thresh_win_size_min: i32,
    /// Largest adaptive-threshold window, in pixels.
    pub adaptive_thresh_win_size_max: i32,
    /// Window size increment between threshold passes.
    pub adaptive_thresh_win_size_step: i32,
    /// Constant subtracted from the local mean during thresholding.
    pub adaptive_thresh_constant: f64,
    /// Minimum marker perimeter relative to the largest image side.
    pub min_marker_perimeter_rate: f64,
    /// Maximum marker perimeter relative to the largest image side.
    pub max_marker_perimeter_rate: f64,
    /// Polygon approximation accuracy relative to the candidate perimeter.
    pub polygonal_approx_accuracy_rate: f64,
    pub min_corner_distance_rate: f64,
    /// Minimum distance of any corner to the image border, in pixels.
    pub min_distance_to_border: i32,
    pub min_marker_distance_rate: f64,
    #[serde(alias = "doCornerRefinement", alias = "cornerRefinementMethod")]
    pub corner_refinement: CornerRefinement,
    pub corner_refinement_win_size: i32,
    pub corner_refinement_max_iterations: i32,
    pub corner_refinement_min_accuracy: f64,
    /// Border width of the markers, in bits.
    pub marker_border_bits: i32,
    pub perspective_remove_pixel_per_cell: i32,
    pub perspective_remove_ignored_margin_per_cell: f64,
    /// Fraction of border bits allowed to be wrong.
    pub max_erroneous_bits_in_border_rate: f64,
    /// Below this standard deviation a candidate is treated as uniform.
    pub min_otsu_std_dev: f64,
    /// Fraction of the dictionary's correction capacity to use.
    pub error_correction_rate: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            adaptive_thresh_win_size_min: 3,
            adaptive_thresh_win_size_max: 23,
            adaptive_thresh_win_size_step: 10,
            adaptive_thresh_constant: 7.0,
            min_marker_perimeter_rate: 0.03,
            max_marker_perimeter_rate: 4.0,
            polygonal_approx_accuracy_rate: 0.03,
            min_corner_distance_rate: 0.05,
            min_distance_to_border: 3,
            min_marker_distance_rate: 0.05,
            corner_refinement: CornerRefinement::Subpix,
            corner_refinement_win_size: 5,
            corner_refinement_max_iterations: 30,
            corner_refinement_min_accuracy: 0.1,
            marker_border_bits: 1,
            perspective_remove_pixel_per_cell: 4,
            perspective_remove_ignored_margin_per_cell: 0.13,
            max_erroneous_bits_in_border_rate: 0.35,
            min_otsu_std_dev: 5.0,
            error_correction_rate: 0.6,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DetectorParamsError {
    #[error("{field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error("failed to read detector parameters: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse detector parameters: {0}")]
    Parse(#[from] serde_yaml::Error),
}

fn invalid(field: &'static str, reason: &'static str) -> DetectorParamsError {
    DetectorParamsError::Invalid { field, reason }
}

impl DetectorParams {
    /// Load from a YAML (or JSON) file; keys that are absent keep their default.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DetectorParamsError> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, DetectorParamsError> {
        let params: Self = from_opencv_yaml(raw)?;
        params.validate()?;
        Ok(params)
    }

    /// Check the ranges OpenCV asserts on.
    pub fn validate(&self) -> Result<(), DetectorParamsError> {
        let rates = [
            ("adaptiveThreshConstant", self.adaptive_thresh_constant),
            ("minMarkerPerimeterRate", self.min_marker_perimeter_rate),
            ("maxMarkerPerimeterRate", self.max_marker_perimeter_rate),
            ("polygonalApproxAccuracyRate", self.polygonal_approx_accuracy_rate),
            ("minCornerDistanceRate", self.min_corner_distance_rate),
            ("minMarkerDistanceRate", self.min_marker_distance_rate),
            ("cornerRefinementMinAccuracy", self.corner_refinement_min_accuracy),
            (
                "perspectiveRemoveIgnoredMarginPerCell",
                self.perspective_remove_ignored_margin_per_cell,
            ),
            ("maxErroneousBitsInBorderRate", self.max_erroneous_bits_in_border_rate),
            ("minOtsuStdDev", self.min_otsu_std_dev),
            ("errorCorrectionRate", self.error_correction_rate),
        ];
        if let Some(&(field, _)) = rates.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(field, "must be finite"));
        }

        if self.adaptive_thresh_win_size_min < 3 {
            return Err(invalid("adaptiveThreshWinSizeMin", "must be >= 3"));
        }
        if self.adaptive_thresh_win_size_max < self.adaptive_thresh_win_size_min {
            return Err(invalid(
                "adaptiveThreshWinSizeMax",
                "must be >= adaptiveThreshWinSizeMin",
            ));
        }
        if self.adaptive_thresh_win_size_step <= 0 {
            return Err(invalid("adaptiveThreshWinSizeStep", "must be > 0"));
        }
        if self.min_marker_perimeter_rate <= 0.0 {
            return Err(invalid("minMarkerPerimeterRate", "must be > 0"));
        }
        if self.max_marker_perimeter_rate <= self.min_marker_perimeter_rate {
            return Err(invalid(
                "maxMarkerPerimeterRate",
                "must be > minMarkerPerimeterRate",
            ));
        }
        if self.polygonal_approx_accuracy_rate <= 0.0 {
            return Err(invalid("polygonalApproxAccuracyRate", "must be > 0"));
        }
        if self.min_corner_distance_rate < 0.0 {
            return Err(invalid("minCornerDistanceRate", "must be >= 0"));
        }
        if self.min_distance_to_border < 0 {
            return Err(invalid("minDistanceToBorder", "must be >= 0"));
        }
        if self.min_marker_distance_rate < 0.0 {
            return Err(invalid("minMarkerDistanceRate", "must be >= 0"));
        }
        if self.corner_refinement_win_size < 1 {
            return Err(invalid("cornerRefinementWinSize", "must be >= 1"));
        }
        if self.corner_refinement_max_iterations < 1 {
            return Err(invalid("cornerRefinementMaxIterations", "must be >= 1"));
        }
        if self.corner_refinement_min_accuracy <= 0.0 {
            return Err(invalid("cornerRefinementMinAccuracy", "must be > 0"));
        }
        if self.marker_border_bits < 1 {
            return Err(invalid("markerBorderBits", "must be >= 1"));
        }
        if self.perspective_remove_pixel_per_cell < 1 {
            return Err(invalid("perspectiveRemovePixelPerCell", "must be >= 1"));
        }
        if !(0.0..0.5).contains(&self.perspective_remove_ignored_margin_per_cell) {
            return Err(invalid(
                "perspectiveRemoveIgnoredMarginPerCell",
                "must be in [0, 0.5)",
            ));
        }
        if !(0.0..=1.0).contains(&self.max_erroneous_bits_in_border_rate) {
            return Err(invalid("maxErroneousBitsInBorderRate", "must be in [0, 1]"));
        }
        if self.min_otsu_std_dev < 0.0 {
            return Err(invalid("minOtsuStdDev", "must be >= 0"));
        }
        if !(0.0..=1.0).contains(&self.error_correction_rate) {
            return Err(invalid("errorCorrectionRate", "must be in [0, 1]"));
        }
        Ok(())
    }
}
