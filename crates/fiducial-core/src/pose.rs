//! Marker detections and poses reported by a vision backend.

use nalgebra::{Point2, Vector3};
use serde::{Deserialize, Serialize};

/// One rotation-vector component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationComponent {
    X,
    Y,
    #[default]
    Z,
}

impl RotationComponent {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

/// A marker found in one frame.
///
/// Corners are in image pixels, clockwise starting at the marker's top-left.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: i32,
    pub corners: [Point2<f32>; 4],
}

/// Everything the detector reports for a single frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetections {
    pub markers: Vec<DetectedMarker>,
    /// Candidate quads that failed decoding.
    #[serde(default)]
    pub rejected: Vec<[Point2<f32>; 4]>,
}

impl MarkerDetections {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.markers.iter().map(|m| m.id)
    }
}

/// Pose of one marker relative to the camera.
///
/// `rvec` is an axis-angle rotation in radians, `tvec` is in the units of
/// the marker side length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerPose {
    pub id: i32,
    pub rvec: Vector3<f64>,
    pub tvec: Vector3<f64>,
}

impl MarkerPose {
    /// Rotation vector with every component converted to degrees.
    pub fn rvec_degrees(&self) -> Vector3<f64> {
        self.rvec.map(f64::to_degrees)
    }

    /// One rotation-vector component, in degrees.
    #[inline]
    pub fn angle_degrees(&self, component: RotationComponent) -> f64 {
        self.rvec[component.index()].to_degrees()
    }
}
