//! Camera intrinsics and distortion, as read from `camera.yaml`.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::yaml::{from_opencv_yaml, MatrixNode, MatrixShapeError};

/// Distortion vector lengths OpenCV understands (0 means "no distortion").
pub const DISTORTION_LENGTHS: [usize; 6] = [0, 4, 5, 8, 12, 14];

/// Pinhole intrinsics plus lens distortion coefficients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    pub camera_matrix: Matrix3<f64>,
    pub distortion: Vec<f64>,
}

#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("failed to read camera file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse camera parameters: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("{key}: {source}")]
    Shape {
        key: &'static str,
        #[source]
        source: MatrixShapeError,
    },
    #[error("camera_matrix must be 3x3 (got {rows}x{cols})")]
    NotThreeByThree { rows: usize, cols: usize },
    #[error("distortion_coefficients has {0} values (expected 0, 4, 5, 8, 12 or 14)")]
    DistortionLength(usize),
    #[error("camera parameters contain non-finite values")]
    NonFinite,
}

#[derive(Deserialize)]
struct CameraFile {
    camera_matrix: MatrixNode,
    #[serde(alias = "dist_coeffs")]
    distortion_coefficients: MatrixNode,
}

impl CameraParameters {
    /// Load parameters from an OpenCV `FileStorage` YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| CameraError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Parse parameters from YAML text.
    pub fn from_yaml_str(raw: &str) -> Result<Self, CameraError> {
        let file: CameraFile = from_opencv_yaml(raw)?;

        let (rows, cols, k) = file
            .camera_matrix
            .into_parts()
            .map_err(|source| CameraError::Shape {
                key: "camera_matrix",
                source,
            })?;
        // A flat list of nine values is accepted as row-major 3x3.
        if !(rows == 3 && cols == 3) && !(rows == 1 && cols == 9) {
            return Err(CameraError::NotThreeByThree { rows, cols });
        }

        let (_, _, distortion) =
            file.distortion_coefficients
                .into_parts()
                .map_err(|source| CameraError::Shape {
                    key: "distortion_coefficients",
                    source,
                })?;

        Self::new(Matrix3::from_row_slice(&k), distortion)
    }

    /// Validate and build parameters from parts.
    pub fn new(camera_matrix: Matrix3<f64>, distortion: Vec<f64>) -> Result<Self, CameraError> {
        if !DISTORTION_LENGTHS.contains(&distortion.len()) {
            return Err(CameraError::DistortionLength(distortion.len()));
        }
        if camera_matrix.iter().chain(distortion.iter()).any(|v| !v.is_finite()) {
            return Err(CameraError::NonFinite);
        }
        Ok(Self {
            camera_matrix,
            distortion,
        })
    }

    /// Rough intrinsics used when no calibration is available.
    ///
    /// Focal length equals the larger image side, the principal point sits at
    /// the image centre and distortion is zero.
    pub fn uncalibrated(width: u32, height: u32) -> Self {
        let f = f64::from(width.max(height).max(1));
        let cx = f64::from(width) * 0.5;
        let cy = f64::from(height) * 0.5;
        Self {
            camera_matrix: Matrix3::new(f, 0.0, cx, 0.0, f, cy, 0.0, 0.0, 1.0),
            distortion: vec![0.0; 5],
        }
    }

    #[inline]
    pub fn fx(&self) -> f64 {
        self.camera_matrix[(0, 0)]
    }

    #[inline]
    pub fn fy(&self) -> f64 {
        self.camera_matrix[(1, 1)]
    }

    #[inline]
    pub fn principal_point(&self) -> (f64, f64) {
        (self.camera_matrix[(0, 2)], self.camera_matrix[(1, 2)])
    }

    /// Intrinsic matrix as row arrays (the layout OpenCV bindings expect).
    pub fn matrix_rows(&self) -> [[f64; 3]; 3] {
        let k = &self.camera_matrix;
        [
            [k[(0, 0)], k[(0, 1)], k[(0, 2)]],
            [k[(1, 0)], k[(1, 1)], k[(1, 2)]],
            [k[(2, 0)], k[(2, 1)], k[(2, 2)]],
        ]
    }
}
