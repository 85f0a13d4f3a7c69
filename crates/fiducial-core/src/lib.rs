//! Core types for fiducial tracking.
//!
//! This crate holds the plain data that flows between the session logic and
//! a vision backend: camera intrinsics, marker detections and poses, and a
//! small grayscale image type. It performs no detection itself.

mod camera;
mod image;
mod logger;
mod pose;
pub mod yaml;

pub use camera::{CameraError, CameraParameters, DISTORTION_LENGTHS};
pub use image::{GrayImage, ImageWriteError};
pub use pose::{DetectedMarker, MarkerDetections, MarkerPose, RotationComponent};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_env, LOG_ENV_VAR};
