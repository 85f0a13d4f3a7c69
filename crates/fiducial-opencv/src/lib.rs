//! OpenCV implementation of the fiducial session capabilities.
//!
//! [`OpenCvVision`] covers every trait in `fiducial_session::capability`:
//! marker images come from `aruco::generateImageMarker`, detection from
//! `ArucoDetector`, poses from `solvePnP` (IPPE square), and the preview
//! from `highgui`. Building this crate needs a system OpenCV (4.7 or newer).

mod backend;
mod capture;
mod convert;

pub use backend::{OpenCvVision, PREVIEW_WINDOW};
pub use capture::{CvFrame, OpenCvCamera};
pub use convert::opencv_dictionary;
