use std::fmt::Display;

use fiducial_aruco::{DetectorParamsError, MarkerSpecError};
use fiducial_core::ImageWriteError;

use crate::config::ConfigError;
use crate::stats::FinishError;

/// Errors raised by a vision backend.
#[derive(thiserror::Error, Debug)]
pub enum VisionError {
    #[error("video source {index} could not be opened")]
    SourceUnavailable { index: i32 },
    #[error("no marker codebook available: {0}")]
    CodebookUnavailable(String),
    #[error("{context}: {message}")]
    Backend {
        context: &'static str,
        message: String,
    },
}

impl VisionError {
    /// Wrap a backend-specific error with a short description of the call.
    pub fn backend(context: &'static str, err: impl Display) -> Self {
        Self::Backend {
            context,
            message: err.to_string(),
        }
    }
}

/// Errors that abort one menu operation.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Vision(#[from] VisionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    DetectorParams(#[from] DetectorParamsError),
    #[error(transparent)]
    Marker(#[from] MarkerSpecError),
    #[error("failed to write marker image: {0}")]
    MarkerImage(#[from] ImageWriteError),
    #[error("sampling failed: {0}")]
    Sampling(#[from] FinishError),
    #[error("console I/O failed: {0}")]
    Console(#[from] std::io::Error),
}
