//! Video capture.

use fiducial_session::capability::{Frame, VideoSource};
use fiducial_session::VisionError;
use opencv::core::{Mat, MatTraitConst};
use opencv::videoio::{VideoCapture, VideoCaptureTrait, VideoCaptureTraitConst, CAP_ANY};

use crate::convert::CvContext;

/// A BGR frame straight from the capture device.
pub struct CvFrame(pub Mat);

impl Frame for CvFrame {
    fn size(&self) -> (u32, u32) {
        (self.0.cols().max(0) as u32, self.0.rows().max(0) as u32)
    }
}

/// An open camera. Released when dropped.
pub struct OpenCvCamera {
    capture: VideoCapture,
    index: i32,
}

impl OpenCvCamera {
    pub fn open(index: i32) -> Result<Self, VisionError> {
        let capture = VideoCapture::new(index, CAP_ANY).context("open video source")?;
        if !capture.is_opened().context("open video source")? {
            return Err(VisionError::SourceUnavailable { index });
        }
        Ok(Self { capture, index })
    }
}

impl VideoSource for OpenCvCamera {
    type Frame = CvFrame;

    fn next_frame(&mut self) -> Result<Option<CvFrame>, VisionError> {
        let mut frame = Mat::default();
        if !self.capture.grab().context("grab frame")? {
            return Ok(None);
        }
        self.capture
            .retrieve(&mut frame, 0)
            .context("retrieve frame")?;
        if frame.empty() {
            return Ok(None);
        }
        Ok(Some(CvFrame(frame)))
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        if let Err(err) = self.capture.release() {
            log::warn!("failed to release video source {}: {err}", self.index);
        }
    }
}
