//! Errors reported by a capture.

use std::time::Duration;
use thiserror::Error;

use crate::light::LightError;
use crate::traits::CameraError;

/// Why a capture produced no image.
///
/// Lower layers keep their own detailed errors; everything the caller can
/// act on collapses into these kinds, each with a readable message.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Caller input was malformed. No hardware was touched.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    /// The camera could not be opened or configured, or yielded no frame.
    #[error("device read failed: {0}")]
    DeviceReadFailed(String),
    /// The light line could not be claimed or driven.
    #[error("light control failed: {0}")]
    LightControlFailed(String),
    /// Another capture held the hardware longer than the lock timeout.
    #[error("hardware busy: not acquired within {0:?}")]
    HardwareBusy(Duration),
    /// The output encoder rejected the frame.
    #[error("encoding failed: {0}")]
    EncodeFailed(String),
}

impl From<CameraError> for CaptureError {
    fn from(err: CameraError) -> Self {
        Self::DeviceReadFailed(err.to_string())
    }
}

impl From<LightError> for CaptureError {
    fn from(err: LightError) -> Self {
        Self::LightControlFailed(err.to_string())
    }
}

impl From<image::ImageError> for CaptureError {
    fn from(err: image::ImageError) -> Self {
        Self::EncodeFailed(err.to_string())
    }
}
