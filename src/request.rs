//! What a caller asks the camera for.

use crate::error::CaptureError;

/// Resolution used when the caller does not name one.
pub const DEFAULT_RESOLUTION: (u32, u32) = (640, 480);

/// One capture, fully specified. Built per call and never mutated after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// V4L2 device index (`/dev/videoN`).
    pub camera_index: u32,
    /// Requested frame width; the device may adjust it.
    pub width: u32,
    /// Requested frame height; the device may adjust it.
    pub height: u32,
    /// Stamp the capture time onto the frame.
    pub annotate: bool,
    /// Rotate the frame by 180 degrees.
    pub flip: bool,
    /// Switch the light on around the exposure.
    pub use_light: bool,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::new(0, DEFAULT_RESOLUTION.0, DEFAULT_RESOLUTION.1)
    }
}

impl CaptureRequest {
    /// A plain request: no label, no flip, no light.
    pub const fn new(camera_index: u32, width: u32, height: u32) -> Self {
        Self {
            camera_index,
            width,
            height,
            annotate: false,
            flip: false,
            use_light: false,
        }
    }

    /// Set whether the timestamp label is drawn.
    #[must_use]
    pub const fn with_annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Set whether the frame is rotated by 180 degrees.
    #[must_use]
    pub const fn with_flip(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    /// Set whether the light is used.
    #[must_use]
    pub const fn with_light(mut self, use_light: bool) -> Self {
        self.use_light = use_light;
        self
    }

    /// Reject requests no device could satisfy.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidParameters(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Parse `WIDTHxHEIGHT` (the `x` may be upper case), e.g. `"1280X720"`.
pub fn parse_resolution(text: &str) -> Result<(u32, u32), CaptureError> {
    let invalid = || {
        CaptureError::InvalidParameters(format!(
            "invalid resolution {text:?}, expected WIDTHxHEIGHT"
        ))
    };

    let lowered = text.trim().to_ascii_lowercase();
    let (width, height) = lowered.split_once('x').ok_or_else(invalid)?;
    let width: u32 = width.trim().parse().map_err(|_| invalid())?;
    let height: u32 = height.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok((width, height))
}

/// Query flag convention: absent is false, the literal `"0"` is false,
/// anything else (including an empty value) is true.
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|value| value != "0")
}
