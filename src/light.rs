//! Illumination control through a single GPIO output line.
//!
//! Every [`Light::set`] call claims the line, drives it, and gives it back.
//! Nothing stays claimed between calls, so a crash can leave at most the
//! one request that was in flight.

use gpio_cdev::{Chip, LineRequestFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Consumer label shown by `gpioinfo` while a request is held.
pub const DEFAULT_CONSUMER: &str = "pi-cam-snapshot";

/// Error type for light operations.
#[derive(Debug, Error)]
pub enum LightError {
    /// The GPIO chip could not be opened.
    #[error("failed to open GPIO chip {}: {reason}", .path.display())]
    ChipUnavailable {
        /// Chip device path.
        path: PathBuf,
        /// Underlying error text.
        reason: String,
    },
    /// The line could not be claimed, e.g. another process holds it.
    #[error("failed to claim GPIO line {line}: {reason}")]
    LineBusy {
        /// Line offset on the chip.
        line: u32,
        /// Underlying error text.
        reason: String,
    },
    /// The line was claimed but its value could not be written.
    #[error("failed to drive GPIO line {line}: {reason}")]
    WriteFailed {
        /// Line offset on the chip.
        line: u32,
        /// Underlying error text.
        reason: String,
    },
}

/// Something that can switch the capture illumination on and off.
pub trait Light {
    /// Drive the light. Returns once the new state is applied.
    fn set(&mut self, on: bool) -> Result<(), LightError>;
}

/// Light wired to a line of a GPIO character device.
#[derive(Debug, Clone)]
pub struct GpioLight {
    chip: PathBuf,
    line: u32,
    active_low: bool,
    consumer: String,
}

impl GpioLight {
    /// Light on line `line` of the chip at `chip` (e.g., `/dev/gpiochip0`).
    pub fn new<P: Into<PathBuf>>(chip: P, line: u32) -> Self {
        Self {
            chip: chip.into(),
            line,
            active_low: false,
            consumer: DEFAULT_CONSUMER.to_owned(),
        }
    }

    /// Treat a low output level as "on".
    #[must_use]
    pub const fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    /// Set the consumer label attached to the line request.
    #[must_use]
    pub fn with_consumer(mut self, consumer: String) -> Self {
        self.consumer = consumer;
        self
    }

    /// Chip device path.
    pub fn chip(&self) -> &Path {
        &self.chip
    }

    /// Line offset.
    pub const fn line(&self) -> u32 {
        self.line
    }
}

impl Light for GpioLight {
    fn set(&mut self, on: bool) -> Result<(), LightError> {
        let mut chip = Chip::new(&self.chip).map_err(|err| LightError::ChipUnavailable {
            path: self.chip.clone(),
            reason: err.to_string(),
        })?;
        let line = chip
            .get_line(self.line)
            .map_err(|err| LightError::LineBusy {
                line: self.line,
                reason: err.to_string(),
            })?;

        let mut flags = LineRequestFlags::OUTPUT;
        if self.active_low {
            flags |= LineRequestFlags::ACTIVE_LOW;
        }
        let value = u8::from(on);

        // The handle releases the line when it goes out of scope.
        let handle = line
            .request(flags, value, &self.consumer)
            .map_err(|err| LightError::LineBusy {
                line: self.line,
                reason: err.to_string(),
            })?;
        handle
            .set_value(value)
            .map_err(|err| LightError::WriteFailed {
                line: self.line,
                reason: err.to_string(),
            })?;

        log::debug!(
            "light {} via {}:{}",
            if on { "on" } else { "off" },
            self.chip.display(),
            self.line
        );
        Ok(())
    }
}
