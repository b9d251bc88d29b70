//! Service configuration loaded from a TOML file.
//!
//! Every section and every field has a default, so an empty or missing file
//! yields a working setup: camera 0 at 640x480 YUYV, no light, JPEG output.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::annotate::LabelStyle;
use crate::convert;
use crate::coordinator::{CaptureSettings, DEFAULT_SETTLE};
use crate::correct::{DEFAULT_CLIP_PERCENT, MAX_CLIP_PERCENT};
use crate::encode::{OutputFormat, DEFAULT_JPEG_QUALITY};
use crate::light::{GpioLight, DEFAULT_CONSUMER};
use crate::request::DEFAULT_RESOLUTION;
use crate::server::RequestDefaults;
use crate::traits::FourCC;

/// File looked up when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "pi-cam-snapshot.toml";

/// Error type for configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration could not be written back out.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// `[server]`
    pub server: ServerConfig,
    /// `[camera]`
    pub camera: CameraConfig,
    /// `[light]`
    pub light: LightConfig,
    /// `[exposure]`
    pub exposure: ExposureConfig,
    /// `[label]`
    pub label: LabelConfig,
    /// `[output]`
    pub output: OutputConfig,
    /// `[concurrency]`
    pub concurrency: ConcurrencyConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `0.0.0.0:8080`.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_owned(),
        }
    }
}

/// Camera defaults and stream setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera used when a request names none.
    pub default_index: u32,
    /// Resolution used when a request names none, `[width, height]`.
    pub default_resolution: [u32; 2],
    /// FourCC requested from the driver (`YUYV`, `MJPG`, `JPEG`, `RGB3`).
    pub pixel_format: String,
    /// Number of mmap buffers.
    pub buffer_count: u32,
    /// Frames thrown away before the kept one, for sensors that need warm-up.
    pub discard_frames: u32,
    /// Frame read timeout in milliseconds; unset waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_timeout_ms: Option<u64>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            default_index: 0,
            default_resolution: [DEFAULT_RESOLUTION.0, DEFAULT_RESOLUTION.1],
            pixel_format: FourCC::YUYV.to_string(),
            buffer_count: 2,
            discard_frames: 0,
            read_timeout_ms: None,
        }
    }
}

/// GPIO illumination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Whether a light is wired up at all.
    pub enabled: bool,
    /// GPIO character device.
    pub chip: PathBuf,
    /// Line offset on the chip.
    pub line: u32,
    /// Low level means "on".
    pub active_low: bool,
    /// Consumer label for the line request.
    pub consumer: String,
    /// Wait between light on and frame read, in milliseconds.
    pub settle_ms: u64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chip: PathBuf::from("/dev/gpiochip0"),
            line: 17,
            active_low: false,
            consumer: DEFAULT_CONSUMER.to_owned(),
            settle_ms: duration_ms(DEFAULT_SETTLE),
        }
    }
}

/// Auto exposure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExposureConfig {
    /// Percentage of pixels ignored at each end of the histogram.
    pub clip_percent: f64,
}

impl Default for ExposureConfig {
    fn default() -> Self {
        Self {
            clip_percent: DEFAULT_CLIP_PERCENT,
        }
    }
}

/// Timestamp label geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Pixels per font cell.
    pub scale: u32,
    /// Outline thickness in pixels.
    pub outline: u32,
    /// Distance from the bottom-right corner.
    pub margin: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        let style = LabelStyle::default();
        Self {
            scale: style.scale,
            outline: style.outline,
            margin: style.margin,
        }
    }
}

/// Output container selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// `image/jpeg`
    #[default]
    Jpeg,
    /// `image/png`
    Png,
}

/// Response encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `jpeg` or `png`.
    pub format: ImageKind,
    /// JPEG quality (1-100); ignored for PNG.
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ImageKind::Jpeg,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Hardware lock behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Fail with "busy" after waiting this long for the hardware; unset waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SnapshotConfig {
    /// Load configuration from a TOML file. A missing file gives the defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Invalid(message.to_owned()));

        let [width, height] = self.camera.default_resolution;
        if width == 0 || height == 0 {
            return invalid("default resolution must be positive");
        }
        self.pixel_format()?;
        if self.camera.buffer_count == 0 {
            return invalid("buffer count must be at least 1");
        }
        if self.light.settle_ms < duration_ms(DEFAULT_SETTLE) {
            return invalid("light settle interval must be at least 300 ms");
        }

        let clip = self.exposure.clip_percent;
        if !(0.0..MAX_CLIP_PERCENT).contains(&clip) {
            return invalid("clip percent must be in [0, 50)");
        }

        if self.label.scale == 0 {
            return invalid("label scale must be at least 1");
        }
        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return invalid("JPEG quality must be between 1 and 100");
        }

        Ok(())
    }

    /// The configured FourCC, if frames in it can be decoded.
    fn pixel_format(&self) -> Result<FourCC, ConfigError> {
        FourCC::parse(self.camera.pixel_format.trim())
            .filter(|&fourcc| convert::is_supported(fourcc))
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unsupported pixel format {:?}, expected one of YUYV, MJPG, JPEG, RGB3",
                    self.camera.pixel_format
                ))
            })
    }

    /// Pipeline settings for the coordinator.
    pub fn capture_settings(&self) -> Result<CaptureSettings, ConfigError> {
        let pixel_format = self.pixel_format()?;
        let output = match self.output.format {
            ImageKind::Jpeg => OutputFormat::Jpeg {
                quality: self.output.jpeg_quality,
            },
            ImageKind::Png => OutputFormat::Png,
        };

        Ok(CaptureSettings {
            pixel_format,
            buffer_count: self.camera.buffer_count,
            discard_frames: self.camera.discard_frames,
            read_timeout: self.camera.read_timeout_ms.map(Duration::from_millis),
            settle: Duration::from_millis(self.light.settle_ms),
            lock_timeout: self
                .concurrency
                .lock_timeout_ms
                .map(Duration::from_millis),
            clip_percent: self.exposure.clip_percent,
            label: LabelStyle {
                scale: self.label.scale,
                outline: self.label.outline,
                margin: self.label.margin,
            },
            output,
        })
    }

    /// The configured light, if enabled.
    pub fn gpio_light(&self) -> Option<GpioLight> {
        self.light.enabled.then(|| {
            GpioLight::new(self.light.chip.clone(), self.light.line)
                .with_active_low(self.light.active_low)
                .with_consumer(self.light.consumer.clone())
        })
    }

    /// Values filled in for query parameters a request leaves out.
    pub const fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            camera_index: self.camera.default_index,
            width: self.camera.default_resolution[0],
            height: self.camera.default_resolution[1],
        }
    }
}
