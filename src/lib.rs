//! Pi-Cam-Snapshot: on-demand camera snapshots over HTTP for Raspberry Pi
//!
//! Each request captures a single frame from a V4L2 camera. The light can be
//! switched on around the exposure. The frame is stretched with histogram
//! clipping, optionally rotated and stamped with the time, and returned as
//! JPEG. Camera and light access goes through trait abstractions, so the
//! whole pipeline also runs against mock devices.

pub mod annotate;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod correct;
pub mod device;
pub mod encode;
pub mod error;
pub mod light;
pub mod request;
pub mod server;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use config::SnapshotConfig;
pub use coordinator::{CaptureCoordinator, CaptureSettings};
pub use device::{V4L2Device, V4L2Provider};
pub use encode::{EncodedImage, OutputFormat};
pub use error::CaptureError;
pub use light::{GpioLight, Light, LightError};
pub use request::CaptureRequest;
pub use traits::{
    CameraDevice, CameraProvider, CaptureStream, DeviceCapabilities, Format, FourCC, Frame,
    FrameMetadata,
};

/// Initialize `env_logger`, defaulting to info for this crate when `RUST_LOG` is unset.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("pi_cam_snapshot=info");
    // A logger installed earlier (e.g. by a test harness) wins.
    let _ = env_logger::Builder::from_env(env).try_init();
}
