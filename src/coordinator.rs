//! Single-shot capture pipeline.
//!
//! A capture is split in two halves. The hardware half runs with the
//! hardware lock held: light on, settle, open the camera, read one frame,
//! release the camera, light off. The processing half (decode, flip,
//! exposure correction, label, encode) runs after the lock is released, so
//! concurrent requests only queue behind each other for the part that
//! actually drives the devices.

use image::{imageops, RgbImage};
use parking_lot::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::annotate::{self, LabelStyle};
use crate::convert::decode_frame;
use crate::correct::{self, DEFAULT_CLIP_PERCENT};
use crate::encode::{self, EncodedImage, OutputFormat};
use crate::error::CaptureError;
use crate::light::Light;
use crate::request::CaptureRequest;
use crate::traits::{self, CameraDevice, CameraProvider, CaptureStream, Format, FourCC, Frame};

/// Settle interval after switching the light on.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(300);

/// Knobs of the pipeline that do not change per request.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Pixel format requested from the driver.
    pub pixel_format: FourCC,
    /// Number of mmap buffers for the capture stream.
    pub buffer_count: u32,
    /// Frames read and thrown away before the one that is kept.
    pub discard_frames: u32,
    /// Give up on a frame read after this long.
    pub read_timeout: Option<Duration>,
    /// Wait between light on and camera open.
    pub settle: Duration,
    /// Give up waiting for the hardware lock after this long.
    pub lock_timeout: Option<Duration>,
    /// Histogram clip percentage for exposure correction.
    pub clip_percent: f64,
    /// Timestamp label geometry.
    pub label: LabelStyle,
    /// Output container.
    pub output: OutputFormat,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            pixel_format: FourCC::YUYV,
            buffer_count: 2,
            discard_frames: 0,
            read_timeout: None,
            settle: DEFAULT_SETTLE,
            lock_timeout: None,
            clip_percent: DEFAULT_CLIP_PERCENT,
            label: LabelStyle::default(),
            output: OutputFormat::default(),
        }
    }
}

/// Everything the hardware lock protects.
struct Hardware<P, L> {
    cameras: P,
    light: Option<L>,
}

/// Outcome of one hardware transaction: the undecoded frame and the mode the
/// driver actually delivered it in.
type RawCapture = (Frame, Format);

impl<P: CameraProvider, L: Light> Hardware<P, L> {
    /// Run light-on .. light-off. The camera is always released and the light
    /// always switched off before this returns, whatever failed.
    fn transaction(
        &mut self,
        request: &CaptureRequest,
        settings: &CaptureSettings,
    ) -> Result<RawCapture, CaptureError> {
        let mut light = if request.use_light {
            self.light.as_mut()
        } else {
            None
        };

        if let Some(light) = light.as_mut() {
            if let Err(err) = light.set(true) {
                if let Err(off_err) = light.set(false) {
                    log::warn!("light off after failed light on: {off_err}");
                }
                return Err(err.into());
            }
            log::debug!("light on, settling for {:?}", settings.settle);
            thread::sleep(settings.settle);
        }

        let captured = read_frame(&self.cameras, request, settings);

        let light_off = light.map_or(Ok(()), |light| light.set(false));

        match (captured, light_off) {
            (Ok(raw), Ok(())) => Ok(raw),
            (Ok(_), Err(err)) => Err(err.into()),
            (Err(err), Ok(())) => Err(err.into()),
            (Err(err), Err(light_err)) => {
                log::error!("light may still be on: {light_err}");
                Err(err.into())
            }
        }
    }
}

/// Open the camera, read one frame, release the camera.
fn read_frame<P: CameraProvider>(
    cameras: &P,
    request: &CaptureRequest,
    settings: &CaptureSettings,
) -> traits::Result<RawCapture> {
    let mut device = cameras.open(request.camera_index)?;
    let caps = device.capabilities();
    log::debug!(
        "opened camera {}: {} (driver {}, bus {})",
        request.camera_index,
        caps.card,
        caps.driver,
        caps.bus_info
    );

    let requested = Format::new(request.width, request.height, settings.pixel_format);
    let format = device.set_format(&requested)?;
    if (format.width, format.height) != (request.width, request.height)
        || format.fourcc != settings.pixel_format
    {
        log::info!(
            "camera {} adjusted {}x{} {} to {}x{} {}",
            request.camera_index,
            request.width,
            request.height,
            settings.pixel_format,
            format.width,
            format.height,
            format.fourcc
        );
    }

    let frame = {
        let mut stream = device.create_stream(settings.buffer_count, settings.read_timeout)?;
        for _ in 0..settings.discard_frames {
            stream.next_frame()?;
        }
        stream.next_frame()?
    };
    drop(device);

    Ok((frame, format))
}

/// Serializes captures from many callers onto one camera and one light.
///
/// The light is optional and fixed at construction: a coordinator built
/// without one rejects requests that ask for it.
pub struct CaptureCoordinator<P, L> {
    hardware: Mutex<Hardware<P, L>>,
    has_light: bool,
    settings: CaptureSettings,
}

impl<P: CameraProvider, L: Light> CaptureCoordinator<P, L> {
    /// Coordinator over `cameras`, with `light` if one is wired up.
    pub fn new(cameras: P, light: Option<L>, settings: CaptureSettings) -> Self {
        Self {
            has_light: light.is_some(),
            hardware: Mutex::new(Hardware { cameras, light }),
            settings,
        }
    }

    /// Pipeline settings.
    pub const fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// Whether a light controller is available.
    pub const fn has_light(&self) -> bool {
        self.has_light
    }

    /// Capture, correct, optionally label, and encode one frame.
    pub fn capture(&self, request: &CaptureRequest) -> Result<EncodedImage, CaptureError> {
        request.validate()?;
        if request.use_light && !self.has_light {
            return Err(CaptureError::InvalidParameters(
                "light requested but no light is configured".to_owned(),
            ));
        }

        let started = Instant::now();
        let (raw, format) = {
            let mut hardware = self.lock()?;
            log::info!(
                "capturing camera {} at {}x{} (light: {})",
                request.camera_index,
                request.width,
                request.height,
                request.use_light
            );
            hardware.transaction(request, &self.settings)?
        };
        let hardware_time = started.elapsed();

        let mut frame: RgbImage = decode_frame(&raw, &format)?;
        if request.flip {
            imageops::rotate180_in_place(&mut frame);
        }
        let frame = correct::correct(frame, self.settings.clip_percent);
        let frame = if request.annotate {
            annotate::annotate(frame, &self.settings.label)
        } else {
            frame
        };
        let encoded = encode::encode(&frame, self.settings.output)?;

        log::info!(
            "captured {}x{} frame #{} ({} bytes, hardware {:?}, total {:?})",
            frame.width(),
            frame.height(),
            raw.metadata.sequence,
            encoded.bytes.len(),
            hardware_time,
            started.elapsed()
        );
        Ok(encoded)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Hardware<P, L>>, CaptureError> {
        match self.settings.lock_timeout {
            Some(timeout) => self.hardware.try_lock_for(timeout).ok_or_else(|| {
                log::warn!("hardware still busy after {timeout:?}");
                CaptureError::HardwareBusy(timeout)
            }),
            None => Ok(self.hardware.lock()),
        }
    }
}
