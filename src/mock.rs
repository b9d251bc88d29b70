//! Mock hardware for testing without a camera or GPIO chip.
//!
//! Mock cameras and lights can share an [`EventLog`], which records every
//! hardware interaction in order so tests can check how captures interleave.

use crate::light::{Light, LightError};
use crate::traits::{
    CameraDevice, CameraError, CameraProvider, CaptureStream, DeviceCapabilities, Format, FourCC,
    Frame, FrameMetadata, Result,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One observable hardware interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareEvent {
    /// Light switched on.
    LightOn,
    /// Light switched off.
    LightOff,
    /// Camera device opened.
    CameraOpened(u32),
    /// One frame read from the camera (or a failed attempt).
    FrameRead,
    /// Camera device released.
    CameraClosed(u32),
}

/// Shared, ordered record of hardware events.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<HardwareEvent>>>);

impl EventLog {
    /// Append an event.
    pub fn push(&self, event: HardwareEvent) {
        self.0.lock().push(event);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<HardwareEvent> {
        self.0.lock().clone()
    }
}

/// Where a mock camera should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// The device cannot be opened.
    Open,
    /// The device opens but yields no frame.
    Read,
}

/// Test pattern types for mock frame generation.
#[derive(Debug, Clone, Copy)]
pub enum TestPattern {
    /// SMPTE color bars pattern.
    ColorBars,
    /// Horizontal gradient from dark to light.
    Gradient,
    /// Solid color with specified Y, U, V values.
    Solid(u8, u8, u8),
}

/// Hands out [`MockDevice`]s, all configured the same way.
#[derive(Debug, Clone)]
pub struct MockProvider {
    pattern: TestPattern,
    failure: Option<MockFailure>,
    max_resolution: Option<(u32, u32)>,
    read_delay: Duration,
    events: EventLog,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Provider of healthy devices producing color bars.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pattern: TestPattern::ColorBars,
            failure: None,
            max_resolution: None,
            read_delay: Duration::ZERO,
            events: EventLog::default(),
        }
    }

    /// Set the test pattern every frame is generated with.
    #[must_use]
    pub fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Make every device fail at the given step.
    #[must_use]
    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Clamp requested formats to this resolution, like a real driver would.
    #[must_use]
    pub fn with_max_resolution(mut self, width: u32, height: u32) -> Self {
        self.max_resolution = Some((width, height));
        self
    }

    /// Sleep this long inside every frame read.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Record into `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }
}

impl CameraProvider for MockProvider {
    type Device = MockDevice;

    fn open(&self, index: u32) -> Result<Self::Device> {
        if self.failure == Some(MockFailure::Open) {
            return Err(CameraError::DeviceNotFound(index));
        }
        self.events.push(HardwareEvent::CameraOpened(index));
        Ok(MockDevice::new()
            .with_index(index)
            .with_pattern(self.pattern)
            .with_read_failure(self.failure == Some(MockFailure::Read))
            .with_max_resolution(self.max_resolution)
            .with_read_delay(self.read_delay)
            .with_events(self.events.clone()))
    }
}

/// Mock device for testing without hardware.
pub struct MockDevice {
    index: u32,
    capabilities: DeviceCapabilities,
    format: Format,
    frame_count: u32,
    pattern: TestPattern,
    fail_reads: bool,
    max_resolution: Option<(u32, u32)>,
    read_delay: Duration,
    events: EventLog,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.events.push(HardwareEvent::CameraClosed(self.index));
    }
}

impl MockDevice {
    /// Create a new mock device with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: 0,
            capabilities: DeviceCapabilities {
                driver: "mock".to_owned(),
                card: "Mock Camera".to_owned(),
                bus_info: "mock:0".to_owned(),
                can_capture: true,
                can_stream: true,
            },
            format: Format::new(640, 480, FourCC::YUYV),
            frame_count: 0,
            pattern: TestPattern::ColorBars,
            fail_reads: false,
            max_resolution: None,
            read_delay: Duration::ZERO,
            events: EventLog::default(),
        }
    }

    #[must_use]
    fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    #[must_use]
    fn with_pattern(mut self, pattern: TestPattern) -> Self {
        self.pattern = pattern;
        self
    }

    #[must_use]
    fn with_read_failure(mut self, fail_reads: bool) -> Self {
        self.fail_reads = fail_reads;
        self
    }

    #[must_use]
    fn with_max_resolution(mut self, max_resolution: Option<(u32, u32)>) -> Self {
        self.max_resolution = max_resolution;
        self
    }

    #[must_use]
    fn with_read_delay(mut self, read_delay: Duration) -> Self {
        self.read_delay = read_delay;
        self
    }

    #[must_use]
    fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }
}

impl CameraDevice for MockDevice {
    type Stream<'a> = MockStream<'a>;

    fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    fn set_format(&mut self, format: &Format) -> Result<Format> {
        // Only YUYV is generated; other requests fall back to it.
        let (mut width, mut height) = (format.width, format.height);
        if let Some((max_width, max_height)) = self.max_resolution {
            width = width.min(max_width);
            height = height.min(max_height);
        }
        self.format = Format::new(width, height, FourCC::YUYV);
        Ok(self.format.clone())
    }

    fn create_stream(
        &mut self,
        _buffer_count: u32,
        _timeout: Option<Duration>,
    ) -> Result<Self::Stream<'_>> {
        let pattern = self.pattern;
        Ok(MockStream {
            device: self,
            pattern,
        })
    }
}

/// Mock capture stream for testing.
pub struct MockStream<'a> {
    device: &'a mut MockDevice,
    pattern: TestPattern,
}

impl CaptureStream for MockStream<'_> {
    fn next_frame(&mut self) -> Result<Frame> {
        if !self.device.read_delay.is_zero() {
            thread::sleep(self.device.read_delay);
        }
        self.device.events.push(HardwareEvent::FrameRead);
        if self.device.fail_reads {
            return Err(CameraError::StreamError("no frame available".to_owned()));
        }

        let format = &self.device.format;
        let data = generate_test_frame(format, self.pattern);

        let seq = self.device.frame_count;
        self.device.frame_count += 1;

        Ok(Frame {
            data,
            metadata: FrameMetadata {
                sequence: seq,
                timestamp: Duration::from_millis(u64::from(seq) * 33), // ~30fps
                bytes_used: format.size,
            },
        })
    }
}

/// Mock GPIO light that tracks its drive value and can simulate line faults.
///
/// Each `set` is one claim-write-release, like [`crate::light::GpioLight`];
/// whether the real line is released is covered by the GPIO integration tests.
#[derive(Debug, Clone, Default)]
pub struct MockLight {
    state: Arc<Mutex<LineState>>,
    events: EventLog,
}

#[derive(Debug, Default)]
struct LineState {
    value: bool,
    held_elsewhere: bool,
    fail_writes: bool,
    fail_switch_off: bool,
    set_calls: u32,
}

impl MockLight {
    /// A free line driven low.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record into `events`.
    #[must_use]
    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Simulate another process holding the line.
    pub fn hold_elsewhere(&self, held: bool) {
        self.state.lock().held_elsewhere = held;
    }

    /// Make writes to the line fail after it has been claimed.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make only `set(false)` fail, leaving the light on.
    pub fn fail_switch_off(&self, fail: bool) {
        self.state.lock().fail_switch_off = fail;
    }

    /// Current drive value.
    pub fn is_on(&self) -> bool {
        self.state.lock().value
    }

    /// Number of `set` calls seen.
    pub fn set_calls(&self) -> u32 {
        self.state.lock().set_calls
    }
}

impl Light for MockLight {
    fn set(&mut self, on: bool) -> std::result::Result<(), LightError> {
        let mut state = self.state.lock();
        state.set_calls += 1;
        if state.held_elsewhere {
            return Err(LightError::LineBusy {
                line: 0,
                reason: "Device or resource busy".to_owned(),
            });
        }

        if state.fail_writes || (state.fail_switch_off && !on) {
            return Err(LightError::WriteFailed {
                line: 0,
                reason: "Input/output error".to_owned(),
            });
        }
        state.value = on;
        self.events.push(if on {
            HardwareEvent::LightOn
        } else {
            HardwareEvent::LightOff
        });
        Ok(())
    }
}

/// Generate test frame data based on pattern.
fn generate_test_frame(format: &Format, pattern: TestPattern) -> Vec<u8> {
    let size = (format.width * format.height * 2) as usize; // YUYV = 2 bytes/pixel
    let mut data = vec![0u8; size];

    match pattern {
        TestPattern::ColorBars => {
            generate_color_bars(&mut data, format.width, format.height);
        }
        TestPattern::Gradient => {
            generate_gradient(&mut data, format.width, format.height);
        }
        TestPattern::Solid(y, u, v) => {
            generate_solid(&mut data, y, u, v);
        }
    }

    data
}

/// Generate YUYV color bars pattern.
fn generate_color_bars(data: &mut [u8], width: u32, height: u32) {
    // 8 color bars: White, Yellow, Cyan, Green, Magenta, Red, Blue, Black
    let bars: [(u8, u8, u8); 8] = [
        (235, 128, 128), // White
        (210, 16, 146),  // Yellow
        (170, 166, 16),  // Cyan
        (145, 54, 34),   // Green
        (106, 202, 222), // Magenta
        (81, 90, 240),   // Red
        (41, 240, 110),  // Blue
        (16, 128, 128),  // Black
    ];

    let bar_width = (width / 8).max(1);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let bar_idx = (x / bar_width).min(7) as usize;
            let (y_val, u_val, v_val) = bars[bar_idx];

            let offset = ((y * width + x) * 2) as usize;
            if offset + 3 < data.len() {
                data[offset] = y_val; // Y0
                data[offset + 1] = u_val; // U
                data[offset + 2] = y_val; // Y1
                data[offset + 3] = v_val; // V
            }
        }
    }
}

/// Generate YUYV horizontal gradient pattern.
fn generate_gradient(data: &mut [u8], width: u32, height: u32) {
    for y in 0..height {
        for x in (0..width).step_by(2) {
            #[allow(clippy::cast_possible_truncation)]
            let y_val = ((x * 255) / width) as u8;
            let offset = ((y * width + x) * 2) as usize;

            if offset + 3 < data.len() {
                data[offset] = y_val; // Y0
                data[offset + 1] = 128; // U (neutral)
                data[offset + 2] = y_val; // Y1
                data[offset + 3] = 128; // V (neutral)
            }
        }
    }
}

/// Generate solid color YUYV frame.
fn generate_solid(data: &mut [u8], y: u8, u: u8, v: u8) {
    for chunk in data.chunks_exact_mut(4) {
        chunk.copy_from_slice(&[y, u, y, v]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_creation() {
        let device = MockDevice::new();
        assert_eq!(device.capabilities().driver, "mock");
        assert!(device.capabilities().can_capture);
        assert!(device.capabilities().can_stream);
    }

    #[test]
    fn test_mock_device_set_format() {
        let mut device = MockDevice::new();
        let new_format = Format::new(1280, 720, FourCC::YUYV);
        let actual = device.set_format(&new_format).expect("set_format should succeed");
        assert_eq!(actual.width, 1280);
        assert_eq!(actual.height, 720);
    }

    #[test]
    fn test_mock_device_clamps_resolution() {
        let mut device = MockDevice::new().with_max_resolution(Some((800, 600)));
        let actual = device
            .set_format(&Format::new(1920, 1080, FourCC::MJPG))
            .expect("set_format should succeed");
        assert_eq!((actual.width, actual.height), (800, 600));
        assert_eq!(actual.fourcc, FourCC::YUYV);
    }

    #[test]
    fn test_mock_stream_capture() {
        let mut device = MockDevice::new();
        let mut stream = device.create_stream(4, None).expect("create_stream should succeed");

        let frame1 = stream.next_frame().expect("next_frame should succeed");
        assert_eq!(frame1.metadata.sequence, 0);
        assert!(!frame1.data.is_empty());

        let frame2 = stream.next_frame().expect("next_frame should succeed");
        assert_eq!(frame2.metadata.sequence, 1);
    }

    #[test]
    fn test_provider_records_events() {
        let events = EventLog::default();
        let provider = MockProvider::new().with_events(events.clone());
        {
            let mut device = provider.open(3).expect("open should succeed");
            let mut stream = device.create_stream(1, None).expect("create_stream should succeed");
            stream.next_frame().expect("next_frame should succeed");
        }
        assert_eq!(
            events.snapshot(),
            vec![
                HardwareEvent::CameraOpened(3),
                HardwareEvent::FrameRead,
                HardwareEvent::CameraClosed(3),
            ]
        );
    }

    #[test]
    fn test_provider_failures() {
        let provider = MockProvider::new().with_failure(MockFailure::Open);
        assert!(matches!(provider.open(1), Err(CameraError::DeviceNotFound(1))));

        let provider = MockProvider::new().with_failure(MockFailure::Read);
        let mut device = provider.open(0).expect("open should succeed");
        let mut stream = device.create_stream(1, None).expect("create_stream should succeed");
        assert!(stream.next_frame().is_err());
    }

    #[test]
    fn test_color_bars_pattern() {
        let format = Format::new(640, 480, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::ColorBars);

        // Check frame size
        assert_eq!(data.len(), (640 * 480 * 2) as usize);

        // First bar should be white (Y=235)
        assert_eq!(data[0], 235);
    }

    #[test]
    fn test_gradient_pattern() {
        let format = Format::new(640, 480, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::Gradient);

        // Left edge should be dark
        assert!(data[0] < 10);

        // Right edge should be bright (check last row, last pixel)
        let last_row_start = (479 * 640 * 2) as usize;
        let last_pixel_y = data[last_row_start + 638 * 2];
        assert!(last_pixel_y > 200);
    }

    #[test]
    fn test_solid_pattern() {
        let format = Format::new(64, 64, FourCC::YUYV);
        let data = generate_test_frame(&format, TestPattern::Solid(128, 64, 192));

        assert_eq!(data[0], 128);
        assert_eq!(data[2], 128);
        assert_eq!(data[1], 64);
        assert_eq!(data[3], 192);
    }

    #[test]
    fn test_mock_light_set_and_release() {
        let mut light = MockLight::new();
        light.set(true).expect("set(true) should succeed");
        assert!(light.is_on());

        light.set(false).expect("set(false) should succeed");
        assert!(!light.is_on());
        assert_eq!(light.set_calls(), 2);
    }

    #[test]
    fn test_mock_light_switch_off_fault() {
        let mut light = MockLight::new();
        light.fail_switch_off(true);
        light.set(true).expect("switching on still works");
        assert!(matches!(light.set(false), Err(LightError::WriteFailed { .. })));
        assert!(light.is_on());
    }

    #[test]
    fn test_mock_light_busy_line() {
        let mut light = MockLight::new();
        light.hold_elsewhere(true);
        assert!(matches!(light.set(true), Err(LightError::LineBusy { .. })));
        assert!(!light.is_on());

        light.hold_elsewhere(false);
        assert!(light.set(true).is_ok());
    }
}
