//! Raw driver buffers to RGB bitmaps.

use image::{ImageFormat, RgbImage};

use crate::traits::{CameraError, Format, FourCC, Frame, Result};

/// Pixel formats [`decode_frame`] understands.
pub const SUPPORTED_FORMATS: [FourCC; 4] = [FourCC::YUYV, FourCC::MJPG, FourCC::JPEG, FourCC::RGB3];

/// Whether frames in `fourcc` can be decoded.
pub fn is_supported(fourcc: FourCC) -> bool {
    SUPPORTED_FORMATS.contains(&fourcc)
}

/// Decode a raw frame captured in `format` into an 8-bit RGB image.
///
/// Packed formats are read row by row using the driver's stride, so padded
/// lines are handled. Compressed formats carry their own dimensions, which
/// win over `format`.
pub fn decode_frame(frame: &Frame, format: &Format) -> Result<RgbImage> {
    let data = frame.payload();
    if data.is_empty() {
        return Err(CameraError::DecodeError("empty frame buffer".to_owned()));
    }

    match format.fourcc {
        FourCC::YUYV => decode_yuyv(data, format),
        FourCC::RGB3 => decode_rgb3(data, format),
        FourCC::MJPG | FourCC::JPEG => image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|err| CameraError::DecodeError(err.to_string())),
        other => Err(CameraError::FormatNotSupported(Format::new(
            format.width,
            format.height,
            other,
        ))),
    }
}

fn row_stride(format: &Format, bytes_per_pixel: u32) -> usize {
    let packed = format.width.saturating_mul(bytes_per_pixel);
    format.stride.max(packed) as usize
}

fn short_buffer(len: usize, format: &Format) -> CameraError {
    CameraError::DecodeError(format!(
        "buffer of {len} bytes too small for {}x{} {}",
        format.width, format.height, format.fourcc
    ))
}

fn decode_yuyv(data: &[u8], format: &Format) -> Result<RgbImage> {
    let stride = row_stride(format, 2);
    let row_len = format.width as usize * 2;
    let mut rgb = Vec::with_capacity(format.width as usize * format.height as usize * 3);

    for row in 0..format.height as usize {
        let start = row * stride;
        let line = data
            .get(start..start + row_len)
            .ok_or_else(|| short_buffer(data.len(), format))?;

        // YUYV format: [Y0 U Y1 V] repeats, each pair of pixels shares U and V
        for chunk in line.chunks_exact(4) {
            if let [y0, u, y1, v] = *chunk {
                let (r, g, b) = yuv_to_rgb(y0, u, v);
                rgb.extend_from_slice(&[r, g, b]);
                let (r, g, b) = yuv_to_rgb(y1, u, v);
                rgb.extend_from_slice(&[r, g, b]);
            }
        }
        // Odd widths end on half a macropixel (Y, U) with no V sample.
        if format.width % 2 == 1 {
            if let [.., y, u] = *line {
                let (r, g, b) = yuv_to_rgb(y, u, 128);
                rgb.extend_from_slice(&[r, g, b]);
            }
        }
    }

    RgbImage::from_raw(format.width, format.height, rgb)
        .ok_or_else(|| short_buffer(data.len(), format))
}

fn decode_rgb3(data: &[u8], format: &Format) -> Result<RgbImage> {
    let stride = row_stride(format, 3);
    let row_len = format.width as usize * 3;
    let mut rgb = Vec::with_capacity(row_len * format.height as usize);

    for row in 0..format.height as usize {
        let start = row * stride;
        let line = data
            .get(start..start + row_len)
            .ok_or_else(|| short_buffer(data.len(), format))?;
        rgb.extend_from_slice(line);
    }

    RgbImage::from_raw(format.width, format.height, rgb)
        .ok_or_else(|| short_buffer(data.len(), format))
}

/// Convert YUV values to RGB.
///
/// Uses the ITU-R BT.601 conversion formula.
///
/// # Arguments
///
/// * `y` - Luminance value (16-235 for studio range)
/// * `u` - Blue-difference chroma value (16-240)
/// * `v` - Red-difference chroma value (16-240)
///
/// # Returns
///
/// RGB tuple with values clamped to 0-255 range.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamp = |val: f32| -> u8 { val.round().clamp(0.0, 255.0) as u8 };

    (clamp(r), clamp(g), clamp(b))
}
