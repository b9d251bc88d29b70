//! Timestamp label drawn in the bottom-right corner of a frame.
//!
//! Text is rendered from a small built-in 5x7 bitmap font that covers the
//! timestamp alphabet. Each label is drawn twice at the same spot: a black
//! pass with grown strokes, then a white pass on top, so it stays readable
//! on bright and dark backgrounds alike.

use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};

/// `strftime` pattern of the stamped label.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Label geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelStyle {
    /// Size in pixels of one font cell.
    pub scale: u32,
    /// Extra pixels the black outline extends around the white fill.
    pub outline: u32,
    /// Distance from the right and bottom edges.
    pub margin: u32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            scale: 2,
            outline: 2,
            margin: 10,
        }
    }
}

impl LabelStyle {
    fn advance(&self) -> u32 {
        (GLYPH_WIDTH + 1) * self.scale
    }

    /// Width and height of `text` rendered in this style, outline excluded.
    pub fn text_size(&self, text: &str) -> (u32, u32) {
        let count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        if count == 0 {
            return (0, 0);
        }
        let width = count
            .saturating_mul(self.advance())
            .saturating_sub(self.scale);
        (width, GLYPH_HEIGHT * self.scale)
    }

    /// Top-left corner of `text` in a `width` x `height` frame.
    ///
    /// May be negative when the label is wider than the frame; drawing clips.
    pub fn origin(&self, text: &str, width: u32, height: u32) -> (i64, i64) {
        let (text_width, text_height) = self.text_size(text);
        let x = i64::from(width) - i64::from(text_width) - i64::from(self.margin);
        let y = i64::from(height) - i64::from(self.margin) - i64::from(text_height);
        (x, y)
    }
}

/// Rows of a glyph, five bits each, most significant bit leftmost.
const fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => [0x00; 7],
    }
}

/// Format a point in time the way the label shows it.
pub fn timestamp_text(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Stamp the current local time onto `frame`.
pub fn annotate(frame: RgbImage, style: &LabelStyle) -> RgbImage {
    annotate_text(frame, &timestamp_text(&Local::now()), style)
}

/// Draw `text` bottom-right on `frame`: black outline first, white fill on top.
pub fn annotate_text(mut frame: RgbImage, text: &str, style: &LabelStyle) -> RgbImage {
    if style.scale == 0 {
        return frame;
    }
    let origin = style.origin(text, frame.width(), frame.height());
    draw_text(&mut frame, text, origin, style, style.outline, BLACK);
    draw_text(&mut frame, text, origin, style, 0, WHITE);
    frame
}

fn draw_text(
    frame: &mut RgbImage,
    text: &str,
    (x, y): (i64, i64),
    style: &LabelStyle,
    grow: u32,
    color: Rgb<u8>,
) {
    let scale = i64::from(style.scale);
    let grow = i64::from(grow);
    let mut pen_x = x;

    for ch in text.chars() {
        for (row, bits) in (0i64..).zip(glyph(ch)) {
            for col in 0..i64::from(GLYPH_WIDTH) {
                if bits & (0x10 >> col) == 0 {
                    continue;
                }
                let left = pen_x + col * scale - grow;
                let top = y + row * scale - grow;
                let side = scale + 2 * grow;
                fill_rect(frame, left, top, side, side, color);
            }
        }
        pen_x += i64::from(style.advance());
    }
}

fn fill_rect(frame: &mut RgbImage, left: i64, top: i64, width: i64, height: i64, color: Rgb<u8>) {
    let x0 = left.max(0);
    let y0 = top.max(0);
    let x1 = (left + width).min(i64::from(frame.width()));
    let y1 = (top + height).min(i64::from(frame.height()));

    for py in y0..y1 {
        for px in x0..x1 {
            if let (Ok(px), Ok(py)) = (u32::try_from(px), u32::try_from(py)) {
                frame.put_pixel(px, py, color);
            }
        }
    }
}
