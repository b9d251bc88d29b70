//! Automatic brightness and contrast correction by histogram clipping.
//!
//! Black and white points are picked from the luminance histogram after
//! ignoring `clip_percent` of the darkest and of the brightest pixels. The
//! resulting linear stretch is then applied to every color channel.

use image::RgbImage;

/// Percentage of the histogram clipped at each end unless configured otherwise.
pub const DEFAULT_CLIP_PERCENT: f64 = 1.0;

/// Upper bound for the clip percentage; at 50 both points meet in the median.
pub const MAX_CLIP_PERCENT: f64 = 50.0;

/// Number of histogram bins for 8-bit luminance.
const BINS: usize = 256;

/// Linear stretch parameters derived from a luminance histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    /// Black point: luminance mapped to 0.
    pub low: u8,
    /// White point: luminance mapped to 255.
    pub high: u8,
    /// Gain.
    pub alpha: f64,
    /// Offset.
    pub beta: f64,
}

impl Levels {
    /// The transform that leaves every pixel unchanged.
    pub const IDENTITY: Self = Self {
        low: 0,
        high: 255,
        alpha: 1.0,
        beta: 0.0,
    };

    /// Derive black/white points from a histogram.
    ///
    /// A histogram whose clipped range collapses (`high <= low`, e.g. a
    /// uniform frame) yields [`Levels::IDENTITY`] instead of an infinite gain.
    pub fn from_histogram(histogram: &[u64; BINS], clip_percent: f64) -> Self {
        let clip_percent = if clip_percent.is_nan() {
            0.0
        } else {
            clip_percent.clamp(0.0, MAX_CLIP_PERCENT)
        };

        let mut cumulative = [0u64; BINS];
        let mut total = 0u64;
        for (acc, count) in cumulative.iter_mut().zip(histogram) {
            total += count;
            *acc = total;
        }
        if total == 0 {
            return Self::IDENTITY;
        }

        #[allow(clippy::cast_precision_loss)]
        let total_f = total as f64;
        let clip = clip_percent * total_f / 100.0;

        let low = first_bin_reaching(&cumulative, clip);
        let high = first_bin_reaching(&cumulative, total_f - clip);

        if high <= low {
            log::debug!("degenerate histogram (low={low}, high={high}), skipping correction");
            return Self::IDENTITY;
        }

        let alpha = 255.0 / f64::from(high - low);
        let beta = -f64::from(low) * alpha;
        Self {
            low,
            high,
            alpha,
            beta,
        }
    }

    /// Whether applying these levels changes nothing.
    pub fn is_identity(&self) -> bool {
        (self.alpha - 1.0).abs() < f64::EPSILON && self.beta.abs() < f64::EPSILON
    }

    /// Map a single channel value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&self, value: u8) -> u8 {
        self.alpha
            .mul_add(f64::from(value), self.beta)
            .round()
            .clamp(0.0, 255.0) as u8
    }

    fn lookup_table(&self) -> [u8; BINS] {
        let mut table = [0u8; BINS];
        for (value, out) in (0..=u8::MAX).zip(table.iter_mut()) {
            *out = self.apply(value);
        }
        table
    }
}

/// Smallest bin whose cumulative count reaches `target`.
fn first_bin_reaching(cumulative: &[u64; BINS], target: f64) -> u8 {
    #[allow(clippy::cast_precision_loss)]
    let position = cumulative.iter().position(|&acc| acc as f64 >= target);
    position
        .and_then(|bin| u8::try_from(bin).ok())
        .unwrap_or(u8::MAX)
}

/// Rec. 601 luma in 14-bit fixed point, rounded.
#[allow(clippy::cast_possible_truncation)]
pub const fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
    y as u8
}

/// 256-bin luminance histogram of a frame.
pub fn histogram(frame: &RgbImage) -> [u64; BINS] {
    let mut bins = [0u64; BINS];
    for pixel in frame.pixels() {
        let [r, g, b] = pixel.0;
        if let Some(bin) = bins.get_mut(usize::from(luminance(r, g, b))) {
            *bin += 1;
        }
    }
    bins
}

/// Compute the levels `correct` would apply to `frame`.
pub fn measure(frame: &RgbImage, clip_percent: f64) -> Levels {
    Levels::from_histogram(&histogram(frame), clip_percent)
}

/// Stretch brightness and contrast of `frame` in place and return it.
///
/// Levels come from luminance but the same map is applied to all three
/// channels, so hues are preserved.
pub fn correct(mut frame: RgbImage, clip_percent: f64) -> RgbImage {
    let levels = measure(&frame, clip_percent);
    log::debug!(
        "auto exposure: low={} high={} alpha={:.3} beta={:.1}",
        levels.low,
        levels.high,
        levels.alpha,
        levels.beta
    );
    if levels.is_identity() {
        return frame;
    }

    let table = levels.lookup_table();
    for channel in frame.iter_mut() {
        *channel = table.get(usize::from(*channel)).copied().unwrap_or(*channel);
    }
    frame
}
