use image::{GenericImageView, Rgba};

use crate::error::HashError;
use crate::fingerprint::Fingerprint;
use crate::preprocess::{ensure_not_empty, weighted_luma};

const HUE_BUCKETS: usize = 6;
/// black fraction, gray fraction, then faint and bright hue buckets
const VALUES: usize = 2 + 2 * HUE_BUCKETS;

const BLACK_LUMA: u8 = (256 / 8) as u8;
const GRAY_SATURATION: u8 = (256 / 3) as u8;
const FAINT_SATURATION: u8 = (256 * 2 / 3) as u8;

/// Hue and saturation of an RGB sample, both rescaled to `0..=255`.
fn hue_saturation(pixel: &Rgba<u8>) -> (u8, u8) {
    let [r, g, b, _] = pixel.0.map(|v| f64::from(v) / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    let saturation = if max == 0.0 { 0.0 } else { delta / max };

    ((hue / 360.0 * 255.0) as u8, (saturation * 255.0) as u8)
}

fn hue_bucket(hue: u8) -> usize {
    ((f64::from(hue) / (255.0 / HUE_BUCKETS as f64)) as usize).min(HUE_BUCKETS - 1)
}

/// Color hash: fractions of black and gray pixels plus a coarse hue histogram
/// of the remaining faint and bright colors, each quantized to `binbits` bits.
///
/// The result is a `14 x binbits` matrix. It is only comparable with other
/// color hashes of the same `binbits`.
pub fn color_hash<I>(image: &I, binbits: usize) -> Result<Fingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    if binbits == 0 || binbits > 32 {
        return Err(HashError::InvalidSize {
            size: binbits,
            reason: "color hash needs between 1 and 32 bits per bucket",
        });
    }
    ensure_not_empty(image)?;

    let mut black = 0usize;
    let mut gray = 0usize;
    let mut colors = 0usize;
    let mut faint = [0usize; HUE_BUCKETS];
    let mut bright = [0usize; HUE_BUCKETS];

    for (_, _, pixel) in image.pixels() {
        // unrounded: 31.9 is still black
        if weighted_luma(&pixel) < f64::from(BLACK_LUMA) {
            black += 1;
            continue;
        }
        let (hue, saturation) = hue_saturation(&pixel);
        if saturation < GRAY_SATURATION {
            gray += 1;
        } else {
            colors += 1;
            let bucket = hue_bucket(hue);
            if saturation < FAINT_SATURATION {
                faint[bucket] += 1;
            } else {
                bright[bucket] += 1;
            }
        }
    }

    let (width, height) = image.dimensions();
    let total = f64::from(width) * f64::from(height);
    let max_value = (1u64 << binbits) as f64;
    let quantize = |fraction: f64| (fraction * max_value).min(max_value - 1.0) as u64;
    let color_divisor = colors.max(1) as f64;

    let mut values = Vec::with_capacity(VALUES);
    values.push(quantize(black as f64 / total));
    values.push(quantize(gray as f64 / total));
    values.extend(faint.iter().map(|&n| quantize(n as f64 / color_divisor)));
    values.extend(bright.iter().map(|&n| quantize(n as f64 / color_divisor)));

    Ok(Fingerprint::from_fn(VALUES, binbits, |r, c| {
        (values[r] >> (binbits - 1 - c)) & 1 == 1
    }))
}
