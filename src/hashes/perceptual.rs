use std::f64::consts::PI;

use image::{GenericImageView, Rgba};

use super::check_hash_size;
use crate::error::HashError;
use crate::fingerprint::Fingerprint;
use crate::preprocess::{median, preprocess, PixelMatrix};

/// Orthonormal DCT-II of one line of samples.
fn dct_1d(input: &[f64], output: &mut [f64]) {
    let n = input.len();
    let factor = PI / n as f64;
    let scale0 = (1.0 / n as f64).sqrt();
    let scale = (2.0 / n as f64).sqrt();
    for (k, out) in output.iter_mut().enumerate() {
        let sum: f64 = input
            .iter()
            .enumerate()
            .map(|(j, &x)| x * (k as f64 * factor * (j as f64 + 0.5)).cos())
            .sum();
        *out = sum * if k == 0 { scale0 } else { scale };
    }
}

/// Separable 2D DCT-II: rows first, then the columns of the result.
pub fn dct_2d(pixels: &PixelMatrix) -> PixelMatrix {
    let (rows, cols) = (pixels.rows(), pixels.cols());
    let mut by_rows = vec![0.0; rows * cols];
    for (r, out) in by_rows.chunks_mut(cols.max(1)).enumerate().take(rows) {
        dct_1d(pixels.row(r), out);
    }

    let mut result = vec![0.0; rows * cols];
    let mut column = vec![0.0; rows];
    let mut transformed = vec![0.0; rows];
    for c in 0..cols {
        for r in 0..rows {
            column[r] = by_rows[r * cols + c];
        }
        dct_1d(&column, &mut transformed);
        for r in 0..rows {
            result[r * cols + c] = transformed[r];
        }
    }
    PixelMatrix::new(rows, cols, result)
}

/// Perceptual hash: low-frequency DCT coefficients against their median.
///
/// The image is resampled to `size * highfreq_factor` square before the
/// transform; only the top-left `size x size` block (DC term included) is kept.
pub fn perceptual_hash<I>(
    image: &I,
    size: usize,
    highfreq_factor: usize,
) -> Result<Fingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    check_hash_size(size)?;
    if highfreq_factor == 0 {
        return Err(HashError::InvalidSize {
            size: highfreq_factor,
            reason: "high-frequency factor must be at least 1",
        });
    }
    let side = (size * highfreq_factor) as u32;
    let pixels = preprocess(image, side, side)?;
    let low = dct_2d(&pixels).top_left(size, size);
    let med = median(low.as_slice());
    Ok(Fingerprint::from_fn(size, size, |r, c| low.get(r, c) > med))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashes::test_images::{gradient, uniform};

    #[test]
    fn test_dct_of_constant_is_dc_only() {
        let m = PixelMatrix::from_fn(4, 4, |_, _| 2.0);
        let dct = dct_2d(&m);
        // orthonormal: DC = mean * sqrt(n*m)
        assert!((dct.get(0, 0) - 8.0).abs() < 1e-9);
        for (i, v) in dct.as_slice().iter().enumerate().skip(1) {
            assert!(v.abs() < 1e-9, "coefficient {} = {}", i, v);
        }
    }

    #[test]
    fn test_dct_preserves_energy() {
        let m = PixelMatrix::from_fn(8, 8, |r, c| ((r * 7 + c * 3) % 11) as f64);
        let dct = dct_2d(&m);
        let energy_in: f64 = m.as_slice().iter().map(|v| v * v).sum();
        let energy_out: f64 = dct.as_slice().iter().map(|v| v * v).sum();
        assert!((energy_in - energy_out).abs() < 1e-6);
    }

    #[test]
    fn test_perceptual_hash_shape() {
        let fp = perceptual_hash(&gradient(128, 128), 8, 4).unwrap();
        assert_eq!(fp.rows(), 8);
        assert_eq!(fp.cols(), 8);
        let ones = fp.count_ones();
        assert!(ones > 0 && ones < 64);
        // DC term dominates a bright-ish image
        assert_eq!(fp.get(0, 0), Some(true));
    }

    #[test]
    fn test_perceptual_hash_deterministic() {
        let img = gradient(96, 64);
        let a = perceptual_hash(&img, 8, 4).unwrap();
        let b = perceptual_hash(&img, 8, 4).unwrap();
        assert_eq!(a.distance(&b).unwrap(), 0);
        assert_eq!(perceptual_hash(&uniform(8, 8, 10), 8, 4).unwrap().bit_len(), 64);
    }

    #[test]
    fn test_perceptual_hash_invalid_arguments() {
        let img = gradient(32, 32);
        assert!(perceptual_hash(&img, 1, 4).is_err());
        assert!(perceptual_hash(&img, 8, 0).is_err());
    }
}
