//! Wavelet hash on a Haar decomposition.
//!
//! Best effort: edge handling is plain pairwise averaging and is not meant to
//! match any particular wavelet library bit for bit.

use std::f64::consts::SQRT_2;

use image::{GenericImageView, Rgba};

use crate::error::HashError;
use crate::fingerprint::Fingerprint;
use crate::preprocess::{ensure_not_empty, preprocess, PixelMatrix};

/// Detail bands of one decomposition level.
#[derive(Debug, Clone)]
pub struct HaarDetail {
    /// low-pass across rows, high-pass down columns
    pub lh: PixelMatrix,
    /// high-pass across rows, low-pass down columns
    pub hl: PixelMatrix,
    pub hh: PixelMatrix,
}

#[derive(Debug, Clone)]
pub struct HaarDecomposition {
    /// Approximation band after the last level.
    pub ll: PixelMatrix,
    /// Detail bands, coarsest level first.
    pub details: Vec<HaarDetail>,
}

fn haar_level(input: &PixelMatrix) -> (PixelMatrix, HaarDetail) {
    let half_rows = input.rows() / 2;
    let half_cols = input.cols() / 2;

    // Along rows: pair sums on the left half, pair differences on the right.
    let by_rows = PixelMatrix::from_fn(input.rows(), half_cols * 2, |r, c| {
        let pair = if c < half_cols { c } else { c - half_cols };
        let a = input.get(r, 2 * pair);
        let b = input.get(r, 2 * pair + 1);
        if c < half_cols { (a + b) / SQRT_2 } else { (a - b) / SQRT_2 }
    });

    let band = |col_offset: usize, high: bool| {
        PixelMatrix::from_fn(half_rows, half_cols, |r, c| {
            let a = by_rows.get(2 * r, c + col_offset);
            let b = by_rows.get(2 * r + 1, c + col_offset);
            if high { (a - b) / SQRT_2 } else { (a + b) / SQRT_2 }
        })
    };

    let ll = band(0, false);
    let detail = HaarDetail {
        lh: band(0, true),
        hl: band(half_cols, false),
        hh: band(half_cols, true),
    };
    (ll, detail)
}

/// Apply `levels` rounds of 2D Haar decomposition, recursing on the LL band.
pub fn haar_decompose(data: &PixelMatrix, levels: usize) -> Result<HaarDecomposition, HashError> {
    if levels < 1 {
        return Err(HashError::Decomposition {
            message: "decomposition level must be at least 1".to_string(),
        });
    }

    let mut ll = data.clone();
    let mut details = Vec::with_capacity(levels);
    for level in 0..levels {
        if ll.rows() < 2 || ll.cols() < 2 {
            return Err(HashError::Decomposition {
                message: format!(
                    "{}x{} band cannot be split at level {}",
                    ll.rows(),
                    ll.cols(),
                    level + 1
                ),
            });
        }
        let (next, detail) = haar_level(&ll);
        details.push(detail);
        ll = next;
    }
    details.reverse();
    Ok(HaarDecomposition { ll, details })
}

/// Wavelet hash: the LL band of a Haar decomposition against its median.
///
/// `size` must be a power of two. The image is resampled to the largest power
/// of two that fits its shorter side (never below `size`) and decomposed until
/// the LL band is `size x size`.
pub fn wavelet_hash<I>(image: &I, size: usize) -> Result<Fingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    if size < 2 || !size.is_power_of_two() {
        return Err(HashError::InvalidSize {
            size,
            reason: "wavelet hash size must be a power of two, at least 2",
        });
    }
    ensure_not_empty(image)?;

    let (width, height) = image.dimensions();
    let image_scale = (1usize << width.min(height).ilog2()).max(size);
    let levels = (image_scale.ilog2() - size.ilog2()) as usize;
    if levels < 1 {
        return Err(HashError::Decomposition {
            message: format!(
                "{}x{} image is too small for a {}x{} wavelet hash",
                width, height, size, size
            ),
        });
    }

    let pixels = preprocess(image, image_scale as u32, image_scale as u32)?.map(|v| v / 255.0);
    let decomposition = haar_decompose(&pixels, levels)?;
    let low = decomposition.ll;
    let med = low.median();
    Ok(Fingerprint::from_fn(low.rows(), low.cols(), |r, c| {
        low.get(r, c) > med
    }))
}
