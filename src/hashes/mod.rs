//! Single-image fingerprint algorithms.

mod average;
mod color;
mod difference;
mod perceptual;
mod wavelet;

use std::fmt;
use std::str::FromStr;

use image::{GenericImageView, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::HashError;
use crate::fingerprint::Fingerprint;

pub use average::average_hash;
pub use color::color_hash;
pub use difference::{difference_hash, difference_hash_vertical};
pub use perceptual::{dct_2d, perceptual_hash};
pub use wavelet::{haar_decompose, wavelet_hash};

pub const DEFAULT_HIGHFREQ_FACTOR: usize = 4;

/// A fingerprint function over an image and a hash size.
///
/// The crop-resistant engine calls this once per segment crop, so
/// implementations see non-copying sub-image views as well as whole images.
pub trait SegmentHasher {
    fn hash<I>(&self, image: &I, size: usize) -> Result<Fingerprint, HashError>
    where
        I: GenericImageView<Pixel = Rgba<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Algorithm {
    Average,
    #[default]
    Difference,
    DifferenceVertical,
    Perceptual {
        highfreq_factor: usize,
    },
    Wavelet,
    /// `size` is taken as the number of bits per bucket.
    Color,
}

impl SegmentHasher for Algorithm {
    fn hash<I>(&self, image: &I, size: usize) -> Result<Fingerprint, HashError>
    where
        I: GenericImageView<Pixel = Rgba<u8>>,
    {
        match *self {
            Algorithm::Average => average_hash(image, size),
            Algorithm::Difference => difference_hash(image, size),
            Algorithm::DifferenceVertical => difference_hash_vertical(image, size),
            Algorithm::Perceptual { highfreq_factor } => {
                perceptual_hash(image, size, highfreq_factor)
            }
            Algorithm::Wavelet => wavelet_hash(image, size),
            Algorithm::Color => color_hash(image, size),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Average => "average",
            Algorithm::Difference => "difference",
            Algorithm::DifferenceVertical => "difference-vertical",
            Algorithm::Perceptual { .. } => "perceptual",
            Algorithm::Wavelet => "wavelet",
            Algorithm::Color => "color",
        };
        f.write_str(name)
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "average" | "ahash" => Ok(Algorithm::Average),
            "difference" | "dhash" => Ok(Algorithm::Difference),
            "difference-vertical" | "dhash-vertical" => Ok(Algorithm::DifferenceVertical),
            "perceptual" | "phash" => Ok(Algorithm::Perceptual {
                highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
            }),
            "wavelet" | "whash" => Ok(Algorithm::Wavelet),
            "color" | "colorhash" => Ok(Algorithm::Color),
            other => Err(format!("unknown hash algorithm: {}", other)),
        }
    }
}

pub(crate) fn check_hash_size(size: usize) -> Result<(), HashError> {
    if size < 2 {
        return Err(HashError::InvalidSize {
            size,
            reason: "hash size must be at least 2",
        });
    }
    Ok(())
}
