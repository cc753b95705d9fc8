use image::{GenericImageView, Rgba};
use serde::{Deserialize, Serialize};

use crate::crop::{crop_resistant_hash, CropConfig, MultiFingerprint};
use crate::error::HashError;
use crate::fingerprint::Fingerprint;
use crate::hashes::{
    average_hash, color_hash, difference_hash, perceptual_hash, wavelet_hash,
    DEFAULT_HIGHFREQ_FACTOR,
};

/// Every fingerprint of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerceptualHash {
    pub ahash: Fingerprint,
    pub dhash: Fingerprint,
    pub phash: Fingerprint,
    pub whash: Fingerprint,
    pub colorhash: Fingerprint,
    pub crop: MultiFingerprint,
}

impl PerceptualHash {
    /// The single-image fingerprint behind `field`; `None` for the crop field.
    pub fn field(&self, field: HashField) -> Option<&Fingerprint> {
        match field {
            HashField::AHash => Some(&self.ahash),
            HashField::DHash => Some(&self.dhash),
            HashField::PHash => Some(&self.phash),
            HashField::WHash => Some(&self.whash),
            HashField::ColorHash => Some(&self.colorhash),
            HashField::Crop => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashField {
    AHash,
    DHash,
    PHash,
    WHash,
    ColorHash,
    Crop,
}

impl HashField {
    pub const SCALAR: [HashField; 5] = [
        HashField::AHash,
        HashField::DHash,
        HashField::PHash,
        HashField::WHash,
        HashField::ColorHash,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashSettings {
    pub hash_size: usize,
    pub highfreq_factor: usize,
    pub color_binbits: usize,
    /// Fraction of bits two crop segments may differ in and still match.
    pub bit_error_rate: f64,
    pub crop: CropConfig,
}

impl Default for HashSettings {
    fn default() -> Self {
        Self {
            hash_size: 8,
            highfreq_factor: DEFAULT_HIGHFREQ_FACTOR,
            color_binbits: 3,
            bit_error_rate: 0.25,
            crop: CropConfig::default(),
        }
    }
}

/// Result of comparing one field of two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Distance(u32),
    Regions { matched: usize, distance: u32 },
}

pub struct PerceptualService {
    settings: HashSettings,
}

impl PerceptualService {
    pub fn new(settings: HashSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &HashSettings {
        &self.settings
    }

    /// Compute all six fingerprints in parallel. The first failure, in field
    /// order, is returned.
    pub fn compute<I>(&self, image: &I) -> Result<PerceptualHash, HashError>
    where
        I: GenericImageView<Pixel = Rgba<u8>> + Sync,
    {
        let s = &self.settings;
        let ((ahash, dhash), ((phash, whash), (colorhash, crop))) = rayon::join(
            || {
                rayon::join(
                    || average_hash(image, s.hash_size),
                    || difference_hash(image, s.hash_size),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || perceptual_hash(image, s.hash_size, s.highfreq_factor),
                            || wavelet_hash(image, s.hash_size),
                        )
                    },
                    || {
                        rayon::join(
                            || color_hash(image, s.color_binbits),
                            || crop_resistant_hash(image, &s.crop),
                        )
                    },
                )
            },
        );

        Ok(PerceptualHash {
            ahash: ahash?,
            dhash: dhash?,
            phash: phash?,
            whash: whash?,
            colorhash: colorhash?,
            crop: crop?,
        })
    }

    pub fn compare(
        &self,
        a: &PerceptualHash,
        b: &PerceptualHash,
        field: HashField,
    ) -> Result<Comparison, HashError> {
        if let (Some(x), Some(y)) = (a.field(field), b.field(field)) {
            return Ok(Comparison::Distance(x.distance(y)?));
        }
        let cutoff = a
            .crop
            .hamming_cutoff(self.settings.bit_error_rate)
            .unwrap_or(0.0);
        let (matched, distance) = a.crop.hash_diff(&b.crop, cutoff);
        Ok(Comparison::Regions { matched, distance })
    }

    /// Similarity in `0.0..=1.0`: the share of equal bits, or for the crop
    /// field the share of matched segments.
    pub fn calculate_similarity(
        &self,
        a: &PerceptualHash,
        b: &PerceptualHash,
        field: HashField,
    ) -> Result<f64, HashError> {
        let similarity = match self.compare(a, b, field)? {
            Comparison::Distance(d) => {
                let bits = a.field(field).map_or(1, |fp| fp.bit_len().max(1));
                1.0 - f64::from(d) / bits as f64
            }
            Comparison::Regions { .. } if a.crop.is_empty() => 0.0,
            Comparison::Regions { matched, .. } => matched as f64 / a.crop.len() as f64,
        };
        Ok(similarity)
    }

    /// Highest similarity over the single-image fingerprints.
    pub fn calculate_best_similarity(
        &self,
        a: &PerceptualHash,
        b: &PerceptualHash,
    ) -> Result<f64, HashError> {
        let mut best = 0.0f64;
        for field in HashField::SCALAR {
            best = best.max(self.calculate_similarity(a, b, field)?);
        }
        Ok(best)
    }
}

impl Default for PerceptualService {
    fn default() -> Self {
        Self::new(HashSettings::default())
    }
}
