//! Crop-resistant multi-fingerprints.
//!
//! The image is reduced to a small blurred luma grid, split into bright and
//! dark connected regions, and every region's bounding box is fingerprinted
//! on the original image. Two images match when enough regions of one find a
//! close fingerprint among the regions of the other, so cropping away part of
//! an image leaves the surviving regions comparable.

mod multihash;
mod segment;

use image::{GenericImageView, Rgba};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::HashError;
use crate::hashes::{Algorithm, SegmentHasher};
use crate::preprocess::{preprocess, PixelMatrix};

pub use multihash::MultiFingerprint;
pub use segment::{find_segments, BoundingBox, Segment};

/// How segment boxes are scaled from the segmentation grid back to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoxRounding {
    #[default]
    Truncate,
    Round,
}

impl BoxRounding {
    fn apply(self, value: f64) -> u32 {
        match self {
            BoxRounding::Truncate => value as u32,
            BoxRounding::Round => value.round() as u32,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Fingerprint computed for every segment.
    pub algorithm: Algorithm,
    pub hash_size: usize,
    /// Keep at most this many segments, largest first. 0 keeps all.
    pub limit_segments: usize,
    /// Luma above this value counts as bright.
    pub segment_threshold: u8,
    /// Regions of this many grid cells or fewer are ignored.
    pub min_segment_size: usize,
    /// Side of the square grid the image is segmented on.
    pub segmentation_image_size: u32,
    pub box_rounding: BoxRounding,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Difference,
            hash_size: 8,
            limit_segments: 0,
            segment_threshold: 128,
            min_segment_size: 500,
            segmentation_image_size: 300,
            box_rounding: BoxRounding::Truncate,
        }
    }
}

/// Downscale to a `size x size` luma grid and blur it twice with a 3x3 box.
pub fn segmentation_grid<I>(image: &I, size: u32) -> Result<PixelMatrix, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let pixels = preprocess(image, size, size)?;
    Ok(pixels.box_blur(1).box_blur(1))
}

/// Map a segment's grid box onto a pixel rectangle `(x, y, width, height)`,
/// clamped to the image.
fn pixel_rect(
    bounds: BoundingBox,
    grid_size: u32,
    (width, height): (u32, u32),
    rounding: BoxRounding,
) -> (u32, u32, u32, u32) {
    let scale_w = f64::from(width) / f64::from(grid_size);
    let scale_h = f64::from(height) / f64::from(grid_size);

    let x0 = rounding.apply(bounds.min_col as f64 * scale_w).min(width);
    let y0 = rounding.apply(bounds.min_row as f64 * scale_h).min(height);
    let x1 = rounding.apply((bounds.max_col + 1) as f64 * scale_w).min(width);
    let y1 = rounding.apply((bounds.max_row + 1) as f64 * scale_h).min(height);
    (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
}

/// Crop-resistant hash with the configured algorithm.
pub fn crop_resistant_hash<I>(image: &I, config: &CropConfig) -> Result<MultiFingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    crop_resistant_hash_with(image, &config.algorithm, config)
}

/// Crop-resistant hash with a caller-supplied per-segment fingerprint.
///
/// Segments whose fingerprint fails are skipped. The result is empty only if
/// every segment failed; `config.algorithm` is ignored in favour of `hasher`.
pub fn crop_resistant_hash_with<I, H>(
    image: &I,
    hasher: &H,
    config: &CropConfig,
) -> Result<MultiFingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
    H: SegmentHasher,
{
    let dimensions = image.dimensions();
    if dimensions.0 == 0 || dimensions.1 == 0 {
        return Err(HashError::SegmentationUnsupported {
            message: format!(
                "{}x{} image has no region to segment",
                dimensions.0, dimensions.1
            ),
        });
    }
    let grid_size = config.segmentation_image_size;
    if grid_size == 0 {
        return Err(HashError::InvalidSize {
            size: 0,
            reason: "segmentation image size must be at least 1",
        });
    }

    let grid = segmentation_grid(image, grid_size)?;
    let segments = find_segments(
        &grid,
        config.segment_threshold,
        config.min_segment_size,
        config.limit_segments,
    );
    debug!(
        "segmented {}x{} image into {} region(s)",
        dimensions.0,
        dimensions.1,
        segments.len()
    );

    let mut hashes = Vec::with_capacity(segments.len());
    for (idx, segment) in segments.iter().enumerate() {
        let (x, y, w, h) = pixel_rect(segment.bounds(), grid_size, dimensions, config.box_rounding);
        if w == 0 || h == 0 {
            debug!("segment {} maps to an empty {}x{} crop, skipping", idx, w, h);
            continue;
        }
        let crop = image.view(x, y, w, h);
        match hasher.hash(&*crop, config.hash_size) {
            Ok(fp) => hashes.push(fp),
            Err(e) => debug!("segment {} ({}x{} at {},{}) skipped: {}", idx, w, h, x, y, e),
        }
    }

    if hashes.is_empty() {
        warn!("no segment of the {}x{} image could be fingerprinted", dimensions.0, dimensions.1);
    }
    Ok(MultiFingerprint::new(hashes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::hashes::test_images::uniform;
    use image::{imageops, RgbaImage};

    const BACKGROUND: u8 = 100;

    /// Dark background with two bright blocks, each carrying a horizontal
    /// ramp so its difference hash is distinctive.
    fn two_blocks() -> RgbaImage {
        RgbaImage::from_fn(600, 600, |x, y| {
            let v = if (60..210).contains(&x) && (60..210).contains(&y) {
                255 - (x - 60) * 95 / 150
            } else if (300..450).contains(&x) && (350..500).contains(&y) {
                160 + (x - 300) * 95 / 150
            } else {
                u32::from(BACKGROUND)
            };
            let v = v as u8;
            Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn test_uniform_image_single_segment() {
        let img = uniform(400, 300, 90);
        let h = crop_resistant_hash(&img, &CropConfig::default()).unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_identity_matches() {
        let img = two_blocks();
        let h = crop_resistant_hash(&img, &CropConfig::default()).unwrap();
        assert_eq!(h.len(), 3, "two bright blocks and the background");
        assert!(h.matches(&h, 1, 0.25));
        assert_eq!(h.hash_diff(&h, 0.0), (h.len(), 0));
    }

    #[test]
    fn test_partial_crop_still_matches() {
        let _ = env_logger::builder().is_test(true).try_init();
        let original = two_blocks();
        // drop the right 30%
        let cropped = imageops::crop_imm(&original, 0, 0, 420, 600).to_image();

        let config = CropConfig::default();
        let a = crop_resistant_hash(&original, &config).unwrap();
        let b = crop_resistant_hash(&cropped, &config).unwrap();
        assert!(!a.is_empty() && !b.is_empty());

        assert!(a.matches(&b, 1, 0.25));
        assert!(!a.matches(&b, a.len() + 1, 0.25));
    }

    #[test]
    fn test_limit_segments() {
        let config = CropConfig {
            limit_segments: 1,
            ..CropConfig::default()
        };
        let h = crop_resistant_hash(&two_blocks(), &config).unwrap();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_failing_segments_are_skipped() {
        struct WideOnly;
        impl SegmentHasher for WideOnly {
            fn hash<I>(&self, image: &I, size: usize) -> Result<Fingerprint, HashError>
            where
                I: GenericImageView<Pixel = Rgba<u8>>,
            {
                if image.width() < 500 {
                    return Err(HashError::InvalidSize { size, reason: "too narrow" });
                }
                crate::hashes::average_hash(image, size)
            }
        }

        let img = two_blocks();
        let config = CropConfig::default();
        // only the background spans the full width
        let h = crop_resistant_hash_with(&img, &WideOnly, &config).unwrap();
        assert_eq!(h.len(), 1);

        let tiny = CropConfig { hash_size: 1, ..config };
        let none = crop_resistant_hash(&img, &tiny).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_empty_image_is_unsupported() {
        let img = RgbaImage::new(0, 10);
        assert!(matches!(
            crop_resistant_hash(&img, &CropConfig::default()),
            Err(HashError::SegmentationUnsupported { .. })
        ));
    }

    #[test]
    fn test_pixel_rect_scaling() {
        let bounds = BoundingBox { min_row: 10, min_col: 20, max_row: 29, max_col: 39 };
        assert_eq!(
            pixel_rect(bounds, 300, (600, 450), BoxRounding::Truncate),
            (40, 15, 40, 30)
        );
        // 1/3 scale: truncation and rounding disagree
        let odd = BoundingBox { min_row: 0, min_col: 2, max_row: 0, max_col: 4 };
        assert_eq!(pixel_rect(odd, 3, (1, 1), BoxRounding::Truncate), (0, 0, 1, 0));
        assert_eq!(pixel_rect(odd, 3, (1, 1), BoxRounding::Round), (1, 0, 0, 0));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: CropConfig =
            serde_json::from_str(r#"{"hash_size": 16, "box_rounding": "round"}"#).unwrap();
        assert_eq!(config.hash_size, 16);
        assert_eq!(config.box_rounding, BoxRounding::Round);
        assert_eq!(config.min_segment_size, 500);
        assert_eq!(config.algorithm, Algorithm::Difference);
    }
}
