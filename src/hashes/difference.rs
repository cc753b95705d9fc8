use image::{GenericImageView, Rgba};

use super::check_hash_size;
use crate::error::HashError;
use crate::fingerprint::Fingerprint;
use crate::preprocess::preprocess;

/// Horizontal difference hash: is each sample darker than its right neighbour.
pub fn difference_hash<I>(image: &I, size: usize) -> Result<Fingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    check_hash_size(size)?;
    let pixels = preprocess(image, size as u32 + 1, size as u32)?;
    Ok(Fingerprint::from_fn(size, size, |r, c| {
        pixels.get(r, c + 1) > pixels.get(r, c)
    }))
}

/// Vertical difference hash: is each sample darker than the one below it.
pub fn difference_hash_vertical<I>(image: &I, size: usize) -> Result<Fingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    check_hash_size(size)?;
    let pixels = preprocess(image, size as u32, size as u32 + 1)?;
    Ok(Fingerprint::from_fn(size, size, |r, c| {
        pixels.get(r + 1, c) > pixels.get(r, c)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn horizontal_ramp() -> RgbaImage {
        RgbaImage::from_fn(90, 80, |x, _| {
            let v = (x * 255 / 89) as u8;
            Rgba([v, v, v, 255])
        })
    }

    #[test]
    fn test_horizontal_ramp() {
        let img = horizontal_ramp();
        let fp = difference_hash(&img, 8).unwrap();
        assert_eq!(fp.bit_len(), 64);
        assert_eq!(fp.count_ones(), 64);

        // No vertical change in a horizontal ramp.
        let vertical = difference_hash_vertical(&img, 8).unwrap();
        assert_eq!(vertical.count_ones(), 0);
    }

    #[test]
    fn test_vertical_ramp() {
        let img = RgbaImage::from_fn(80, 90, |_, y| {
            let v = (y * 255 / 89) as u8;
            Rgba([v, v, v, 255])
        });
        assert_eq!(difference_hash_vertical(&img, 8).unwrap().count_ones(), 64);
        assert_eq!(difference_hash(&img, 8).unwrap().count_ones(), 0);
    }

    #[test]
    fn test_difference_hash_rejects_small_size() {
        let img = horizontal_ramp();
        assert!(difference_hash(&img, 0).is_err());
        assert!(difference_hash_vertical(&img, 1).is_err());
    }
}
