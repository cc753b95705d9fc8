use image::{GenericImageView, Rgba};

use super::check_hash_size;
use crate::error::HashError;
use crate::fingerprint::Fingerprint;
use crate::preprocess::preprocess;

/// Average hash: each downscaled sample compared against the mean of all samples.
pub fn average_hash<I>(image: &I, size: usize) -> Result<Fingerprint, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    check_hash_size(size)?;
    let pixels = preprocess(image, size as u32, size as u32)?;
    let avg = pixels.mean();
    Ok(Fingerprint::from_fn(size, size, |r, c| pixels.get(r, c) > avg))
}
