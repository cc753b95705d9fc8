use image::imageops::{self, FilterType};
use image::{GenericImageView, Rgba};

use crate::error::HashError;

/// Row-major grid of intensity samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl PixelMatrix {
    pub(crate) fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols, "pixel data does not match {}x{}", rows, cols);
        Self { rows, cols, data }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Lower median: the smallest sample at or above half of the distribution.
    pub fn median(&self) -> f64 {
        median(&self.data)
    }

    /// Copy out the top-left `rows x cols` block.
    pub fn top_left(&self, rows: usize, cols: usize) -> PixelMatrix {
        PixelMatrix::from_fn(rows, cols, |r, c| self.get(r, c))
    }

    pub fn map(mut self, f: impl Fn(f64) -> f64) -> Self {
        self.data.iter_mut().for_each(|v| *v = f(*v));
        self
    }

    /// Mean filter over a `(2r+1)^2` window, clipped at the borders.
    pub fn box_blur(&self, radius: usize) -> PixelMatrix {
        if radius == 0 {
            return self.clone();
        }
        PixelMatrix::from_fn(self.rows, self.cols, |r, c| {
            let r0 = r.saturating_sub(radius);
            let r1 = (r + radius).min(self.rows - 1);
            let c0 = c.saturating_sub(radius);
            let c1 = (c + radius).min(self.cols - 1);
            let mut sum = 0.0;
            for rr in r0..=r1 {
                sum += self.row(rr)[c0..=c1].iter().sum::<f64>();
            }
            sum / ((r1 - r0 + 1) * (c1 - c0 + 1)) as f64
        })
    }
}

pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted[(sorted.len() - 1) / 2]
}

/// ITU-R 601 weighted luma of an RGB sample, unrounded.
#[inline]
pub fn weighted_luma(pixel: &Rgba<u8>) -> f64 {
    let [r, g, b, _] = pixel.0;
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// ITU-R 601 luma of an RGB sample, rounded to the 8-bit grid.
#[inline]
pub fn luma(pixel: &Rgba<u8>) -> u8 {
    weighted_luma(pixel).round().min(255.0) as u8
}

pub(crate) fn ensure_not_empty<I>(image: &I) -> Result<(), HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(HashError::EmptyImage { width, height });
    }
    Ok(())
}

/// Resample to exactly `width x height` with Lanczos3, then reduce to luma.
pub fn preprocess<I>(image: &I, width: u32, height: u32) -> Result<PixelMatrix, HashError>
where
    I: GenericImageView<Pixel = Rgba<u8>>,
{
    if width == 0 || height == 0 {
        return Err(HashError::InvalidSize {
            size: width.min(height) as usize,
            reason: "target dimensions must be at least 1",
        });
    }
    ensure_not_empty(image)?;

    let resized = imageops::resize(image, width, height, FilterType::Lanczos3);
    let data = resized.pixels().map(|p| f64::from(luma(p))).collect();
    Ok(PixelMatrix::new(height as usize, width as usize, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_preprocess_dimensions() {
        let img = RgbaImage::from_fn(40, 30, |x, _| Rgba([(x * 6) as u8, 0, 0, 255]));
        let pixels = preprocess(&img, 9, 8).unwrap();
        assert_eq!(pixels.rows(), 8);
        assert_eq!(pixels.cols(), 9);
    }

    #[test]
    fn test_preprocess_uniform_stays_uniform() {
        let img = RgbaImage::from_pixel(20, 20, Rgba([100, 100, 100, 255]));
        let pixels = preprocess(&img, 5, 5).unwrap();
        assert!(pixels.as_slice().iter().all(|&v| (v - 100.0).abs() <= 1.0));
    }

    #[test]
    fn test_preprocess_rejects_zero_sizes() {
        let img = RgbaImage::new(4, 4);
        assert!(matches!(
            preprocess(&img, 0, 4),
            Err(HashError::InvalidSize { .. })
        ));
        let empty = RgbaImage::new(0, 4);
        assert!(matches!(
            preprocess(&empty, 4, 4),
            Err(HashError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_luma_weights() {
        assert_eq!(luma(&Rgba([255, 255, 255, 255])), 255);
        assert_eq!(luma(&Rgba([0, 0, 0, 255])), 0);
        assert_eq!(luma(&Rgba([255, 0, 0, 255])), 76);
        assert_eq!(luma(&Rgba([0, 255, 0, 255])), 150);
        // 31.886 rounds up on the 8-bit grid
        let dim = Rgba([32, 32, 31, 255]);
        assert_eq!(luma(&dim), 32);
        assert!(weighted_luma(&dim) < 32.0);
    }

    #[test]
    fn test_median_and_mean() {
        let m = PixelMatrix::new(2, 2, vec![4.0, 1.0, 3.0, 2.0]);
        assert_eq!(m.median(), 2.0);
        assert_eq!(m.mean(), 2.5);
        let odd = PixelMatrix::new(1, 3, vec![9.0, 1.0, 5.0]);
        assert_eq!(odd.median(), 5.0);
    }

    #[test]
    fn test_box_blur_smooths_spike() {
        let m = PixelMatrix::from_fn(3, 3, |r, c| if r == 1 && c == 1 { 9.0 } else { 0.0 });
        let blurred = m.box_blur(1);
        assert_eq!(blurred.get(1, 1), 1.0);
        // corner sees a 2x2 window containing the spike
        assert_eq!(blurred.get(0, 0), 9.0 / 4.0);
    }
}
