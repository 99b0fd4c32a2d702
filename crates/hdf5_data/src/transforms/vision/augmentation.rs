use crate::transforms::rng::TransformRng;
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Result};
use image::{ImageBuffer, RgbImage};

// ============================================================================
// RandomHorizontalFlip
// ============================================================================

/// Randomly flips images horizontally during training.
///
/// # Example
/// ```ignore
/// let flip = RandomHorizontalFlip::new(0.5, TransformRng::seeded(42))?; // 50% flip chance
/// let augmented = flip.apply(image)?;
/// ```
#[derive(Debug)]
pub struct RandomHorizontalFlip {
    p: f64,
    rng: TransformRng,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64, rng: TransformRng) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&p),
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        );
        Ok(Self { p, rng })
    }

    /// Flips an RGB8 image horizontally row by row
    fn flip_rgb8(img: RgbImage) -> Result<RgbImage> {
        let (width, height) = img.dimensions();
        let width_usize = width as usize;
        let source_pixels = img.into_raw();

        let mut flipped_pixels = Vec::with_capacity(source_pixels.len());
        for row in source_pixels.chunks_exact(width_usize * 3) {
            for pixel in row.chunks_exact(3).rev() {
                flipped_pixels.extend_from_slice(pixel);
            }
        }

        ImageBuffer::from_raw(width, height, flipped_pixels)
            .ok_or_else(|| anyhow!("Failed to create flipped image buffer"))
    }
}

impl Transform<RgbImage, RgbImage> for RandomHorizontalFlip {
    fn apply(&self, img: RgbImage) -> Result<RgbImage> {
        if img.width() == 0 {
            return Ok(img);
        }
        match self.p {
            // Fast path: never flip
            p if p <= 0.0 => Ok(img),
            // Fast path: always flip
            p if p >= 1.0 => Self::flip_rgb8(img),
            _ if self.rng.gen_bool(self.p) => Self::flip_rgb8(img),
            _ => Ok(img),
        }
    }
}
