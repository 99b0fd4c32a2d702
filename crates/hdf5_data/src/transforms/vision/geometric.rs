use crate::transforms::rng::TransformRng;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{imageops, RgbImage};

fn check_fits(size: u32, img: &RgbImage) -> Result<()> {
    let (width, height) = img.dimensions();
    ensure!(
        width >= size && height >= size,
        "Crop size {} exceeds image dimensions {}x{}",
        size,
        width,
        height
    );
    Ok(())
}

// ============================================================================
// CenterCrop
// ============================================================================

/// Crops a `size`×`size` square from the middle of the image.
/// Used in the test phase, where crops must be deterministic.
///
/// # Example
/// ```ignore
/// let crop = CenterCrop::new(224)?;
/// let cropped = crop.apply(image)?; // 224x224
/// ```
#[derive(Debug, Clone)]
pub struct CenterCrop {
    size: u32,
}

impl CenterCrop {
    pub fn new(size: u32) -> Result<Self> {
        ensure!(size > 0, "Crop size must be positive");
        Ok(Self { size })
    }
}

impl Transform<RgbImage, RgbImage> for CenterCrop {
    fn apply(&self, img: RgbImage) -> Result<RgbImage> {
        check_fits(self.size, &img)?;
        let x = (img.width() - self.size) / 2;
        let y = (img.height() - self.size) / 2;
        Ok(imageops::crop_imm(&img, x, y, self.size, self.size).to_image())
    }
}

// ============================================================================
// RandomCrop
// ============================================================================

/// Crops a `size`×`size` square at a uniformly random offset drawn from `rng`.
#[derive(Debug, Clone)]
pub struct RandomCrop {
    size: u32,
    rng: TransformRng,
}

impl RandomCrop {
    pub fn new(size: u32, rng: TransformRng) -> Result<Self> {
        ensure!(size > 0, "Crop size must be positive");
        Ok(Self { size, rng })
    }
}

impl Transform<RgbImage, RgbImage> for RandomCrop {
    fn apply(&self, img: RgbImage) -> Result<RgbImage> {
        check_fits(self.size, &img)?;
        let y = self.rng.gen_range(0..=img.height() - self.size);
        let x = self.rng.gen_range(0..=img.width() - self.size);
        Ok(imageops::crop_imm(&img, x, y, self.size, self.size).to_image())
    }
}
