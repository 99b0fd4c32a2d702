use crate::blob::{Blob, Element};
use crate::config::{Phase, TransformParam};
use crate::transforms::core::{Identity, Transform};
use crate::transforms::rng::TransformRng;
use crate::transforms::vision::{CenterCrop, RandomCrop, RandomHorizontalFlip};
use anyhow::{ensure, Result};
use image::RgbImage;

/// Turns one decoded color image into one sample of an output blob.
///
/// The data layer calls [`infer_shape`](Self::infer_shape) once at setup to
/// shape the output, then [`transform`](Self::transform) for every sample it
/// places in a batch, passing the output blob and the slot to fill.
pub trait DataTransformer<T: Element>: Send {
    /// Shape of one transformed sample for a `channels × height × width` input.
    fn infer_shape(&self, channels: usize, height: usize, width: usize) -> Vec<usize>;

    /// Writes the transformed `image` into sample `slot` of `output`.
    fn transform(&mut self, image: &RgbImage, output: &mut Blob<T>, slot: usize) -> Result<()>;

    /// Restarts the transformer's random choices from `seed`. Called once
    /// per layer setup. Deterministic transformers can ignore it.
    fn reseed(&mut self, _seed: u64) {}
}

/// The stock image transformer: crop, mirror, subtract mean, scale.
///
/// | Step   | Train phase                    | Test phase        |
/// |--------|--------------------------------|-------------------|
/// | crop   | random offset                  | centered          |
/// | mirror | with probability 0.5 if enabled| never             |
///
/// Each output value is `(pixel[c] - mean[c]) * scale`, written channel-major.
///
/// Random steps draw from an RNG owned by this transformer, seeded from the OS
/// until [`reseed`](DataTransformer::reseed) is called.
///
/// # Example
/// ```ignore
/// let param = TransformParam { crop_size: 224, mirror: true, ..Default::default() };
/// let mut transformer = ImageTransformer::new(param, Phase::Train)?;
/// transformer.transform(&image, &mut top, 0)?;
/// ```
pub struct ImageTransformer {
    param: TransformParam,
    pipeline: Box<dyn Transform<RgbImage, RgbImage>>,
    rng: TransformRng,
}

impl ImageTransformer {
    pub fn new(param: TransformParam, phase: Phase) -> Result<Self> {
        param.validate()?;

        let rng = TransformRng::from_os_rng();
        let crop: Box<dyn Transform<RgbImage, RgbImage>> = match (param.crop_size, phase) {
            (0, _) => Box::new(Identity),
            (size, Phase::Train) => Box::new(RandomCrop::new(size, rng.clone())?),
            (size, Phase::Test) => Box::new(CenterCrop::new(size)?),
        };
        let pipeline: Box<dyn Transform<RgbImage, RgbImage>> =
            if param.mirror && phase == Phase::Train {
                Box::new(crop.then(RandomHorizontalFlip::new(0.5, rng.clone())?))
            } else {
                crop
            };

        Ok(Self {
            param,
            pipeline,
            rng,
        })
    }

    fn mean(&self, channel: usize) -> f32 {
        match self.param.mean_value.as_slice() {
            [] => 0.0,
            [all] => *all,
            per_channel => per_channel[channel],
        }
    }
}

impl<T: Element> DataTransformer<T> for ImageTransformer {
    fn infer_shape(&self, channels: usize, height: usize, width: usize) -> Vec<usize> {
        match self.param.crop_size as usize {
            0 => vec![channels, height, width],
            size => vec![channels, size, size],
        }
    }

    fn transform(&mut self, image: &RgbImage, output: &mut Blob<T>, slot: usize) -> Result<()> {
        let image = self.pipeline.apply(image.clone())?;
        let (width, height) = (image.width() as usize, image.height() as usize);
        let plane = height * width;

        ensure!(
            slot < output.num_samples(),
            "Slot {} out of range for output with {} samples",
            slot,
            output.num_samples()
        );
        ensure!(
            output.sample_len() == 3 * plane,
            "Transformed image 3x{}x{} does not fit an output sample of {} elements",
            height,
            width,
            output.sample_len()
        );

        let means = [self.mean(0), self.mean(1), self.mean(2)];
        let scale = self.param.scale;
        let dst = output.slot_mut(slot);
        for (index, pixel) in image.pixels().enumerate() {
            for (c, &value) in pixel.0.iter().enumerate() {
                let normalized = (value as f32 - means[c]) * scale;
                dst[c * plane + index] = T::from_f64(normalized as f64);
            }
        }
        Ok(())
    }

    fn reseed(&mut self, seed: u64) {
        self.rng.reseed(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_mean_and_scale_write_chw() -> Result<()> {
        let param = TransformParam {
            scale: 0.5,
            mean_value: vec![10.0, 20.0, 30.0],
            ..Default::default()
        };
        let mut transformer = ImageTransformer::new(param, Phase::Test)?;

        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, Rgb([10, 20, 30]));
        image.put_pixel(1, 0, Rgb([20, 40, 60]));

        let mut output = Blob::<f32>::zeros(&[2, 3, 1, 2]);
        DataTransformer::<f32>::transform(&mut transformer, &image, &mut output, 1)?;

        assert_eq!(output.slot(0), &[0.0; 6]);
        // channel-major: R plane, G plane, B plane
        assert_eq!(output.slot(1), &[0.0, 5.0, 0.0, 10.0, 0.0, 15.0]);
        Ok(())
    }

    #[test]
    fn test_center_crop_shape() -> Result<()> {
        let param = TransformParam {
            crop_size: 2,
            ..Default::default()
        };
        let mut transformer = ImageTransformer::new(param, Phase::Test)?;
        assert_eq!(
            DataTransformer::<u8>::infer_shape(&transformer, 3, 4, 4),
            vec![3, 2, 2]
        );

        let image = RgbImage::from_fn(4, 4, |x, y| Rgb([(y * 4 + x) as u8, 0, 0]));
        let mut output = Blob::<u8>::zeros(&[1, 3, 2, 2]);
        transformer.transform(&image, &mut output, 0)?;
        assert_eq!(&output.slot(0)[..4], &[5, 6, 9, 10]);
        Ok(())
    }

    #[test]
    fn test_rejects_mismatched_output() -> Result<()> {
        let mut transformer = ImageTransformer::new(TransformParam::default(), Phase::Train)?;
        let image = RgbImage::new(3, 3);
        let mut output = Blob::<f32>::zeros(&[1, 3, 2, 2]);
        assert!(transformer.transform(&image, &mut output, 0).is_err());
        assert!(transformer.transform(&image, &mut Blob::<f32>::zeros(&[1, 27]), 4).is_err());
        Ok(())
    }

    #[test]
    fn test_rejects_bad_mean() {
        let param = TransformParam {
            mean_value: vec![1.0, 2.0],
            ..Default::default()
        };
        assert!(ImageTransformer::new(param, Phase::Train).is_err());
    }

    #[test]
    fn test_reseed_controls_random_crop_and_mirror() -> Result<()> {
        let param = TransformParam {
            crop_size: 3,
            mirror: true,
            ..Default::default()
        };
        let image = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8, y as u8, 0]));

        let run = |transformer: &mut ImageTransformer| -> Result<Vec<Vec<f32>>> {
            DataTransformer::<f32>::reseed(transformer, 17);
            let mut samples = Vec::new();
            for _ in 0..6 {
                let mut output = Blob::<f32>::zeros(&[1, 3, 3, 3]);
                transformer.transform(&image, &mut output, 0)?;
                samples.push(output.data().to_vec());
            }
            Ok(samples)
        };

        let mut first = ImageTransformer::new(param.clone(), Phase::Train)?;
        let mut second = ImageTransformer::new(param, Phase::Train)?;
        let expected = run(&mut first)?;

        // draws on another transformer do not disturb this one
        DataTransformer::<f32>::reseed(&mut second, 17);
        DataTransformer::<f32>::reseed(&mut first, 17);
        for _ in 0..3 {
            second.transform(&image, &mut Blob::<f32>::zeros(&[1, 27]), 0)?;
        }
        let mut interleaved = Vec::new();
        for _ in 0..6 {
            let mut output = Blob::<f32>::zeros(&[1, 3, 3, 3]);
            first.transform(&image, &mut output, 0)?;
            second.transform(&image, &mut Blob::<f32>::zeros(&[1, 27]), 0)?;
            interleaved.push(output.data().to_vec());
        }
        assert_eq!(interleaved, expected);
        assert_eq!(run(&mut second)?, expected);
        Ok(())
    }
}
