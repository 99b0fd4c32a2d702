use crate::blob::{Blob, Element};
use crate::error::{DataLayerError, Result};
use crate::loader::FileBundle;
use crate::transforms::DataTransformer;
use image::RgbImage;

/// Color channels an image dataset must have on the transform path.
pub const IMAGE_CHANNELS: usize = 3;

/// Writes selected rows of a [`FileBundle`] into the slots of the output blobs.
///
/// Every output gets a straight copy of the row, except output 0 when an
/// image transformer is attached: that row is decoded from CHW into an
/// interleaved RGB image and handed to the transformer, which fills the slot.
pub struct BatchAssembler<T: Element> {
    transformer: Option<Box<dyn DataTransformer<T>>>,
}

impl<T: Element> Default for BatchAssembler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> BatchAssembler<T> {
    /// An assembler that copies every output.
    pub fn new() -> Self {
        Self { transformer: None }
    }

    /// An assembler that routes output 0 through `transformer`.
    pub fn with_transformer(transformer: Box<dyn DataTransformer<T>>) -> Self {
        Self {
            transformer: Some(transformer),
        }
    }

    pub fn transforms_images(&self) -> bool {
        self.transformer.is_some()
    }

    /// Restarts the attached transformer's random choices from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        if let Some(transformer) = self.transformer.as_mut() {
            transformer.reseed(seed);
        }
    }

    /// Shape of output `index` for `batch_size` samples of `bundle`.
    pub fn output_shape(
        &self,
        bundle: &FileBundle<T>,
        index: usize,
        batch_size: usize,
    ) -> Result<Vec<usize>> {
        let source = bundle_blob(bundle, index)?;
        let mut shape = vec![batch_size];
        match &self.transformer {
            Some(transformer) if index == 0 => {
                let (height, width) = image_dims(bundle, index)?;
                shape.extend(transformer.infer_shape(IMAGE_CHANNELS, height, width));
            }
            _ => shape.extend_from_slice(&source.shape()[1..]),
        }
        Ok(shape)
    }

    /// Fills slot `slot` of every output with row `row` of `bundle`.
    pub fn fill_slot(
        &mut self,
        bundle: &FileBundle<T>,
        row: usize,
        outputs: &mut [Blob<T>],
        slot: usize,
    ) -> Result<()> {
        for (index, output) in outputs.iter_mut().enumerate() {
            match self.transformer.as_mut() {
                Some(transformer) if index == 0 => {
                    let image = materialize_image(bundle, index, row)?;
                    transformer
                        .transform(&image, output, slot)
                        .map_err(DataLayerError::Transform)?;
                }
                _ => copy_row(bundle, index, row, output, slot)?,
            }
        }
        Ok(())
    }
}

fn bundle_blob<T: Element>(bundle: &FileBundle<T>, index: usize) -> Result<&Blob<T>> {
    bundle.blob(index).ok_or(DataLayerError::OutputCountMismatch {
        expected: bundle.len(),
        actual: index + 1,
    })
}

/// Copies row `row` of dataset `index` into slot `slot` of `output`.
///
/// The slot width is `count(output) / batch_size`; it must equal the row
/// width of the dataset.
pub fn copy_row<T: Element>(
    bundle: &FileBundle<T>,
    index: usize,
    row: usize,
    output: &mut Blob<T>,
    slot: usize,
) -> Result<()> {
    let source = bundle_blob(bundle, index)?;
    if output.sample_len() != source.sample_len() {
        return Err(DataLayerError::ShapeMismatch {
            name: bundle.name(index).unwrap_or_default().to_string(),
            expected: source.sample_len(),
            actual: output.sample_len(),
        });
    }
    output.slot_mut(slot).copy_from_slice(source.slot(row));
    Ok(())
}

/// `(height, width)` of an image dataset, which must be `(N, 3, H, W)`.
pub fn image_dims<T: Element>(bundle: &FileBundle<T>, index: usize) -> Result<(usize, usize)> {
    let source = bundle_blob(bundle, index)?;
    match source.shape() {
        [_, IMAGE_CHANNELS, height, width] => Ok((*height, *width)),
        shape => Err(DataLayerError::DatasetMalformed {
            path: bundle.path().to_path_buf(),
            name: bundle.name(index).unwrap_or_default().to_string(),
            reason: format!(
                "image data must have shape (N, {}, H, W), got {:?}",
                IMAGE_CHANNELS, shape
            ),
        }),
    }
}

/// Decodes row `row` of a CHW image dataset into an interleaved RGB image:
/// pixel `(h, w)` channel `c` comes from `c·H·W + h·W + w`. Values are
/// truncated and saturated into `0..=255`.
pub fn materialize_image<T: Element>(
    bundle: &FileBundle<T>,
    index: usize,
    row: usize,
) -> Result<RgbImage> {
    let (height, width) = image_dims(bundle, index)?;
    let source = bundle_blob(bundle, index)?.slot(row);
    let plane = height * width;

    let mut pixels = Vec::with_capacity(plane * IMAGE_CHANNELS);
    for offset in 0..plane {
        for c in 0..IMAGE_CHANNELS {
            pixels.push(source[c * plane + offset].to_f64() as u8);
        }
    }

    RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        DataLayerError::DatasetMalformed {
            path: bundle.path().to_path_buf(),
            name: bundle.name(index).unwrap_or_default().to_string(),
            reason: format!("cannot build a {}x{} image", width, height),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Phase, TransformParam};
    use crate::transforms::ImageTransformer;
    use image::Rgb;

    fn image_bundle() -> Result<FileBundle<f32>> {
        // one row, 3 channels, 2x2: each value encodes channel*10 + offset
        let values: Vec<f32> = (0..3)
            .flat_map(|c| (0..4).map(move |o| (c * 10 + o) as f32))
            .collect();
        FileBundle::new(
            "mem.h5",
            vec![
                ("data".to_string(), Blob::from_vec(vec![1, 3, 2, 2], values)?),
                ("label".to_string(), Blob::from_vec(vec![1], vec![7.0])?),
            ],
        )
    }

    #[test]
    fn test_materialize_image_interleaves_channels() -> Result<()> {
        let bundle = image_bundle()?;
        let image = materialize_image(&bundle, 0, 0)?;

        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 10, 20]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([1, 11, 21]));
        assert_eq!(image.get_pixel(0, 1), &Rgb([2, 12, 22]));
        assert_eq!(image.get_pixel(1, 1), &Rgb([3, 13, 23]));
        Ok(())
    }

    #[test]
    fn test_materialize_saturates() -> Result<()> {
        let values = vec![-4.0, 300.0, 12.7, 0.0, 0.0, 0.0];
        let bundle = FileBundle::new(
            "mem.h5",
            vec![("data".to_string(), Blob::from_vec(vec![1, 3, 1, 2], values)?)],
        )?;
        let image = materialize_image(&bundle, 0, 0)?;
        assert_eq!(image.get_pixel(0, 0), &Rgb([0, 12, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgb([255, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_image_dims_requires_three_channels() -> Result<()> {
        let bundle = FileBundle::new(
            "mem.h5",
            vec![("data".to_string(), Blob::<f32>::zeros(&[2, 1, 4, 4]))],
        )?;
        assert!(matches!(
            image_dims(&bundle, 0),
            Err(DataLayerError::DatasetMalformed { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_copy_row_checks_width() -> Result<()> {
        let bundle = FileBundle::new(
            "mem.h5",
            vec![(
                "data".to_string(),
                Blob::from_vec(vec![2, 2], vec![1.0f32, 2.0, 3.0, 4.0])?,
            )],
        )?;

        let mut output = Blob::<f32>::zeros(&[2, 2]);
        copy_row(&bundle, 0, 1, &mut output, 0)?;
        assert_eq!(output.data(), &[3.0, 4.0, 0.0, 0.0]);

        let mut narrow = Blob::<f32>::zeros(&[2, 3]);
        assert!(matches!(
            copy_row(&bundle, 0, 0, &mut narrow, 0),
            Err(DataLayerError::ShapeMismatch {
                expected: 2,
                actual: 3,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_fill_slot_routes_first_output_through_transformer() -> Result<()> {
        let bundle = image_bundle()?;
        let transformer = ImageTransformer::new(TransformParam::default(), Phase::Test)
            .map_err(DataLayerError::Transform)?;
        let mut assembler = BatchAssembler::<f32>::with_transformer(Box::new(transformer));
        assert!(assembler.transforms_images());

        let shapes = (0..2)
            .map(|index| assembler.output_shape(&bundle, index, 2))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(shapes, vec![vec![2, 3, 2, 2], vec![2]]);

        let mut outputs: Vec<Blob<f32>> = shapes.iter().map(|s| Blob::zeros(s)).collect();
        assembler.fill_slot(&bundle, 0, &mut outputs, 1)?;

        let expected: Vec<f32> = bundle.blob(0).map(|b| b.slot(0).to_vec()).unwrap_or_default();
        assert_eq!(outputs[0].slot(1), expected.as_slice());
        assert_eq!(outputs[1].data(), &[0.0, 7.0]);
        Ok(())
    }
}
