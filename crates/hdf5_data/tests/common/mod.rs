#![allow(dead_code)]

use hdf5_data::{Blob, DataTransformer, HdfDataConfig, HdfDataLayer};

use anyhow::Result;
use bytemuck::cast_slice;
use image::RgbImage;
use safetensors::{serialize_to_file, tensor::Dtype, tensor::TensorView};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One named dataset of a fixture file: `(name, shape, values)`.
pub type Fixture<'a> = (&'a str, Vec<usize>, Vec<f32>);

/// Writes an f32 safetensors data file into `dir`.
pub fn write_data_file(dir: &Path, name: &str, tensors: &[Fixture]) -> Result<PathBuf> {
    let path = dir.join(name);
    let bytes: Vec<Vec<u8>> = tensors
        .iter()
        .map(|(_, _, values)| cast_slice(values).to_vec())
        .collect();
    let views = tensors
        .iter()
        .zip(&bytes)
        .map(|((name, shape, _), raw)| {
            Ok((*name, TensorView::new(Dtype::F32, shape.clone(), raw)?))
        })
        .collect::<Result<Vec<_>>>()?;
    serialize_to_file(views, &None, &path)?;
    Ok(path)
}

/// Writes a manifest listing `files`, one per line.
pub fn write_manifest(dir: &Path, files: &[PathBuf]) -> Result<PathBuf> {
    let path = dir.join("files.txt");
    let text: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
    std::fs::write(&path, text.join("\n") + "\n")?;
    Ok(path)
}

/// A file with one `data` dataset of shape `(values.len(), 1)`.
pub fn column_file(dir: &Path, name: &str, values: &[f32]) -> Result<PathBuf> {
    write_data_file(dir, name, &[("data", vec![values.len(), 1], values.to_vec())])
}

/// Sets up a layer and returns it with its shaped outputs.
pub fn setup_layer(config: HdfDataConfig) -> Result<(HdfDataLayer<f32>, Vec<Blob<f32>>)> {
    let mut tops = vec![Blob::default(); config.tops.len()];
    let mut layer = HdfDataLayer::new(config)?;
    layer.setup(&mut tops)?;
    Ok((layer, tops))
}

/// Runs `forwards` batches and returns the first column of output `index`
/// for each batch.
pub fn collect_batches(
    layer: &mut HdfDataLayer<f32>,
    tops: &mut [Blob<f32>],
    index: usize,
    forwards: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut batches = Vec::with_capacity(forwards);
    for _ in 0..forwards {
        layer.forward(tops)?;
        let top = &tops[index];
        batches.push((0..top.num_samples()).map(|i| top.slot(i)[0]).collect());
    }
    Ok(batches)
}

/// Transformer that records every image it receives and writes the red
/// channel of pixel (0, 0) into the first element of the slot.
#[derive(Clone, Default)]
pub struct RecordingTransformer {
    pub seen: Arc<Mutex<Vec<RgbImage>>>,
}

impl DataTransformer<f32> for RecordingTransformer {
    fn infer_shape(&self, channels: usize, height: usize, width: usize) -> Vec<usize> {
        vec![channels, height, width]
    }

    fn transform(&mut self, image: &RgbImage, output: &mut Blob<f32>, slot: usize) -> Result<()> {
        self.seen
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(image.clone());
        output.slot_mut(slot)[0] = image.get_pixel(0, 0).0[0] as f32;
        Ok(())
    }
}
