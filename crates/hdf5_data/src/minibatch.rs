use crate::blob::{Blob, Element};
use anyhow::{anyhow, ensure, Result};
use std::collections::HashMap;
use tch::{Device, Tensor};

/// The outputs of one forward pass as libtorch tensors, keyed by top name.
///
/// Each tensor has the shape of its output blob, `[batch_size, ...]`.
///
/// # Examples
/// With tops `["data", "label"]` and a batch of 4 `3x32x32` images:
/// - `"data"` -> shape `[4, 3, 32, 32]`
/// - `"label"` -> shape `[4]`
///
/// ```ignore
/// layer.forward(&mut tops)?;
/// let batch = MiniBatch::from_outputs(&layer.config().tops, &tops)?;
/// let logits = model.forward(batch.get("data")?);
/// ```
#[derive(Debug)]
pub struct MiniBatch {
    pub tensors: HashMap<String, Tensor>,
}

impl MiniBatch {
    /// Copies every output blob into a CPU tensor under its top name.
    pub fn from_outputs<T>(names: &[String], tops: &[Blob<T>]) -> Result<Self>
    where
        T: Element + tch::kind::Element,
    {
        ensure!(
            names.len() == tops.len(),
            "Got {} top names for {} outputs",
            names.len(),
            tops.len()
        );
        ensure!(!tops.is_empty(), "Empty mini-batch");

        let tensors = names
            .iter()
            .zip(tops)
            .map(|(name, top)| (name.clone(), top.to_tensor()))
            .collect();
        Ok(Self { tensors })
    }

    /// Returns the number of samples in the batch.
    pub fn batch_size(&self) -> Result<i64> {
        self.tensors
            .values()
            .next()
            .map(|t| t.size()[0])
            .ok_or(anyhow!("Empty mini-batch"))
    }

    pub fn get(&self, name: &str) -> Result<&Tensor> {
        self.tensors
            .get(name)
            .ok_or_else(|| anyhow!("Output '{}' not found in mini-batch", name))
    }

    pub fn features(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    /// Transfers all tensors to the target device (CPU/GPU)
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            tensors: self
                .tensors
                .iter()
                .map(|(name, tensor)| (name.clone(), tensor.to_device(device)))
                .collect(),
        }
    }
}
