//! src/config.rs
//!
//! Configuration for the HDF5 data layer
//!
//! `HdfDataConfig` is the record the layer is constructed from. It can be
//! assembled in code through the builder or deserialized from JSON.
//!
//! Example:
//! ```ignore
//! let config = HdfDataConfig::builder()
//!     .source("train_files.txt")
//!     .batch_size(64)
//!     .top("data")
//!     .top("label")
//!     .shuffle(true)
//!     .seed(42)
//!     .build()?;
//! ```
//!
//! The same record as JSON:
//! ```text
//! {
//!   "source": "train_files.txt",
//!   "batch_size": 64,
//!   "tops": ["data", "label"],
//!   "shuffle": true,
//!   "seed": 42
//! }
//! ```

use crate::error::{DataLayerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Whether the network is training or evaluating.
///
/// Random image transforms (random crop, mirroring) only run in `Train`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Train,
    Test,
}

/// Parameters for the per-sample image transform on output 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformParam {
    /// Multiplier applied after mean subtraction
    pub scale: f32,
    /// Randomly mirror images horizontally (train phase only)
    pub mirror: bool,
    /// Square crop side in pixels, 0 disables cropping
    pub crop_size: u32,
    /// Either empty, one value for all channels, or one value per channel
    pub mean_value: Vec<f32>,
}

impl TransformParam {
    /// Checks that `mean_value` holds 0, 1 or 3 values.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.mean_value.len(), 0 | 1 | 3) {
            return Err(invalid(format!(
                "mean_value must hold 0, 1 or 3 values, got {}",
                self.mean_value.len()
            )));
        }
        Ok(())
    }
}

impl Default for TransformParam {
    fn default() -> Self {
        Self {
            scale: 1.0,
            mirror: false,
            crop_size: 0,
            mean_value: Vec::new(),
        }
    }
}

/// Configuration for the HDF5 data layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdfDataConfig {
    /// Manifest listing the data files, whitespace separated
    pub source: PathBuf,
    /// Number of samples written per forward
    pub batch_size: usize,
    /// Dataset names read from every file, one output per name
    pub tops: Vec<String>,
    /// Shuffle file order and row order every time they wrap
    #[serde(default)]
    pub shuffle: bool,
    /// Treat output 0 as CHW 8-bit color images
    #[serde(default)]
    pub image: bool,
    /// Image transform parameters; only used together with `image`
    #[serde(default)]
    pub transform_param: Option<TransformParam>,
    /// Seed for shuffling and random transforms. Random when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub phase: Phase,
}

impl HdfDataConfig {
    pub fn builder() -> HdfDataConfigBuilder {
        HdfDataConfigBuilder::default()
    }

    /// Parses and validates a JSON configuration record.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| DataLayerError::InvalidConfig {
            reason: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&json)
    }

    /// Checks the required fields.
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(invalid("source must name a manifest file"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be positive"));
        }
        if self.tops.is_empty() {
            return Err(invalid("at least one top (dataset name) is required"));
        }
        if let Some(param) = &self.transform_param {
            param.validate()?;
        }
        Ok(())
    }

    /// True when output 0 goes through the image transformer.
    pub fn transform_enabled(&self) -> bool {
        self.image && self.transform_param.is_some()
    }
}

fn invalid(reason: impl Into<String>) -> DataLayerError {
    DataLayerError::InvalidConfig {
        reason: reason.into(),
    }
}

/// Builder for HdfDataConfig with method chaining
#[derive(Default)]
pub struct HdfDataConfigBuilder {
    source: Option<PathBuf>,
    batch_size: Option<usize>,
    tops: Vec<String>,
    shuffle: bool,
    image: bool,
    transform_param: Option<TransformParam>,
    seed: Option<u64>,
    phase: Phase,
}

impl HdfDataConfigBuilder {
    /// Set the manifest path
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the batch size (must be > 0)
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Append one output dataset name
    pub fn top(mut self, name: impl Into<String>) -> Self {
        self.tops.push(name.into());
        self
    }

    /// Set whether to shuffle files and rows on wrap
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set whether output 0 holds CHW images
    pub fn image(mut self, image: bool) -> Self {
        self.image = image;
        self
    }

    pub fn transform_param(mut self, param: TransformParam) -> Self {
        self.transform_param = Some(param);
        self
    }

    /// Set the random seed for reproducible shuffling and transforms.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Build and validate the final configuration.
    pub fn build(self) -> Result<HdfDataConfig> {
        let config = HdfDataConfig {
            source: self
                .source
                .ok_or_else(|| invalid("source is required"))?,
            batch_size: self
                .batch_size
                .ok_or_else(|| invalid("batch_size is required"))?,
            tops: self.tops,
            shuffle: self.shuffle,
            image: self.image,
            transform_param: self.transform_param,
            seed: self.seed,
            phase: self.phase,
        };
        config.validate()?;
        Ok(config)
    }
}
