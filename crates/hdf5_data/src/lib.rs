pub mod assembler;
pub mod blob;
pub mod config;
pub mod cursor;
pub mod error;
pub mod layer;
pub mod loader;
pub mod manifest;
#[cfg(feature = "tch")]
pub mod minibatch;
pub mod permutation;
pub mod readers;
pub mod transforms;

pub use assembler::BatchAssembler;
pub use blob::{Blob, Element};
pub use config::{HdfDataConfig, HdfDataConfigBuilder, Phase, TransformParam};
pub use cursor::{Cursor, Step};
pub use error::{DataLayerError, Result};
pub use layer::{HdfDataLayer, LAYER_TYPE};
pub use loader::{DatasetLoader, FileBundle};
pub use manifest::Manifest;
#[cfg(feature = "tch")]
pub use minibatch::MiniBatch;
pub use permutation::Permutation;
pub use transforms::{DataTransformer, ImageTransformer};
