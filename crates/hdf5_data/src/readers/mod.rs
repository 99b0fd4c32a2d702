//! src/readers/mod.rs
//!
//! Storage backends for data files.
//!
//! A data file is a self-describing container of named n-dimensional numeric
//! datasets. Each backend implements [`DataFile`]; [`open_data_file`] picks one
//! from the file extension:
//!
//! | Extension              | Backend                        |
//! |------------------------|--------------------------------|
//! | `.h5`, `.hdf5`, `.he5` | HDF5 (cargo feature `hdf5`)    |
//! | `.safetensors`         | safetensors                    |

#[cfg(feature = "hdf5")]
pub mod h5;
pub mod safetensors;

#[cfg(feature = "hdf5")]
pub use h5::H5File;
pub use safetensors::SafetensorsFile;

use crate::blob::{Blob, Element};
use crate::error::{DataLayerError, Result};
use std::path::Path;

/// Element buffer of a dataset, in the type it was stored with.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetValues {
    U8(Vec<u8>),
    I8(Vec<i8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

macro_rules! convert_values {
    ($values:expr, $($variant:ident),*) => {
        match $values {
            $(DatasetValues::$variant(v) => v.into_iter().map(|x| T::from_f64(x as f64)).collect(),)*
        }
    };
}

impl DatasetValues {
    pub fn len(&self) -> usize {
        match self {
            DatasetValues::U8(v) => v.len(),
            DatasetValues::I8(v) => v.len(),
            DatasetValues::U16(v) => v.len(),
            DatasetValues::I16(v) => v.len(),
            DatasetValues::U32(v) => v.len(),
            DatasetValues::I32(v) => v.len(),
            DatasetValues::U64(v) => v.len(),
            DatasetValues::I64(v) => v.len(),
            DatasetValues::F32(v) => v.len(),
            DatasetValues::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts every value to the layer's element type.
    pub fn convert<T: Element>(self) -> Vec<T> {
        convert_values!(self, U8, I8, U16, I16, U32, I32, U64, I64, F32, F64)
    }
}

/// A dataset as read from disk: its shape and row-major values.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataset {
    pub shape: Vec<usize>,
    pub values: DatasetValues,
}

impl RawDataset {
    pub fn num_axes(&self) -> usize {
        self.shape.len()
    }

    /// Converts into a [`Blob`] of the layer's element type.
    pub fn into_blob<T: Element>(self) -> Result<Blob<T>> {
        Blob::from_vec(self.shape, self.values.convert())
    }
}

/// An open data file.
///
/// A file is opened read-only, queried for the datasets the layer declares,
/// and closed again within a single load. Implementations must not hold the
/// file open past [`close`](Self::close).
pub trait DataFile {
    fn path(&self) -> &Path;

    /// Reads the dataset called `name`.
    ///
    /// Errors with [`DataLayerError::DatasetMissing`] when there is no such
    /// dataset and [`DataLayerError::DatasetMalformed`] when it is not numeric.
    fn read_dataset(&self, name: &str) -> Result<RawDataset>;

    /// Releases the file. Errors surface as [`DataLayerError::CloseFailure`].
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens `path` with the backend matching its extension.
pub fn open_data_file(path: &Path) -> Result<Box<dyn DataFile>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("h5" | "hdf5" | "he5") => open_hdf5(path),
        Some("safetensors") => Ok(Box::new(SafetensorsFile::open(path)?)),
        _ => Err(DataLayerError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(feature = "hdf5")]
fn open_hdf5(path: &Path) -> Result<Box<dyn DataFile>> {
    Ok(Box::new(H5File::open(path)?))
}

#[cfg(not(feature = "hdf5"))]
fn open_hdf5(path: &Path) -> Result<Box<dyn DataFile>> {
    Err(DataLayerError::FileUnreadable {
        path: path.to_path_buf(),
        reason: "HDF5 support requires the `hdf5` cargo feature".to_string(),
    })
}
