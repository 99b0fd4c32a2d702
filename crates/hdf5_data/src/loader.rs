use crate::blob::{Blob, Element};
use crate::error::{DataLayerError, Result};
use crate::readers::{open_data_file, DataFile};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fewest axes a dataset may have. There is no upper bound.
pub const MIN_DATA_DIM: usize = 1;

/// The datasets of one data file, one per declared output, in declaration
/// order. All of them have the same size along axis 0, the row count.
#[derive(Debug, Clone, PartialEq)]
pub struct FileBundle<T> {
    path: PathBuf,
    names: Vec<String>,
    blobs: Vec<Blob<T>>,
}

impl<T: Element> FileBundle<T> {
    /// Builds a bundle from `(name, blob)` pairs, checking that every blob
    /// has at least one row and that all of them agree on the row count.
    pub fn new(path: impl Into<PathBuf>, entries: Vec<(String, Blob<T>)>) -> Result<Self> {
        let (names, blobs) = entries.into_iter().unzip();
        let bundle = Self {
            path: path.into(),
            names,
            blobs,
        };
        bundle.check_rows()?;
        Ok(bundle)
    }

    fn check_rows(&self) -> Result<()> {
        let expected = self.rows();
        for (index, (name, blob)) in self.iter().enumerate() {
            if blob.num_axes() < MIN_DATA_DIM || blob.num_samples() == 0 {
                return Err(DataLayerError::DatasetMalformed {
                    path: self.path.clone(),
                    name: name.to_string(),
                    reason: format!("no rows in dataset of shape {:?}", blob.shape()),
                });
            }
            if index > 0 && blob.num_samples() != expected {
                return Err(DataLayerError::RowCountMismatch {
                    path: self.path.clone(),
                    name: name.to_string(),
                    expected,
                    actual: blob.num_samples(),
                });
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows shared by every dataset in the bundle.
    pub fn rows(&self) -> usize {
        self.blobs.first().map_or(0, Blob::num_samples)
    }

    /// Number of datasets (outputs) in the bundle.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    pub fn blob(&self, index: usize) -> Option<&Blob<T>> {
        self.blobs.get(index)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// `(name, blob)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Blob<T>)> {
        self.names.iter().map(String::as_str).zip(self.blobs.iter())
    }
}

/// Loads the declared datasets of a data file into a [`FileBundle`].
///
/// # Example
/// ```ignore
/// let loader = DatasetLoader::new(vec!["data".into(), "label".into()]);
/// let bundle: FileBundle<f32> = loader.load(Path::new("train_0.h5"))?;
/// println!("{} rows", bundle.rows());
/// ```
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    tops: Vec<String>,
}

impl DatasetLoader {
    pub fn new(tops: Vec<String>) -> Self {
        Self { tops }
    }

    pub fn tops(&self) -> &[String] {
        &self.tops
    }

    /// Opens `path`, reads every declared dataset, converts it to `T`, and
    /// closes the file before validating row counts.
    pub fn load<T: Element>(&self, path: &Path) -> Result<FileBundle<T>> {
        debug!("Loading data file: {}", path.display());
        let file = open_data_file(path)?;

        let mut entries = Vec::with_capacity(self.tops.len());
        for name in &self.tops {
            entries.push((name.clone(), read_nd_dataset::<T>(file.as_ref(), name)?));
        }
        file.close()?;

        let bundle = FileBundle::new(path, entries)?;

        debug!("Successfully loaded {} rows", bundle.rows());
        Ok(bundle)
    }
}

/// Reads one dataset and enforces the minimum rank.
fn read_nd_dataset<T: Element>(file: &dyn DataFile, name: &str) -> Result<Blob<T>> {
    let raw = file.read_dataset(name)?;
    if raw.num_axes() < MIN_DATA_DIM {
        return Err(DataLayerError::DatasetMalformed {
            path: file.path().to_path_buf(),
            name: name.to_string(),
            reason: format!(
                "input must have at least {} axis, got shape {:?}",
                MIN_DATA_DIM, raw.shape
            ),
        });
    }
    raw.into_blob()
}
