use super::{DataFile, DatasetValues, RawDataset};
use crate::error::{DataLayerError, Result};
use hdf5::types::TypeDescriptor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads named datasets from an HDF5 file through libhdf5.
///
/// Integer and floating point datasets of any rank are accepted; the library
/// converts them to `f64` on read, the same way for every stored width.
/// Compound, string, enum and other classes are rejected as malformed.
pub struct H5File {
    path: PathBuf,
    file: hdf5::File,
}

impl H5File {
    /// Opens the file read-only.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = hdf5::File::open(&path).map_err(|e| DataLayerError::FileUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { path, file })
    }

    fn malformed(&self, name: &str, reason: impl Into<String>) -> DataLayerError {
        DataLayerError::DatasetMalformed {
            path: self.path.clone(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl DataFile for H5File {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_dataset(&self, name: &str) -> Result<RawDataset> {
        if !self.file.link_exists(name) {
            return Err(DataLayerError::DatasetMissing {
                path: self.path.clone(),
                name: name.to_string(),
            });
        }
        let dataset = self
            .file
            .dataset(name)
            .map_err(|e| self.malformed(name, e.to_string()))?;

        let descriptor = dataset
            .dtype()
            .and_then(|dtype| dtype.to_descriptor())
            .map_err(|e| self.malformed(name, e.to_string()))?;
        match descriptor {
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Float(_) => {}
            other => return Err(self.malformed(name, format!("non-numeric type {:?}", other))),
        }

        let shape = dataset.shape();
        let values = dataset
            .read_raw::<f64>()
            .map_err(|e| self.malformed(name, e.to_string()))?;
        debug!("Read dataset '{}' with shape {:?}", name, shape);

        Ok(RawDataset {
            shape,
            values: DatasetValues::F64(values),
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        let Self { path, file } = *self;
        file.close().map_err(|e| DataLayerError::CloseFailure {
            path,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_hdf5_datasets() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("train.h5");
        {
            let file = hdf5::File::create(&path)?;
            file.new_dataset::<f32>()
                .shape((2, 2))
                .create("data")?
                .write_raw(&[1.5f32, 2.5, 3.5, 4.5])?;
            file.new_dataset::<i32>()
                .shape(2)
                .create("label")?
                .write_raw(&[0i32, 1])?;
        }

        let file = H5File::open(&path)?;
        let data = file.read_dataset("data")?;
        assert_eq!(data.shape, vec![2, 2]);
        assert_eq!(data.values, DatasetValues::F64(vec![1.5, 2.5, 3.5, 4.5]));

        let label = file.read_dataset("label")?;
        assert_eq!(label.values, DatasetValues::F64(vec![0.0, 1.0]));

        assert!(matches!(
            file.read_dataset("missing"),
            Err(DataLayerError::DatasetMissing { .. })
        ));
        Box::new(file).close()?;
        Ok(())
    }
}
