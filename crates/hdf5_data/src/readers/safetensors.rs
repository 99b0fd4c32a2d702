use super::{DataFile, DatasetValues, RawDataset};
use crate::error::{DataLayerError, Result};
use bytemuck::{pod_collect_to_vec, Pod};
use safetensors::tensor::{Dtype, Metadata};
use safetensors::SafeTensors;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads named tensors from a safetensors file.
///
/// The whole file is read into memory on [`open`](Self::open), where the
/// header is parsed and validated once. Each
/// [`read_dataset`](DataFile::read_dataset) then looks the tensor up in the
/// parsed header and copies its bytes out of that buffer.
///
/// # Example
/// ```ignore
/// let file = SafetensorsFile::open("train_0.safetensors")?;
/// let data = file.read_dataset("data")?;
/// println!("shape: {:?}", data.shape);
/// Box::new(file).close()?;
/// ```
pub struct SafetensorsFile {
    path: PathBuf,
    bytes: Vec<u8>,
    metadata: Metadata,
    /// Offset of the first tensor byte: the 8-byte length prefix plus the header
    data_start: usize,
}

impl SafetensorsFile {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bytes = fs::read(&path).map_err(|e| DataLayerError::FileUnreadable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let (header_len, metadata) =
            SafeTensors::read_metadata(&bytes).map_err(|e| DataLayerError::FileUnreadable {
                path: path.clone(),
                reason: format!("invalid safetensors header: {}", e),
            })?;

        Ok(Self {
            path,
            bytes,
            metadata,
            data_start: header_len + 8,
        })
    }

    fn malformed(&self, name: &str, reason: impl Into<String>) -> DataLayerError {
        DataLayerError::DatasetMalformed {
            path: self.path.clone(),
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl DataFile for SafetensorsFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn read_dataset(&self, name: &str) -> Result<RawDataset> {
        let info = self
            .metadata
            .info(name)
            .ok_or_else(|| DataLayerError::DatasetMissing {
                path: self.path.clone(),
                name: name.to_string(),
            })?;

        let (begin, end) = info.data_offsets;
        let raw = self
            .bytes
            .get(self.data_start + begin..self.data_start + end)
            .ok_or_else(|| self.malformed(name, "tensor data lies outside the file"))?;
        let values = values_from_bytes(info.dtype, raw)
            .ok_or_else(|| self.malformed(name, format!("unsupported dtype {:?}", info.dtype)))?;

        Ok(RawDataset {
            shape: info.shape.clone(),
            values,
        })
    }

    fn close(self: Box<Self>) -> Result<()> {
        // The file handle was released when the bytes were read.
        Ok(())
    }
}

/// Copies raw tensor bytes into typed values. `None` for non-numeric or
/// reduced-precision dtypes (BOOL, F16, BF16, F8).
fn values_from_bytes(dtype: Dtype, raw: &[u8]) -> Option<DatasetValues> {
    let values = match dtype {
        Dtype::U8 => DatasetValues::U8(raw.to_vec()),
        Dtype::I8 => DatasetValues::I8(collect(raw)),
        Dtype::U16 => DatasetValues::U16(collect(raw)),
        Dtype::I16 => DatasetValues::I16(collect(raw)),
        Dtype::U32 => DatasetValues::U32(collect(raw)),
        Dtype::I32 => DatasetValues::I32(collect(raw)),
        Dtype::U64 => DatasetValues::U64(collect(raw)),
        Dtype::I64 => DatasetValues::I64(collect(raw)),
        Dtype::F32 => DatasetValues::F32(collect(raw)),
        Dtype::F64 => DatasetValues::F64(collect(raw)),
        _ => return None,
    };
    Some(values)
}

/// Tensor data inside the file buffer is not guaranteed to be aligned for
/// `P`, so values are copied out rather than cast in place.
fn collect<P: Pod>(raw: &[u8]) -> Vec<P> {
    pod_collect_to_vec::<u8, P>(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::cast_slice;
    use safetensors::serialize_to_file;
    use safetensors::tensor::TensorView;
    use tempfile::NamedTempFile;

    fn write_fixture() -> anyhow::Result<NamedTempFile> {
        let data: Vec<f32> = (0..6).map(|v| v as f32).collect();
        let label: Vec<i64> = vec![7, 8, 9];
        let flag: Vec<u8> = vec![1, 0, 1];

        let data_bytes: Vec<u8> = cast_slice(&data).to_vec();
        let label_bytes: Vec<u8> = cast_slice(&label).to_vec();

        let tensors = vec![
            ("data", TensorView::new(Dtype::F32, vec![3, 2], &data_bytes)?),
            ("label", TensorView::new(Dtype::I64, vec![3], &label_bytes)?),
            ("flag", TensorView::new(Dtype::BOOL, vec![3], &flag)?),
        ];

        let file = NamedTempFile::with_suffix(".safetensors")?;
        serialize_to_file(tensors, &None, file.path())?;
        Ok(file)
    }

    #[test]
    fn test_read_typed_datasets() -> anyhow::Result<()> {
        let fixture = write_fixture()?;
        let file = SafetensorsFile::open(fixture.path())?;

        let data = file.read_dataset("data")?;
        assert_eq!(data.shape, vec![3, 2]);
        assert_eq!(
            data.values,
            DatasetValues::F32(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
        );

        let label = file.read_dataset("label")?;
        assert_eq!(label.shape, vec![3]);
        assert_eq!(label.values, DatasetValues::I64(vec![7, 8, 9]));

        Box::new(file).close()?;
        Ok(())
    }

    #[test]
    fn test_missing_and_unsupported_datasets() -> anyhow::Result<()> {
        let fixture = write_fixture()?;
        let file = SafetensorsFile::open(fixture.path())?;

        assert!(matches!(
            file.read_dataset("nope"),
            Err(DataLayerError::DatasetMissing { .. })
        ));
        assert!(matches!(
            file.read_dataset("flag"),
            Err(DataLayerError::DatasetMalformed { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_open_errors() -> anyhow::Result<()> {
        assert!(matches!(
            SafetensorsFile::open("/nonexistent/file.safetensors"),
            Err(DataLayerError::FileUnreadable { .. })
        ));

        let garbage = NamedTempFile::with_suffix(".safetensors")?;
        fs::write(garbage.path(), b"definitely not a safetensors file")?;
        assert!(matches!(
            SafetensorsFile::open(garbage.path()),
            Err(DataLayerError::FileUnreadable { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_truncated_file_rejected_at_open() -> anyhow::Result<()> {
        let fixture = write_fixture()?;
        let mut bytes = fs::read(fixture.path())?;
        bytes.truncate(bytes.len() - 4);
        fs::write(fixture.path(), &bytes)?;

        assert!(matches!(
            SafetensorsFile::open(fixture.path()),
            Err(DataLayerError::FileUnreadable { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_datasets_read_in_any_order() -> anyhow::Result<()> {
        let fixture = write_fixture()?;
        let file = SafetensorsFile::open(fixture.path())?;

        for _ in 0..2 {
            let label = file.read_dataset("label")?;
            let data = file.read_dataset("data")?;
            assert_eq!(label.values, DatasetValues::I64(vec![7, 8, 9]));
            assert_eq!(data.values.len(), 6);
        }
        Ok(())
    }
}
