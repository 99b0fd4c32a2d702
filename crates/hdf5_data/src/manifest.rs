use crate::error::{DataLayerError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The ordered list of data files a layer cycles through.
///
/// The manifest is plain text. Any run of whitespace separates two entries,
/// so blank lines and indentation are ignored and a path containing a space
/// is read as two paths. Entries are kept verbatim and in file order.
///
/// # Example
/// ```ignore
/// // train_files.txt:
/// //   /data/train_0.h5
/// //   /data/train_1.h5
/// let manifest = Manifest::read("train_files.txt")?;
/// assert_eq!(manifest.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    source: PathBuf,
    files: Vec<PathBuf>,
}

impl Manifest {
    /// Reads and tokenizes a manifest file. Fails if it cannot be read or
    /// lists no files.
    pub fn read(source: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref();
        info!("Loading list of data filenames from: {}", source.display());

        let text = fs::read_to_string(source).map_err(|e| DataLayerError::ManifestUnreadable {
            path: source.to_path_buf(),
            source: e,
        })?;
        let manifest = Self::parse(source, &text)?;

        info!("Number of data files: {}", manifest.len());
        Ok(manifest)
    }

    /// Tokenizes manifest text that was already read from `source`.
    pub fn parse(source: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let source = source.into();
        let files: Vec<PathBuf> = text.split_whitespace().map(PathBuf::from).collect();
        if files.is_empty() {
            return Err(DataLayerError::ManifestEmpty { path: source });
        }
        Ok(Self { source, files })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
