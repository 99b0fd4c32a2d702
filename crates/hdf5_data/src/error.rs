//! Error types for the HDF5 data layer
//!
//! Every failure the layer can hit while reading the manifest, loading a
//! data file, or filling a batch. The layer never recovers from these
//! locally: the embedding pipeline is expected to stop on the first `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for all data layer operations
#[derive(Debug, Error)]
pub enum DataLayerError {
    // ========== Manifest Errors ==========
    /// The manifest could not be opened or read
    #[error("Failed to open source file {}: {source}", .path.display())]
    ManifestUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest lists no data files
    #[error("Must have at least 1 data file listed in {}", .path.display())]
    ManifestEmpty { path: PathBuf },

    // ========== Data File Errors ==========
    /// A data file listed in the manifest could not be opened
    #[error("Failed opening data file {}: {reason}", .path.display())]
    FileUnreadable { path: PathBuf, reason: String },

    /// The file extension does not map to any storage backend
    #[error("Unsupported data file format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// A declared output name has no dataset in the file
    #[error("Dataset '{name}' not found in {}", .path.display())]
    DatasetMissing { path: PathBuf, name: String },

    /// The dataset exists but cannot be used as a numeric tensor
    #[error("Dataset '{name}' in {} is malformed: {reason}", .path.display())]
    DatasetMalformed {
        path: PathBuf,
        name: String,
        reason: String,
    },

    /// Two outputs in the same file disagree on their row count
    #[error(
        "Dataset '{name}' in {} has {actual} rows, expected {expected}",
        .path.display()
    )]
    RowCountMismatch {
        path: PathBuf,
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Closing the data file reported a failure
    #[error("Failed to close data file {}: {reason}", .path.display())]
    CloseFailure { path: PathBuf, reason: String },

    // ========== Layer Errors ==========
    /// The configuration record is unusable
    #[error("Invalid data layer configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The configuration record could not be parsed
    #[error("Failed to parse data layer configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The caller passed a different number of outputs than declared tops
    #[error("Expected {expected} output blobs, got {actual}")]
    OutputCountMismatch { expected: usize, actual: usize },

    /// An output blob does not have the layout the loaded data needs
    #[error("Output '{name}' holds {actual} elements per sample, data rows hold {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// `forward` was called before a successful `setup`
    #[error("Data layer used before setup")]
    NotSetUp,

    /// The image transformer failed on a sample
    #[error("Image transform failed: {0:#}")]
    Transform(anyhow::Error),
}

impl DataLayerError {
    /// Returns true if this error means the data on disk is inconsistent
    pub fn is_data_corruption(&self) -> bool {
        matches!(
            self,
            DataLayerError::RowCountMismatch { .. }
                | DataLayerError::DatasetMalformed { .. }
                | DataLayerError::CloseFailure { .. }
        )
    }
}

/// Result type alias for data layer operations
pub type Result<T> = std::result::Result<T, DataLayerError>;
