//! Error types for Tcorr processing.

use thiserror::Error;

/// Errors that can occur while computing or selecting Tcorr.
///
/// Configuration errors (`UnsupportedSource`, `IncompatibleSource`,
/// `MissingBand`) are fatal. Only `Transient` errors are retried at the
/// catalog boundary. Absent data is not an error: it resolves to a
/// nodata result instead.
#[derive(Error, Debug)]
pub enum TcorrError {
    /// A required input band is missing from the scene.
    #[error("missing band: {0}")]
    MissingBand(String),

    /// The Tcorr source specifier is not recognized.
    #[error("unsupported tcorr_source: {0}")]
    UnsupportedSource(String),

    /// The Tmax source cannot be combined with the Tcorr source.
    #[error("tmax_source {tmax} is not compatible with tcorr_source {tcorr}")]
    IncompatibleSource { tcorr: String, tmax: String },

    /// Two rasters that must share a grid do not.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    /// Raster values and mask are inconsistent with the grid.
    #[error("invalid raster: {0}")]
    InvalidRaster(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Catalog query error.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Temporary failure reading from the catalog; safe to retry.
    #[error("transient error: {0}")]
    Transient(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// A stored asset could not be decoded.
    #[error("invalid asset: {0}")]
    InvalidAsset(String),

    /// A blocking compute task panicked or was cancelled.
    #[error("compute task failed: {0}")]
    TaskFailed(String),
}

impl TcorrError {
    /// Create a MissingBand error.
    pub fn missing_band(name: impl Into<String>) -> Self {
        Self::MissingBand(name.into())
    }

    /// Create an IncompatibleSource error.
    pub fn incompatible(tcorr: impl Into<String>, tmax: impl Into<String>) -> Self {
        Self::IncompatibleSource {
            tcorr: tcorr.into(),
            tmax: tmax.into(),
        }
    }

    /// Create a GridMismatch error.
    pub fn grid_mismatch(msg: impl Into<String>) -> Self {
        Self::GridMismatch(msg.into())
    }

    /// Create an InvalidRaster error.
    pub fn invalid_raster(msg: impl Into<String>) -> Self {
        Self::InvalidRaster(msg.into())
    }

    /// Create a Transient error.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create a StorageError.
    pub fn storage_error(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    /// Whether the operation that produced this error may succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<std::io::Error> for TcorrError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                Self::Transient(err.to_string())
            }
            _ => Self::StorageError(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for TcorrError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskFailed(err.to_string())
    }
}

impl From<serde_json::Error> for TcorrError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidAsset(err.to_string())
    }
}

/// Result type for Tcorr operations.
pub type Result<T> = std::result::Result<T, TcorrError>;
