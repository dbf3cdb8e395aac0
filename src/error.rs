//! Error types.

use std::path::PathBuf;

use crate::classifier::ModelName;

/// Errors produced while loading resources or classifying frames.
///
/// Loading errors ([`Error::Config`]) are fatal and should abort startup. Errors produced while
/// processing a frame are caught by the [`Pipeline`][crate::pipeline::Pipeline], which logs them
/// and passes the frame through unannotated.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A label file, model artifact, network, or configuration value is missing or malformed.
    #[error("invalid configuration in '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// A feature vector or pixel buffer does not have the expected number of elements.
    #[error("dimension mismatch: expected {expected} elements, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A classifier predicted a class index that has no entry in the label table.
    #[error("no label for class index {0}")]
    UnknownClass(u32),

    /// The selected model is not part of the registry.
    #[error("model '{0}' is not loaded")]
    ModelNotLoaded(ModelName),

    /// A neural network failed at inference time.
    #[error("inference failed: {0}")]
    Inference(#[source] anyhow::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::Config`] for the resource at `path`.
    pub fn config(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// A `Result` type alias using this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
