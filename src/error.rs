use std::path::PathBuf;
use thiserror::Error;

/// The main error type for dataug operations.
#[derive(Debug, Error)]
pub enum AugError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Refusing to write labels to {path}: {message}")]
    LabelValidation { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unrecognized augmentation name: {0}")]
    UnknownAugmentation(String),

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Transform '{name}' failed: {message}")]
    Transform { name: &'static str, message: String },

    #[error("Label check failed with {0} issue(s)")]
    CheckFailed(usize),
}
