//! Error types for the learned estimator.
//!
//! The taxonomy separates per-record defects, which the training pipeline
//! recovers from locally, from data-volume and artifact-integrity defects,
//! which are fatal to the operation that hit them.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type for estimator operations.
#[derive(Error, Debug)]
pub enum EstimatorError {
    /// A single execution-log record could not be used.
    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// Not enough valid records to train a model.
    #[error(
        "Insufficient training data: found {found} valid records, need at least {required}. \
         Collect more query logs before training."
    )]
    InsufficientData { found: usize, required: usize },

    /// Prediction or persistence attempted on a model that was never fitted.
    #[error("Model is not trained")]
    ModelNotTrained,

    /// A persisted model artifact is missing, corrupt or incomplete.
    #[error("Failed to load model from {}: {message}", path.display())]
    ModelLoad { path: PathBuf, message: String },

    /// The execution log to train from does not exist.
    #[error("Log file not found: {}", path.display())]
    LogNotFound { path: PathBuf },

    /// Serialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl EstimatorError {
    /// Create a malformed record error.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: message.into(),
        }
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(found: usize, required: usize) -> Self {
        Self::InsufficientData { found, required }
    }

    /// Create a model load error.
    pub fn model_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Whether the training pipeline may skip past this error and continue.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::MalformedRecord { .. })
    }
}

/// Result type alias for estimator operations.
pub type Result<T> = std::result::Result<T, EstimatorError>;
