//! Pipeline error taxonomy.
//!
//! One enum for everything that can abort a session. Deadline overruns are
//! deliberately absent: they are reported by the monitor, never raised.

use std::path::PathBuf;

use crate::model::ModelError;

#[derive(Debug)]
pub enum PipelineError {
    IoError(std::io::Error),
    SerializationError(serde_json::Error),
    /// Rejected at configuration validation, before any ticks run.
    InvalidConfig(String),
    /// Lag must stay strictly below the training-unit count.
    InvalidLag { lag: usize, train_count: usize },
    /// Unit and mask disagree on volume geometry.
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    /// Content still unparseable after the retry budget.
    UnreadableUnit {
        path: PathBuf,
        attempts: u32,
        detail: String,
    },
    /// The training store only accepts the next index, exactly once.
    OutOfOrderAppend { expected: usize, actual: usize },
    /// Feature vector was computed against a different mask.
    MaskMismatch { expected: u32, actual: u32 },
    /// A training window needs ground truth that is not yet known.
    MissingLabels { start: usize, end: usize },
    /// Underlying fit or predict rejected the data.
    Model(ModelError),
    /// The event subscription went away underneath a waiting consumer.
    SourceClosed,
    /// Filesystem watcher backend failure.
    WatchError(String),
}

impl PipelineError {
    /// Stable short name for failure reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::IoError(_) => "Io",
            PipelineError::SerializationError(_) => "Serialization",
            PipelineError::InvalidConfig(_) => "InvalidConfig",
            PipelineError::InvalidLag { .. } => "InvalidLagConfiguration",
            PipelineError::ShapeMismatch { .. } => "ShapeMismatch",
            PipelineError::UnreadableUnit { .. } => "UnreadableUnit",
            PipelineError::OutOfOrderAppend { .. } => "OutOfOrderAppend",
            PipelineError::MaskMismatch { .. } => "MaskMismatch",
            PipelineError::MissingLabels { .. } => "MissingLabels",
            PipelineError::Model(_) => "ModelTrainFailure",
            PipelineError::SourceClosed => "SourceClosed",
            PipelineError::WatchError(_) => "WatchError",
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::IoError(e) => write!(f, "IO Error: {}", e),
            PipelineError::SerializationError(e) => write!(f, "Serialization Error: {}", e),
            PipelineError::InvalidConfig(msg) => write!(f, "Invalid Configuration: {}", msg),
            PipelineError::InvalidLag { lag, train_count } => {
                write!(
                    f,
                    "Invalid Lag Configuration: lag {} must be < train_count {}",
                    lag, train_count
                )
            }
            PipelineError::ShapeMismatch { expected, actual } => {
                write!(
                    f,
                    "Shape Mismatch: mask is {:?}, volume is {:?}",
                    expected, actual
                )
            }
            PipelineError::UnreadableUnit {
                path,
                attempts,
                detail,
            } => {
                write!(
                    f,
                    "Unreadable Unit: {} after {} attempts ({})",
                    path.display(),
                    attempts,
                    detail
                )
            }
            PipelineError::OutOfOrderAppend { expected, actual } => {
                write!(
                    f,
                    "Out-Of-Order Append: expected unit {}, got {}",
                    expected, actual
                )
            }
            PipelineError::MaskMismatch { expected, actual } => {
                write!(
                    f,
                    "Mask Mismatch: store fingerprint {:x}, feature fingerprint {:x}",
                    expected, actual
                )
            }
            PipelineError::MissingLabels { start, end } => {
                write!(f, "Missing Labels: range {}..{} not fully known", start, end)
            }
            PipelineError::Model(e) => write!(f, "Model Error: {}", e),
            PipelineError::SourceClosed => write!(f, "Event source closed"),
            PipelineError::WatchError(msg) => write!(f, "Watch Error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::IoError(e) => Some(e),
            PipelineError::SerializationError(e) => Some(e),
            PipelineError::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err)
    }
}

impl From<ModelError> for PipelineError {
    fn from(err: ModelError) -> Self {
        PipelineError::Model(err)
    }
}
