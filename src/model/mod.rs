//! Trainable model capability.
//!
//! The pipeline treats the classifier as an opaque capability with two
//! operations: `train` produces a new model from a feature window, and
//! `predict` classifies one feature vector. Batch and incremental
//! fitting are separate families behind the same trait, so the manager
//! and controller never depend on a concrete family.

pub mod centroid;
pub mod manager;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::labels::ClassLabel;

/// One classification decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: ClassLabel,
    /// In [0, 1] when the family can estimate one.
    pub confidence: Option<f32>,
}

#[derive(Debug)]
pub enum ModelError {
    NotTrained,
    EmptyBatch,
    /// Label outside the class set declared at initialization.
    UnknownClass(ClassLabel),
    LengthMismatch { rows: usize, labels: usize },
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::NotTrained => write!(f, "model has not been trained"),
            ModelError::EmptyBatch => write!(f, "training batch is empty"),
            ModelError::UnknownClass(label) => {
                write!(f, "label {} is outside the declared class set", label)
            }
            ModelError::LengthMismatch { rows, labels } => {
                write!(f, "{} feature rows but {} labels", rows, labels)
            }
            ModelError::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "feature dimension {} does not match model dimension {}",
                    actual, expected
                )
            }
        }
    }
}

impl std::error::Error for ModelError {}

/// A model that can produce a successor from training data and classify
/// feature vectors.
pub trait TrainableModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce a new model from a training window. Batch families refit
    /// from scratch; incremental families fold the batch into a copy of
    /// their running state.
    fn train(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[ClassLabel],
    ) -> Result<Box<dyn TrainableModel>, ModelError>;

    fn predict(&self, features: ArrayView1<'_, f32>) -> Result<Prediction, ModelError>;
}
