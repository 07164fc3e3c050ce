//! Feature vectors and the training store.
//!
//! A feature vector carries the fingerprint of the mask it was computed
//! against; the store checks it on every append so a mask/feature
//! mismatch cannot survive a session unnoticed.

pub mod preprocess;

#[cfg(test)]
mod tests;

use ndarray::{Array2, ArrayView1};

use crate::error::PipelineError;

/// Masked, per-volume-standardized representation of one unit. Owned by
/// the tick that created it; shared only by explicit accumulation into
/// the training store.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    /// Fingerprint of the mask this vector was derived with.
    pub mask_hash: u32,
    pub values: Vec<f32>,
}

impl FeatureVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(&self.values[..])
    }
}

/// Append-only, index-ordered accumulation of feature vectors. The
/// append contract enforces the compute-at-most-once invariant: each
/// unit index is accepted exactly once, in sequence.
#[derive(Debug)]
pub struct TrainingStore {
    mask_hash: u32,
    dim: usize,
    rows: Vec<FeatureVector>,
}

impl TrainingStore {
    pub fn new(mask_hash: u32, dim: usize) -> Self {
        Self {
            mask_hash,
            dim,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn append(&mut self, index: usize, features: FeatureVector) -> Result<(), PipelineError> {
        if index != self.rows.len() {
            return Err(PipelineError::OutOfOrderAppend {
                expected: self.rows.len(),
                actual: index,
            });
        }
        if features.mask_hash != self.mask_hash {
            return Err(PipelineError::MaskMismatch {
                expected: self.mask_hash,
                actual: features.mask_hash,
            });
        }
        if features.len() != self.dim {
            return Err(PipelineError::ShapeMismatch {
                expected: vec![self.dim],
                actual: vec![features.len()],
            });
        }
        self.rows.push(features);
        Ok(())
    }

    pub fn feature(&self, index: usize) -> Option<&FeatureVector> {
        self.rows.get(index)
    }

    /// Dense copy of rows `[start, end)` as a training matrix.
    pub fn window(&self, start: usize, end: usize) -> Result<Array2<f32>, PipelineError> {
        if start > end || end > self.rows.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "training window {}..{} out of range ({} rows stored)",
                start,
                end,
                self.rows.len()
            )));
        }
        let mut matrix = Array2::zeros((end - start, self.dim));
        for (r, features) in self.rows[start..end].iter().enumerate() {
            for (c, &value) in features.values.iter().enumerate() {
                matrix[[r, c]] = value;
            }
        }
        Ok(matrix)
    }
}
