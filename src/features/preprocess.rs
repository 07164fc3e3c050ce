//! Mask selection and per-volume standardization.

use crate::constants::STD_EPSILON;
use crate::error::PipelineError;
use crate::volume::{RawVolume, VolumeMask};

use super::FeatureVector;

/// Turn a raw volume into a feature vector.
///
/// Selects the active mask positions in flattened order (the same
/// position always maps to the same feature index within a session),
/// then z-scores over this volume's selected elements only. Temporal
/// normalization across volumes is deliberately not done here: it would
/// need volumes that have not arrived yet.
pub fn preprocess(volume: &RawVolume, mask: &VolumeMask) -> Result<FeatureVector, PipelineError> {
    if volume.shape != mask.shape {
        return Err(PipelineError::ShapeMismatch {
            expected: mask.shape.clone(),
            actual: volume.shape.clone(),
        });
    }

    let selected: Vec<f32> = volume
        .data
        .iter()
        .zip(mask.data.iter())
        .filter(|(_, &active)| active)
        .map(|(&value, _)| value)
        .collect();

    let mask_hash = mask.fingerprint();
    let n = selected.len();
    if n == 0 {
        return Ok(FeatureVector {
            mask_hash,
            values: Vec::new(),
        });
    }

    let mean = selected.iter().sum::<f32>() / n as f32;
    let variance = selected.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n as f32;
    let std = variance.sqrt();

    let values = if std < STD_EPSILON {
        // Flat volume: defined as zero features, not a division by ~0.
        vec![0.0; n]
    } else {
        selected.iter().map(|v| (v - mean) / std).collect()
    };

    Ok(FeatureVector { mask_hash, values })
}
