//! Nearest-centroid classifier families.
//!
//! Deterministic and cheap per tick; chosen for the pipeline's default
//! wiring, not for statistical quality. The batch family refits per-class
//! means from scratch, the incremental family keeps running sums so a
//! batch missing one class cannot shrink the class space.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::labels::ClassLabel;

use super::{ModelError, Prediction, TrainableModel};

fn nearest(
    centroids: &[(ClassLabel, Array1<f32>)],
    features: ArrayView1<'_, f32>,
) -> Result<Prediction, ModelError> {
    if centroids.is_empty() {
        return Err(ModelError::NotTrained);
    }
    let dim = centroids[0].1.len();
    if features.len() != dim {
        return Err(ModelError::DimensionMismatch {
            expected: dim,
            actual: features.len(),
        });
    }

    let mut best: Option<(ClassLabel, f32)> = None;
    let mut runner_up: Option<f32> = None;
    for (label, centroid) in centroids {
        let distance: f32 = centroid
            .iter()
            .zip(features.iter())
            .map(|(c, v)| (c - v).powi(2))
            .sum();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {
                runner_up = Some(runner_up.map_or(distance, |r| r.min(distance)));
            }
            _ => {
                runner_up = best.map(|(_, d)| d);
                best = Some((*label, distance));
            }
        }
    }

    let (label, best_distance) = best.unwrap_or((0, 0.0));
    // Distance margin against the runner-up; a lone class gives no basis
    // for a confidence estimate.
    let confidence = runner_up.map(|second| {
        let total = best_distance + second;
        if total > 0.0 {
            second / total
        } else {
            0.5
        }
    });

    Ok(Prediction { label, confidence })
}

fn check_batch(features: ArrayView2<'_, f32>, labels: &[ClassLabel]) -> Result<(), ModelError> {
    if features.nrows() == 0 {
        return Err(ModelError::EmptyBatch);
    }
    if features.nrows() != labels.len() {
        return Err(ModelError::LengthMismatch {
            rows: features.nrows(),
            labels: labels.len(),
        });
    }
    Ok(())
}

/// Batch family: refits per-class mean vectors from the full window.
#[derive(Debug, Clone, Default)]
pub struct CentroidModel {
    centroids: Vec<(ClassLabel, Array1<f32>)>,
}

impl CentroidModel {
    /// Untrained instance, used as the training template.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrainableModel for CentroidModel {
    fn name(&self) -> &'static str {
        "nearest-centroid"
    }

    fn train(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[ClassLabel],
    ) -> Result<Box<dyn TrainableModel>, ModelError> {
        check_batch(features, labels)?;

        let mut sums: BTreeMap<ClassLabel, (Array1<f32>, u64)> = BTreeMap::new();
        for (row, &label) in features.axis_iter(Axis(0)).zip(labels) {
            let entry = sums
                .entry(label)
                .or_insert_with(|| (Array1::zeros(features.ncols()), 0));
            entry.0 += &row;
            entry.1 += 1;
        }
        let centroids = sums
            .into_iter()
            .map(|(label, (sum, count))| (label, sum / count as f32))
            .collect();

        Ok(Box::new(CentroidModel { centroids }))
    }

    fn predict(&self, features: ArrayView1<'_, f32>) -> Result<Prediction, ModelError> {
        nearest(&self.centroids, features)
    }
}

/// Incremental family: running per-class sums and counts. The class set
/// is fixed at construction; a batch lacking one class leaves that
/// class's state untouched, a label outside the set is an error.
#[derive(Debug, Clone)]
pub struct IncrementalCentroid {
    classes: Vec<ClassLabel>,
    sums: Vec<Array1<f32>>,
    counts: Vec<u64>,
}

impl IncrementalCentroid {
    pub fn new(mut classes: Vec<ClassLabel>) -> Self {
        classes.sort_unstable();
        classes.dedup();
        Self {
            counts: vec![0; classes.len()],
            sums: Vec::new(),
            classes,
        }
    }

    fn class_index(&self, label: ClassLabel) -> Option<usize> {
        self.classes.binary_search(&label).ok()
    }

    fn centroids(&self) -> Vec<(ClassLabel, Array1<f32>)> {
        self.classes
            .iter()
            .zip(self.sums.iter().zip(self.counts.iter()))
            .filter(|(_, (_, &count))| count > 0)
            .map(|(&label, (sum, &count))| (label, sum.clone() / count as f32))
            .collect()
    }
}

impl TrainableModel for IncrementalCentroid {
    fn name(&self) -> &'static str {
        "incremental-centroid"
    }

    fn train(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[ClassLabel],
    ) -> Result<Box<dyn TrainableModel>, ModelError> {
        check_batch(features, labels)?;

        let mut next = self.clone();
        if next.sums.is_empty() {
            next.sums = vec![Array1::zeros(features.ncols()); next.classes.len()];
        } else if next.sums[0].len() != features.ncols() {
            return Err(ModelError::DimensionMismatch {
                expected: next.sums[0].len(),
                actual: features.ncols(),
            });
        }

        for (row, &label) in features.axis_iter(Axis(0)).zip(labels) {
            let class = next
                .class_index(label)
                .ok_or(ModelError::UnknownClass(label))?;
            next.sums[class] += &row;
            next.counts[class] += 1;
        }

        Ok(Box::new(next))
    }

    fn predict(&self, features: ArrayView1<'_, f32>) -> Result<Prediction, ModelError> {
        nearest(&self.centroids(), features)
    }
}
