//! Ground-truth labels and lag alignment.
//!
//! Labels are indexed independently of units and related to them through
//! a fixed lag offset modeling the hemodynamic response delay. The
//! source trait keeps partial availability possible: a live deployment
//! only knows labels already observed, so the pipeline never assumes
//! full foresight beyond what it has consumed.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::PipelineError;

pub type ClassLabel = i64;

/// Label index unit `unit_index` is scored against, `None` while the
/// unit is still inside the lag horizon (such units are never scored).
pub fn aligned_label_index(unit_index: usize, lag: usize) -> Option<usize> {
    unit_index.checked_sub(lag)
}

pub trait LabelSource: Send {
    /// Ground truth at label index `index`, if already known.
    fn label(&self, index: usize) -> Option<ClassLabel>;

    /// Contiguous label range `[start, end)`; every label must be known.
    fn range(&self, start: usize, end: usize) -> Result<Vec<ClassLabel>, PipelineError> {
        (start..end)
            .map(|i| {
                self.label(i)
                    .ok_or(PipelineError::MissingLabels { start, end })
            })
            .collect()
    }

    /// Distinct class set, sorted. Incremental families need the full
    /// set declared before the first batch arrives.
    fn classes(&self) -> Vec<ClassLabel>;
}

/// Whole-run labels loaded up front (simulation mode).
#[derive(Debug, Clone)]
pub struct PreloadedLabels {
    labels: Vec<ClassLabel>,
}

impl PreloadedLabels {
    pub fn new(labels: Vec<ClassLabel>) -> Self {
        Self { labels }
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path)?;
        let labels: Vec<ClassLabel> = serde_json::from_slice(&bytes)?;
        if labels.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "label file is empty".to_string(),
            ));
        }
        log::info!("{} labels loaded from {}", labels.len(), path.display());
        Ok(Self { labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelSource for PreloadedLabels {
    fn label(&self, index: usize) -> Option<ClassLabel> {
        self.labels.get(index).copied()
    }

    fn classes(&self) -> Vec<ClassLabel> {
        self.labels
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
