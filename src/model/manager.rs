//! Active model lifecycle: versioned, atomically swapped.
//!
//! Exactly one model version is active for inference at any instant.
//! Publishing replaces the whole `Arc` under the write lock, so a
//! reader either sees the previous version or the new one, never a
//! half-updated model. Retraining is triggered by the controller; the
//! manager never self-schedules.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ndarray::{ArrayView1, ArrayView2};
use parking_lot::RwLock;

use crate::error::PipelineError;
use crate::labels::ClassLabel;

use super::{ModelError, Prediction, TrainableModel};

/// One published model generation.
pub struct ModelVersion {
    pub version: u64,
    pub model: Box<dyn TrainableModel>,
}

pub struct ModelManager {
    /// Untrained family instance used for the one-time initial fit.
    template: Box<dyn TrainableModel>,
    active: RwLock<Option<Arc<ModelVersion>>>,
    versions: AtomicU64,
}

impl ModelManager {
    pub fn new(template: Box<dyn TrainableModel>) -> Self {
        Self {
            template,
            active: RwLock::new(None),
            versions: AtomicU64::new(0),
        }
    }

    pub fn family(&self) -> &'static str {
        self.template.name()
    }

    pub fn is_trained(&self) -> bool {
        self.active.read().is_some()
    }

    pub fn active_version(&self) -> Option<u64> {
        self.active.read().as_ref().map(|m| m.version)
    }

    /// First fit of the session; publishes version 1.
    pub fn train_initial(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[ClassLabel],
    ) -> Result<u64, PipelineError> {
        let model = self.template.train(features, labels)?;
        Ok(self.publish(model))
    }

    /// Retrain from the active model on a recent batch.
    pub fn retrain(
        &self,
        features: ArrayView2<'_, f32>,
        labels: &[ClassLabel],
    ) -> Result<u64, PipelineError> {
        let current = self
            .active
            .read()
            .clone()
            .ok_or(PipelineError::Model(ModelError::NotTrained))?;
        let model = current.model.train(features, labels)?;
        Ok(self.publish(model))
    }

    /// Classify against a snapshot of the active model. The snapshot is
    /// taken under the read lock and used after release, so a publish
    /// happening meanwhile cannot tear this call; it completes against
    /// the version it started with.
    pub fn predict(
        &self,
        features: ArrayView1<'_, f32>,
    ) -> Result<(Prediction, u64), PipelineError> {
        let snapshot = self
            .active
            .read()
            .clone()
            .ok_or(PipelineError::Model(ModelError::NotTrained))?;
        let prediction = snapshot.model.predict(features)?;
        Ok((prediction, snapshot.version))
    }

    fn publish(&self, model: Box<dyn TrainableModel>) -> u64 {
        let version = self.versions.fetch_add(1, Ordering::Relaxed) + 1;
        let name = model.name();
        *self.active.write() = Some(Arc::new(ModelVersion { version, model }));
        log::info!("model published: {} v{}", name, version);
        version
    }
}
