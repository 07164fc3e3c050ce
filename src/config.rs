//! Session configuration.
//!
//! Loaded once from JSON, validated before any tick runs. Invalid lag or
//! batch combinations are rejected here, never mid-run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::volume::UnitPattern;

/// Arrival detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStrategy {
    /// Re-check existence of the next expected path every poll interval.
    Poll,
    /// Subscribe to filesystem creation events.
    Notify,
}

/// Classifier family wired into the model manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamilyKind {
    /// Refit from scratch on the full training window.
    Batch,
    /// Fold batches into a running model; class set declared up front.
    Incremental,
}

fn default_watch_strategy() -> WatchStrategy {
    WatchStrategy::Poll
}

fn default_poll_interval() -> f64 {
    0.1
}

fn default_model_family() -> ModelFamilyKind {
    ModelFamilyKind::Batch
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory the acquisition process writes unit files into.
    pub unit_dir: PathBuf,
    pub mask_path: PathBuf,
    pub label_path: PathBuf,
    /// Run length; the simulated acquisition knows its volume count.
    pub total_units: usize,
    /// Nominal inter-unit interval = per-tick deadline (seconds).
    pub tick_period_secs: f64,
    /// Units collected before the one-time initial training.
    pub train_count: usize,
    /// Hemodynamic-lag offset between a unit and its label index.
    pub lag: usize,
    /// Retrain every B predicting ticks on the latest B pairs; 0 disables.
    #[serde(default)]
    pub incremental_batch_size: usize,
    #[serde(default = "default_watch_strategy")]
    pub watch_strategy: WatchStrategy,
    /// Used only when `watch_strategy` is `poll` (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,
    #[serde(default = "default_model_family")]
    pub model_family: ModelFamilyKind,
    #[serde(default)]
    pub unit_pattern: UnitPattern,
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let bytes = std::fs::read(path)?;
        let config: SessionConfig = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.train_count == 0 {
            return Err(PipelineError::InvalidConfig(
                "train_count must be positive".to_string(),
            ));
        }
        if self.lag >= self.train_count {
            return Err(PipelineError::InvalidLag {
                lag: self.lag,
                train_count: self.train_count,
            });
        }
        if self.total_units == 0 {
            return Err(PipelineError::InvalidConfig(
                "total_units must be positive".to_string(),
            ));
        }
        if self.tick_period_secs <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "tick_period_secs must be positive".to_string(),
            ));
        }
        // Keeps every retrain window inside known history: the first
        // retrain tick is train_count + B, so idx - B - lag >= 0 holds.
        if self.incremental_batch_size > self.train_count {
            return Err(PipelineError::InvalidConfig(format!(
                "incremental_batch_size {} must not exceed train_count {}",
                self.incremental_batch_size, self.train_count
            )));
        }
        if self.watch_strategy == WatchStrategy::Poll && self.poll_interval_secs <= 0.0 {
            return Err(PipelineError::InvalidConfig(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.unit_pattern.index_width == 0 {
            return Err(PipelineError::InvalidConfig(
                "unit_pattern.index_width must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(self.tick_period_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }
}
