//! Orchestration loop.
//!
//! A single sequential consumer drives every tick: await unit →
//! preprocess → accumulate → (train | predict) → bookkeeping, under
//! deadline supervision. No parallel fan-out across units; each tick's
//! correctness depends on the previous tick's committed model state and
//! accuracy counters.

pub mod deadline;
pub mod sink;


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::SessionConfig;
use crate::error::PipelineError;
use crate::features::preprocess::preprocess;
use crate::features::TrainingStore;
use crate::labels::{aligned_label_index, LabelSource};
use crate::model::manager::ModelManager;
use crate::source::UnitSource;
use crate::volume::VolumeMask;

use deadline::{DeadlineMonitor, DeadlineStats};
use sink::{FeedbackSink, TickOutput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingFirstUnit,
    Collecting,
    Training,
    Predicting,
    RetrainingBarrier,
    Completed,
    Aborted,
}

/// Session-lifetime mutable state. Created at run start, owned by the
/// controller, discarded at `Completed`/`Aborted`.
#[derive(Debug)]
pub struct RunState {
    pub phase: Phase,
    /// Ticks fully committed so far.
    pub tick: usize,
    pub predicted: usize,
    pub correct: usize,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: Phase::AwaitingFirstUnit,
            tick: 0,
            predicted: 0,
            correct: 0,
        }
    }

    pub fn accuracy(&self) -> Option<f32> {
        if self.predicted == 0 {
            None
        } else {
            Some(self.correct as f32 / self.predicted as f32)
        }
    }

    fn score(&mut self, correct: bool) {
        self.predicted += 1;
        if correct {
            self.correct += 1;
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub ticks: usize,
    pub predicted: usize,
    pub correct: usize,
    pub accuracy: Option<f32>,
    pub model_version: Option<u64>,
    pub deadline: DeadlineStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// A run that ended in `Aborted`. Partial results already computed stay
/// valid and are not rolled back.
#[derive(Debug)]
pub struct SessionFailure {
    pub error: PipelineError,
    pub completed_ticks: usize,
    pub last_accuracy: Option<f32>,
}

impl std::fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.last_accuracy {
            Some(accuracy) => write!(
                f,
                "session aborted [{}] after {} ticks (last accuracy {:.3}): {}",
                self.error.kind(),
                self.completed_ticks,
                accuracy,
                self.error
            ),
            None => write!(
                f,
                "session aborted [{}] after {} ticks: {}",
                self.error.kind(),
                self.completed_ticks,
                self.error
            ),
        }
    }
}

impl std::error::Error for SessionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Cooperative stop flag. Stopping lets the in-flight tick finish and is
/// idempotent, including after an abort already tore the session down.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub struct PipelineController {
    config: SessionConfig,
    source: Box<dyn UnitSource>,
    mask: VolumeMask,
    labels: Box<dyn LabelSource>,
    models: ModelManager,
    monitor: DeadlineMonitor,
    sink: Box<dyn FeedbackSink>,
    stop: Arc<AtomicBool>,
}

impl PipelineController {
    pub fn new(
        config: SessionConfig,
        source: Box<dyn UnitSource>,
        mask: VolumeMask,
        labels: Box<dyn LabelSource>,
        models: ModelManager,
        sink: Box<dyn FeedbackSink>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        let monitor = DeadlineMonitor::new(config.tick_period());
        Ok(Self {
            config,
            source,
            mask,
            labels,
            models,
            monitor,
            sink,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.stop))
    }

    /// Run the session to completion. The event subscription is released
    /// on every exit path before the result propagates.
    pub fn run(mut self) -> Result<RunSummary, SessionFailure> {
        let started_at = Utc::now();
        log::info!(
            "session start: {} units, train_count {}, lag {}, batch {}, {} model",
            self.config.total_units,
            self.config.train_count,
            self.config.lag,
            self.config.incremental_batch_size,
            self.models.family()
        );

        let mut state = RunState::new();
        let result = self.drive(&mut state);
        self.source.shutdown();

        match result {
            Ok(()) => {
                state.phase = Phase::Completed;
                let summary = RunSummary {
                    ticks: state.tick,
                    predicted: state.predicted,
                    correct: state.correct,
                    accuracy: state.accuracy(),
                    model_version: self.models.active_version(),
                    deadline: self.monitor.stats(),
                    started_at,
                    finished_at: Utc::now(),
                };
                log::info!(
                    "session complete: {} ticks, {}/{} correct, {} deadline violations",
                    summary.ticks,
                    summary.correct,
                    summary.predicted,
                    summary.deadline.violations
                );
                Ok(summary)
            }
            Err(error) => {
                state.phase = Phase::Aborted;
                log::error!("session aborted at tick {}: {}", state.tick, error);
                Err(SessionFailure {
                    error,
                    completed_ticks: state.tick,
                    last_accuracy: state.accuracy(),
                })
            }
        }
    }

    fn drive(&mut self, state: &mut RunState) -> Result<(), PipelineError> {
        let train_count = self.config.train_count;
        let lag = self.config.lag;
        let batch = self.config.incremental_batch_size;
        let mut store = TrainingStore::new(self.mask.fingerprint(), self.mask.active_count());

        for idx in 0..self.config.total_units {
            if self.stop.load(Ordering::Relaxed) {
                log::info!("stop requested; ending run after {} ticks", state.tick);
                break;
            }

            let timer = self.monitor.begin(idx);
            let unit = self.source.await_unit(idx)?;
            let features = preprocess(&unit.volume, &self.mask)?;
            store.append(idx, features.clone())?;

            let mut output = TickOutput {
                index: idx,
                phase: state.phase,
                prediction: None,
                confidence: None,
                truth: None,
                accuracy: None,
                model_version: self.models.active_version(),
                overran: false,
                elapsed_ms: 0.0,
            };

            if idx < train_count {
                state.phase = Phase::Collecting;
                output.phase = Phase::Collecting;
            } else if idx == train_count {
                // One-time initial training: features [lag, train_count)
                // against labels [0, train_count - lag). The unit that
                // triggered it is accumulated but neither trained on nor
                // scored this tick.
                state.phase = Phase::Training;
                output.phase = Phase::Training;
                let window = store.window(lag, train_count)?;
                let train_labels = self.labels.range(0, train_count - lag)?;
                let version = self.models.train_initial(window.view(), &train_labels)?;
                log::info!(
                    "initial training at tick {}: {} samples, model v{}",
                    idx,
                    train_labels.len(),
                    version
                );
                state.phase = Phase::Predicting;
            } else {
                state.phase = Phase::Predicting;
                output.phase = Phase::Predicting;
                let (prediction, version) = self.models.predict(features.view())?;
                output.model_version = Some(version);
                output.prediction = Some(prediction.label);
                output.confidence = prediction.confidence;

                // idx > train_count > lag, so the alignment always lands.
                if let Some(label_index) = aligned_label_index(idx, lag) {
                    match self.labels.label(label_index) {
                        Some(truth) => {
                            output.truth = Some(truth);
                            state.score(prediction.label == truth);
                        }
                        None => log::debug!(
                            "label {} not yet known; tick {} left unscored",
                            label_index,
                            idx
                        ),
                    }
                }
                output.accuracy = state.accuracy();

                if batch > 0 && (idx - train_count) % batch == 0 {
                    state.phase = Phase::RetrainingBarrier;
                    let window = store.window(idx - batch, idx)?;
                    let train_labels = self.labels.range(idx - batch - lag, idx - lag)?;
                    let version = self.models.retrain(window.view(), &train_labels)?;
                    log::info!(
                        "incremental retrain at tick {}: {} samples, model v{}",
                        idx,
                        train_labels.len(),
                        version
                    );
                    state.phase = Phase::Predicting;
                }
            }

            let report = timer.finish();
            output.overran = report.overran;
            output.elapsed_ms = report.elapsed.as_secs_f32() * 1000.0;
            state.tick = idx + 1;
            self.sink.on_tick(&output);
        }

        Ok(())
    }
}
