//! Per-tick output boundary toward the external feedback consumer.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::labels::ClassLabel;

use super::Phase;

/// Everything the feedback side gets to see about one tick. No wire
/// format is imposed here; the sink decides.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub index: usize,
    pub phase: Phase,
    pub prediction: Option<ClassLabel>,
    pub confidence: Option<f32>,
    pub truth: Option<ClassLabel>,
    /// Running accuracy; `None` before the first scored prediction.
    pub accuracy: Option<f32>,
    pub model_version: Option<u64>,
    pub overran: bool,
    pub elapsed_ms: f32,
}

pub trait FeedbackSink: Send {
    fn on_tick(&mut self, output: &TickOutput);
}

/// Default sink: structured log lines.
#[derive(Debug, Default)]
pub struct LogSink;

impl FeedbackSink for LogSink {
    fn on_tick(&mut self, output: &TickOutput) {
        match (output.prediction, output.accuracy) {
            (Some(label), Some(accuracy)) => log::info!(
                "tick {:>4} predicted {} (truth {:?}) accuracy {:.3} [{:.1} ms]",
                output.index,
                label,
                output.truth,
                accuracy,
                output.elapsed_ms
            ),
            (Some(label), None) => log::info!(
                "tick {:>4} predicted {} (unscored) [{:.1} ms]",
                output.index,
                label,
                output.elapsed_ms
            ),
            _ => log::debug!(
                "tick {:>4} {:?} [{:.1} ms]",
                output.index,
                output.phase,
                output.elapsed_ms
            ),
        }
    }
}

/// Sink that records every tick behind a shared handle, for tests and
/// embedding callers that want to inspect a finished run.
#[derive(Debug, Default)]
pub struct MemorySink {
    outputs: Arc<Mutex<Vec<TickOutput>>>,
}

impl MemorySink {
    pub fn new() -> (Self, Arc<Mutex<Vec<TickOutput>>>) {
        let outputs = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                outputs: Arc::clone(&outputs),
            },
            outputs,
        )
    }
}

impl FeedbackSink for MemorySink {
    fn on_tick(&mut self, output: &TickOutput) {
        self.outputs.lock().push(output.clone());
    }
}
