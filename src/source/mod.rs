//! Unit arrival detection.
//!
//! Two interchangeable strategies behind one trait: polling for the
//! next expected path, or subscribing to filesystem creation events.
//! Delivery is addressed by target path, never by queue order, and a
//! request for a unit that never appears blocks indefinitely: the
//! per-tick deadline is the controller's concern, not the source's.

pub mod poll;
pub mod watcher;

use crate::config::{SessionConfig, WatchStrategy};
use crate::error::PipelineError;
use crate::volume::Unit;

pub trait UnitSource: Send {
    /// Block until unit `index` is fully readable, then return it.
    fn await_unit(&mut self, index: usize) -> Result<Unit, PipelineError>;

    /// Release the underlying subscription. Idempotent; safe after an
    /// abort has already triggered it.
    fn shutdown(&mut self);
}

pub fn create_source(config: &SessionConfig) -> Result<Box<dyn UnitSource>, PipelineError> {
    match config.watch_strategy {
        WatchStrategy::Poll => Ok(Box::new(poll::PollSource::new(
            config.unit_dir.clone(),
            config.unit_pattern.clone(),
            config.poll_interval(),
        ))),
        WatchStrategy::Notify => Ok(Box::new(watcher::NotifySource::new(
            config.unit_dir.clone(),
            config.unit_pattern.clone(),
        )?)),
    }
}
