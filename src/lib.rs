//! Real-time closed-loop volume classification.
//!
//! An external acquisition process writes fixed-interval volumes into a
//! directory. The pipeline detects each new volume, reduces it to a masked
//! and per-volume-standardized feature vector, and either accumulates it
//! for training or classifies it with the active model, under a per-tick
//! wall-clock deadline. Each tick's result is handed to an external
//! feedback consumer through [`pipeline::sink::FeedbackSink`].
//!
//! ## Architecture
//! - `source/` - arrival detection (poll or filesystem events)
//! - `volume/` - on-disk formats and the unit loader
//! - `features/` - mask selection, standardization, training store
//! - `model/` - trainable model capability, families, versioned manager
//! - `pipeline/` - the orchestration loop, deadline supervision, output

pub mod config;
pub mod constants;
pub mod error;
pub mod features;
pub mod labels;
pub mod model;
pub mod pipeline;
pub mod source;
pub mod volume;

pub use config::SessionConfig;
pub use error::PipelineError;
pub use pipeline::{PipelineController, RunSummary, SessionFailure, StopHandle};
