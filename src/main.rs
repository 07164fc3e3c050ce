//! rtdecode - session runner.
//!
//! Wires a JSON session configuration to a full closed-loop run: mask
//! and labels are read once, the arrival source is created from the
//! configured strategy, and per-tick results go to the log sink.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rtdecode::config::{ModelFamilyKind, SessionConfig};
use rtdecode::labels::{LabelSource, PreloadedLabels};
use rtdecode::model::centroid::{CentroidModel, IncrementalCentroid};
use rtdecode::model::manager::ModelManager;
use rtdecode::model::TrainableModel;
use rtdecode::pipeline::sink::LogSink;
use rtdecode::pipeline::PipelineController;
use rtdecode::source::create_source;
use rtdecode::volume::VolumeMask;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: rtdecode <session-config.json>");
            return ExitCode::from(2);
        }
    };

    log::info!(
        "{} v{} starting",
        rtdecode::constants::APP_NAME,
        rtdecode::constants::APP_VERSION
    );

    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            log::error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &Path) -> Result<(), String> {
    let config = SessionConfig::load(config_path)
        .map_err(|e| format!("configuration rejected: {}", e))?;

    let mask = VolumeMask::load(&config.mask_path).map_err(|e| e.to_string())?;
    let labels = PreloadedLabels::load(&config.label_path).map_err(|e| e.to_string())?;

    let template: Box<dyn TrainableModel> = match config.model_family {
        ModelFamilyKind::Batch => Box::new(CentroidModel::new()),
        ModelFamilyKind::Incremental => Box::new(IncrementalCentroid::new(labels.classes())),
    };

    let source = create_source(&config).map_err(|e| e.to_string())?;
    let controller = PipelineController::new(
        config,
        source,
        mask,
        Box::new(labels),
        ModelManager::new(template),
        Box::new(LogSink),
    )
    .map_err(|e| e.to_string())?;

    match controller.run() {
        Ok(summary) => {
            match summary.accuracy {
                Some(accuracy) => log::info!(
                    "final accuracy {:.3} over {} predictions",
                    accuracy,
                    summary.predicted
                ),
                None => log::info!("run ended before any scored prediction"),
            }
            Ok(())
        }
        Err(failure) => Err(failure.to_string()),
    }
}
