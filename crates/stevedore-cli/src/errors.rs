//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use stevedore_lifecycle::{ControllerError, TelemetryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("instance lifecycle failed: {0}")]
    Lifecycle(#[from] ControllerError),
    #[error("failed to run '{program}': {source}")]
    Spawn { program: String, source: io::Error },
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
