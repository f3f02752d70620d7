//! FILENAME: app/src/error.rs
// PURPOSE: Errors surfaced by the command-line host.

use std::path::PathBuf;

use export::ExportError;
use table_engine::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Cannot write output: {0}")]
    Output(#[from] std::io::Error),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}
