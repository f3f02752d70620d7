//! FILENAME: core/export/src/error.rs

use table_engine::ConfigurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported encoding: {0}")]
    Encoding(String),

    #[error("Write error: {0}")]
    Write(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Page fetch failed: {0}")]
    Source(String),

    #[error(transparent)]
    Pipeline(#[from] ConfigurationError),
}
