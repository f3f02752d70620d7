//! FILENAME: core/table-engine/src/error.rs
//! Error types for the table pipeline.

use engine::FormulaError;
use thiserror::Error;

/// A configuration problem that halts the refresh cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("The 'Split cols' bucket must be the last one")]
    SplitColsNotLast,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
}

/// A formula failure attributed to one computed column (or the line filter).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{source_label}: {error}")]
pub struct ColumnFormulaError {
    /// Index in the configured computed column list; None for the line filter.
    pub spec_index: Option<usize>,
    pub source_label: String,
    pub error: FormulaError,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Parameter JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
