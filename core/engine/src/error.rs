//! FILENAME: core/engine/src/error.rs

use parser::ParseError;
use thiserror::Error;

/// Failure to compile or evaluate a formula. Always local to the computed
/// column (or line filter) whose formula produced it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Column col{index} does not exist (row has {width} columns)")]
    ColumnOutOfRange { index: usize, width: usize },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid rowval filter: {0}")]
    InvalidRowFilter(String),

    #[error("{function}: {message}")]
    Function { function: String, message: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid regular expression: {0}")]
    Regex(String),
}

impl FormulaError {
    pub fn function(function: &str, message: impl Into<String>) -> Self {
        FormulaError::Function {
            function: function.to_lowercase(),
            message: message.into(),
        }
    }
}
