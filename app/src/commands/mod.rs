//! FILENAME: app/src/commands/mod.rs
// PURPOSE: Command implementations.

pub mod export;
pub mod render;

use engine::TabifiedResponse;
use table_engine::{DisplayTable, TableController};

use crate::error::AppError;

/// Runs a refresh cycle and the filter bar, returning the displayed table.
pub fn refresh<'a>(
    controller: &'a mut TableController,
    response: &TabifiedResponse,
    filter: Option<&str>,
) -> Result<&'a DisplayTable, AppError> {
    controller
        .refresh(response)
        .map_err(|err| AppError::Configuration(err.to_string()))?;
    if let Some(text) = filter {
        controller.set_filter(text);
    }
    controller
        .view()
        .ok_or_else(|| AppError::Configuration("no table to display".to_string()))
}
