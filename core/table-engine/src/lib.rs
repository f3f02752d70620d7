//! FILENAME: core/table-engine/src/lib.rs
//! Enhanced table subsystem: parameters, column pipeline and filter bar.
//!
//! This crate turns a tabified response into a display table. It depends
//! on `engine` for the table model and formulas, and on `pivot-engine` for
//! the split transforms.
//!
//! Layers:
//! - `definition`: Serializable parameters (what the table IS)
//! - `pipeline`: The fixed-order column pipeline (HOW it is built)
//! - `computed`, `hidden`, `totals`: Pipeline stages
//! - `filter_bar`, `highlight`: Free-text filtering of the result
//! - `view`: Display model and rendering (WHAT we display)
//! - `controller`: Refresh cycles, filter input and notifications

pub mod computed;
pub mod controller;
pub mod definition;
pub mod error;
pub mod filter_bar;
pub mod hidden;
pub mod highlight;
pub mod pipeline;
pub mod totals;
pub mod view;

pub use computed::{CompiledColumns, ErrorLog, FormulaCache};
pub use controller::{Notifier, TableController};
pub use definition::*;
pub use pipeline::{validate_buckets, ProcessedTable, TablePipeline};
pub use error::{ColumnFormulaError, ConfigurationError, PipelineError};
pub use filter_bar::FilterBar;
pub use highlight::Highlighter;
pub use totals::{column_accumulators, compute_totals, finalize_totals};
pub use view::{CellRenderer, ContainerHints, DisplayTable, RenderedView};

/// Parses parameters from JSON; missing fields take their defaults.
pub fn parse_params(json: &str) -> Result<VisParams, PipelineError> {
    Ok(serde_json::from_str(json)?)
}
