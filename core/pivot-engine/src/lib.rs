//! FILENAME: core/pivot-engine/src/lib.rs
//! Split transforms for the table pipeline.
//!
//! This crate turns one flat leaf table into the shape the renderer shows.
//! It depends on `engine` for the table model, formatters and formulas.
//!
//! Layers:
//! - `split_table`: row-wise split (distinct values become sub-tables)
//! - `split_cols`: column-wise split (distinct values become columns)
//! - `reference`: backfill values for computed columns in missing combinations

pub mod reference;
pub mod split_cols;
pub mod split_table;

pub use reference::ReferenceRow;
pub use split_cols::split_cols;
pub use split_table::{metrics_per_bucket, split_table};
