//! FILENAME: core/export/src/lib.rs
//! CSV export of enhanced tables.
//!
//! - `csv`: Escaping, encoding and row assembly
//! - `stream`: Bounded export and the paginated full export

pub mod csv;
pub mod error;
pub mod stream;

pub use csv::{escape_cell, export_file_name, CsvAssembler, CsvOptions, LINE_END};
pub use error::ExportError;
pub use stream::{
    export_display, save_display, CsvFile, ExportSink, ExportState, ExportSummary, FileSink, FullExport,
    MemorySink, Page, PageRequest, PageSource,
};
