//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the table engine core.
//! CONTEXT: Re-exports public types and modules for use by other crates:
//! the table data model, formatters, templates and the formula engine.

pub mod aggregate;
pub mod cell;
pub mod column;
pub mod date_format;
pub mod duration_format;
pub mod error;
pub mod evaluator;
pub mod formatter;
pub mod formula;
pub mod functions;
pub mod number_format;
pub mod row_filter;
pub mod table;
pub mod tabify;
pub mod template;
pub mod value_key;

// Re-export commonly used types at the crate root
pub use aggregate::{TotalAccumulator, TotalFunction};
pub use cell::{Cell, CellValue, ContentType, FilterTerm};
pub use column::{
    logical_order, split_cols_index, Alignment, BucketSchema, Column, ColumnKind, ComputedColumn,
};
pub use duration_format::{DurationFormat, DurationUnit};
pub use error::FormulaError;
pub use evaluator::values_equal;
pub use formatter::{escape_html, CellFormatter, FieldFormat, FormatterCache};
pub use formula::{compile, CompiledFormula, EvalContext, RowTable, SplitColContext};
pub use row_filter::{RowAction, RowFilter};
pub use table::{logical_values, LeafTable, RefRow, Row, TableGroup, TableNode};
pub use tabify::{RawRow, ResponseColumn, TabifiedResponse};
pub use template::Template;
pub use value_key::{compare_values, ValueKey};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_over_tabified_rows() {
        let response: TabifiedResponse = serde_json::from_str(
            r#"{
                "columns": [
                    {"id": "c0", "name": "host", "aggregationKind": "bucket"},
                    {"id": "c1", "name": "bytes", "aggregationKind": "metric"},
                    {"id": "c2", "name": "hits", "aggregationKind": "metric"}
                ],
                "rows": [["a", 100, 4], ["b", 30, 0]],
                "totalHits": 4
            }"#,
        )
        .unwrap();
        let table = response.to_table();
        let formula = compile("col2 == 0 ? null : col1 / col2", &SplitColContext::default()).unwrap();

        let results: Vec<CellValue> = table
            .rows
            .iter()
            .map(|row| {
                let values: Vec<CellValue> = row.values().cloned().collect();
                formula
                    .evaluate(&EvalContext::new(&values, response.total_hits as f64))
                    .unwrap()
            })
            .collect();

        assert_eq!(results, vec![CellValue::Number(25.0), CellValue::Null]);
    }

    #[test]
    fn cells_stringify_through_the_column_formatter() {
        let mut column = Column::new("c1", "bytes", ColumnKind::Metric);
        column.format = FieldFormat::Number {
            pattern: Some("0,0.00".into()),
        };
        let cell = Cell::new(CellValue::Number(1234.5), "c1");
        let cache = FormatterCache::new();

        let once = cache.cell_to_string(&cell, &column, ContentType::Text);
        let twice = cache.cell_to_string(&cell, &column, ContentType::Text);
        assert_eq!(once, "1,234.50");
        assert_eq!(once, twice);
        assert_eq!(cache.len(), 1);
    }
}
