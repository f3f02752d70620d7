//! FILENAME: core/table-engine/src/pipeline.rs
//! Table Pipeline - The column pipeline that turns a response into a display table.
//!
//! This module takes `VisParams` (configuration) and a `TabifiedResponse`
//! (data) and produces a `DisplayTable`. The steps always run in this order:
//! 1. A split-cols bucket that is not the last bucket halts the cycle
//! 2. Zero hits short-circuit to the empty state
//! 3. Split-cols without per-split computed columns: split now
//! 4. Computed columns, in declared order
//! 5. Line filter; sub-tables left without rows are dropped
//! 6. Hidden columns
//! 7. Split-cols with per-split computed columns: split now
//! 8. Totals, and the total label on every leaf
//! 9. Highlighting flag for the filter bar
//!
//! Formula failures never halt the cycle: they are collected per column.

use std::rc::Rc;

use engine::{
    split_cols_index, BucketSchema, FormatterCache, SplitColContext, TabifiedResponse, TableNode,
};
use log::{debug, info};
use pivot_engine::{split_cols, split_table};

use crate::computed::{add_computed_columns, apply_line_filter, ErrorLog, FormulaCache};
use crate::definition::VisParams;
use crate::error::{ColumnFormulaError, ConfigurationError};
use crate::hidden::{parse_hidden_columns, remove_hidden_columns};
use crate::totals::compute_totals;
use crate::view::DisplayTable;

/// Output of steps 1 to 8 for one response.
#[derive(Debug, Clone)]
pub struct ProcessedTable {
    /// None when there are no hits.
    pub table: Option<TableNode>,
    pub total_hits: u64,
    pub errors: Vec<ColumnFormulaError>,
}

/// Checks that the split-cols bucket, if any, is the last bucket.
pub fn validate_buckets(response: &TabifiedResponse) -> Result<(), ConfigurationError> {
    let schemas: Vec<BucketSchema> = response
        .table_columns()
        .iter()
        .filter(|c| c.is_bucket())
        .filter_map(|c| c.schema)
        .collect();
    match schemas.iter().position(|s| *s == BucketSchema::SplitCols) {
        Some(position) if position + 1 != schemas.len() => Err(ConfigurationError::SplitColsNotLast),
        _ => Ok(()),
    }
}

pub struct TablePipeline<'a> {
    params: &'a VisParams,
    cache: &'a mut FormulaCache,
}

impl<'a> TablePipeline<'a> {
    pub fn new(params: &'a VisParams, cache: &'a mut FormulaCache) -> Self {
        TablePipeline { params, cache }
    }

    /// Runs the whole cycle and builds the display table.
    pub fn run(&mut self, response: &TabifiedResponse) -> Result<DisplayTable, ConfigurationError> {
        let formatters = Rc::new(FormatterCache::new());
        let with_totals = self.params.show_total || self.params.csv_export_with_total;
        let processed = self.process(response, &formatters, with_totals)?;

        let Some(table) = processed.table else {
            return Ok(DisplayTable::empty(processed.total_hits));
        };

        let mut display = DisplayTable::empty(processed.total_hits);
        display.table = Some(table);
        display.formula_errors = processed.errors;
        display.show_total = self.params.show_total;
        display.formatters = formatters;
        // Step 9
        display.highlight_results = self.params.highlight_enabled();
        display.update_hints(self.params.per_page);

        info!(
            target: "PIPELINE",
            "rendered {} rows in {} tables ({} formula errors)",
            display.table.as_ref().map_or(0, TableNode::row_count),
            display.table.as_ref().map_or(0, |t| t.leaves().len()),
            display.formula_errors.len()
        );
        Ok(display)
    }

    /// Steps 1 to 8. `with_totals` computes per-leaf totals; the exporter
    /// turns it off and accumulates totals across pages itself.
    pub fn process(
        &mut self,
        response: &TabifiedResponse,
        formatters: &FormatterCache,
        with_totals: bool,
    ) -> Result<ProcessedTable, ConfigurationError> {
        let params = self.params;

        // Step 1
        validate_buckets(response)?;

        // Step 2
        if response.total_hits == 0 {
            debug!(target: "PIPELINE", "no hits, empty state");
            return Ok(ProcessedTable {
                table: None,
                total_hits: 0,
                errors: Vec::new(),
            });
        }
        let total_hits = response.total_hits as f64;

        let mut node = split_table(
            TableNode::Leaf(response.to_table()),
            response.metrics_at_all_levels,
            formatters,
        );
        let has_split_cols = node
            .first_leaf()
            .is_some_and(|leaf| split_cols_index(&leaf.columns).is_some());

        // Step 3
        if has_split_cols && !params.computed_cols_per_split_col {
            split_cols(&mut node, formatters, total_hits);
        }

        // Step 4
        let split_index = node.first_leaf().and_then(|leaf| split_cols_index(&leaf.columns));
        let context = SplitColContext::new(split_index, params.computed_cols_per_split_col);
        let compiled = self.cache.get_or_compile(params, context);
        let mut errors = ErrorLog::default();
        errors.extend(&compiled.errors);

        node.for_each_leaf_mut(&mut |leaf| {
            add_computed_columns(leaf, &compiled, total_hits, formatters, &mut errors);
        });

        // Step 5
        if let Some(filter) = &compiled.line_filter {
            node.for_each_leaf_mut(&mut |leaf| apply_line_filter(leaf, filter, total_hits, &mut errors));
            node.prune_empty();
        }

        // Step 6
        let hidden = parse_hidden_columns(&params.hidden_columns);
        node.for_each_leaf_mut(&mut |leaf| remove_hidden_columns(leaf, &hidden, &context));

        // Step 7
        if has_split_cols && params.computed_cols_per_split_col {
            split_cols(&mut node, formatters, total_hits);
        }

        // Step 8
        if with_totals {
            node.for_each_leaf_mut(&mut |leaf| {
                compute_totals(leaf, params.total_func, total_hits, formatters, &mut errors);
            });
        }
        let label = params.total_label.trim();
        if params.show_total && !label.is_empty() {
            node.for_each_leaf_mut(&mut |leaf| leaf.total_label = Some(label.to_string()));
        }

        Ok(ProcessedTable {
            table: Some(node),
            total_hits: response.total_hits,
            errors: errors.into_errors(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ComputedColumnSpec;
    use engine::CellValue;
    use pretty_assertions::assert_eq;

    fn response(json: &str) -> TabifiedResponse {
        serde_json::from_str(json).unwrap()
    }

    fn split_cols_response() -> TabifiedResponse {
        response(
            r#"{
                "columns": [
                    {"id": "h", "name": "host", "aggregationKind": "bucket"},
                    {"id": "o", "name": "os", "aggregationKind": "bucket", "schema": "splitcols"},
                    {"id": "m", "name": "Count", "aggregationKind": "metric"}
                ],
                "rows": [["a", "linux", 1], ["a", "mac", 2], ["b", "linux", 3]],
                "totalHits": 6
            }"#,
        )
    }

    fn run(params: &VisParams, response: &TabifiedResponse) -> DisplayTable {
        let mut cache = FormulaCache::new();
        TablePipeline::new(params, &mut cache).run(response).unwrap()
    }

    #[test]
    fn split_cols_must_be_the_last_bucket() {
        let bad = response(
            r#"{
                "columns": [
                    {"id": "o", "name": "os", "aggregationKind": "bucket", "schema": "splitcols"},
                    {"id": "h", "name": "host", "aggregationKind": "bucket"},
                    {"id": "m", "name": "Count", "aggregationKind": "metric"}
                ],
                "rows": [],
                "totalHits": 1
            }"#,
        );
        let mut cache = FormulaCache::new();
        let result = TablePipeline::new(&VisParams::default(), &mut cache).run(&bad);
        assert_eq!(result.unwrap_err(), ConfigurationError::SplitColsNotLast);
        assert_eq!(validate_buckets(&split_cols_response()), Ok(()));
    }

    #[test]
    fn zero_hits_is_the_empty_state() {
        let empty = response(r#"{"columns": [], "rows": [], "totalHits": 0}"#);
        let display = run(&VisParams::default(), &empty);
        assert!(display.is_empty_state());
        assert!(!display.has_some_rows());
    }

    #[test]
    fn computed_columns_see_generated_columns_when_split_first() {
        let mut params = VisParams::default();
        params.computed_columns = vec![ComputedColumnSpec::new("sum", "col1 + col2")];
        let display = run(&params, &split_cols_response());

        let table = display.table.unwrap();
        let leaf = table.first_leaf().unwrap();
        let titles: Vec<&str> = leaf.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["host", "linux", "mac", "sum"]);
        assert_eq!(leaf.rows[0].cells[3].value, CellValue::Number(3.0));
        assert_eq!(leaf.rows[1].cells[3].value, CellValue::Number(3.0));
    }

    #[test]
    fn per_split_computed_columns_are_repeated_per_value() {
        let mut params = VisParams::default();
        params.computed_cols_per_split_col = true;
        // col1 is the first column after the split bucket: Count
        params.computed_columns = vec![ComputedColumnSpec::new("double", "col1 * 2")];
        let display = run(&params, &split_cols_response());

        let table = display.table.unwrap();
        let leaf = table.first_leaf().unwrap();
        let titles: Vec<&str> = leaf.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["host", "linux - Count", "linux - double", "mac - Count", "mac - double"]
        );
        let row_b: Vec<CellValue> = leaf.rows[1].values().cloned().collect();
        assert_eq!(
            row_b,
            vec![
                CellValue::from("b"),
                CellValue::Number(3.0),
                CellValue::Number(6.0),
                CellValue::Number(0.0),
                CellValue::Number(0.0)
            ]
        );
    }

    #[test]
    fn line_filter_drops_rows_and_empty_split_tables() {
        let mut params = VisParams::default();
        params.lines_computed_filter = "col1 > 2".into();
        let split = response(
            r#"{
                "columns": [
                    {"id": "r", "name": "region", "aggregationKind": "bucket", "schema": "split"},
                    {"id": "h", "name": "host", "aggregationKind": "bucket"},
                    {"id": "m", "name": "Count", "aggregationKind": "metric"}
                ],
                "rows": [["EU", "a", 1], ["US", "b", 3], ["US", "c", 5]],
                "totalHits": 9
            }"#,
        );
        let display = run(&params, &split);
        let table = display.table.unwrap();
        let leaves = table.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].rows.len(), 2);
    }

    #[test]
    fn totals_and_label_are_attached() {
        let mut params = VisParams::default();
        params.show_total = true;
        params.total_label = "Total".into();
        let display = run(&params, &split_cols_response());
        let table = display.table.unwrap();
        let leaf = table.first_leaf().unwrap();
        assert_eq!(leaf.total_label.as_deref(), Some("Total"));
        assert_eq!(leaf.columns[1].total, Some(CellValue::Number(4.0)));
    }

    #[test]
    fn formula_errors_do_not_halt_the_cycle() {
        let mut params = VisParams::default();
        params.computed_columns = vec![
            ComputedColumnSpec::new("broken", "col1 +"),
            ComputedColumnSpec::new("fine", "col1"),
        ];
        let display = run(&params, &split_cols_response());
        assert_eq!(display.formula_errors.len(), 1);
        assert_eq!(display.formula_errors[0].spec_index, Some(0));
        assert!(display.has_some_rows());
    }
}
