//! FILENAME: core/table-engine/src/computed.rs
//! Computed columns and the line filter.
//!
//! Formulas are compiled once per configuration (and split-cols layout) into
//! `CompiledColumns`, which `FormulaCache` keeps across refresh cycles and
//! export pages. Applying them to a leaf:
//! 1. Each computed column, in declared order, is evaluated against every
//!    row (logical order) with the whole leaf available to `rowval`
//! 2. The new column is appended, or spliced at its custom position;
//!    columns sharing a custom position keep their declared order
//! 3. Evaluation failures produce a null cell and one error per column

use std::sync::Arc;

use engine::{
    compile, Cell, CellValue, Column, ColumnKind, CompiledFormula, ComputedColumn, EvalContext,
    FormatterCache, FormulaError, LeafTable, RowTable, SplitColContext, Template,
};
use log::{debug, warn};
use rustc_hash::FxHashMap;

use crate::definition::{ComputedColumnSpec, VisParams};
use crate::error::ColumnFormulaError;

/// Label used to attribute line filter errors.
pub const LINE_FILTER_LABEL: &str = "Lines computed filter";

// ============================================================================
// COMPILATION
// ============================================================================

/// A computed column ready to be added to leaf tables.
#[derive(Debug, Clone)]
pub struct CompiledColumn {
    pub spec_index: usize,
    /// Column template; the declared index is assigned per leaf.
    pub column: Column,
    pub custom_position: Option<usize>,
}

impl CompiledColumn {
    pub fn computed(&self) -> Option<&Arc<ComputedColumn>> {
        self.column.computed.as_ref()
    }
}

/// Everything compiled from one set of parameters.
#[derive(Debug, Clone)]
pub struct CompiledColumns {
    pub context: SplitColContext,
    pub columns: Vec<CompiledColumn>,
    pub line_filter: Option<CompiledFormula>,
    /// Compile-time failures, one per offending formula.
    pub errors: Vec<ColumnFormulaError>,
}

fn compile_attributed(
    text: &str,
    context: &SplitColContext,
    spec_index: Option<usize>,
    label: &str,
    errors: &mut Vec<ColumnFormulaError>,
) -> Option<CompiledFormula> {
    match compile(text, context) {
        Ok(formula) => Some(formula),
        Err(error) => {
            warn!(target: "FORMULA", "'{}' failed to compile: {}", label, error);
            errors.push(ColumnFormulaError {
                spec_index,
                source_label: label.to_string(),
                error,
            });
            None
        }
    }
}

fn compile_column(
    spec_index: usize,
    spec: &ComputedColumnSpec,
    context: &SplitColContext,
    errors: &mut Vec<ColumnFormulaError>,
) -> CompiledColumn {
    let formula = compile_attributed(&spec.formula, context, Some(spec_index), &spec.label, errors);

    let template = if spec.apply_template && !spec.template.trim().is_empty() {
        Some(Template::compile(&spec.template, context))
    } else {
        None
    };

    let css_formula = if spec.cell_computed_css.trim().is_empty() {
        None
    } else {
        compile_attributed(&spec.cell_computed_css, context, Some(spec_index), &spec.label, errors)
    };

    let mut column = Column::new(
        format!("computed-col-{}", spec_index),
        spec.label.clone(),
        ColumnKind::Computed,
    );
    column.format = spec.field_format();
    column.alignment = Some(spec.alignment);
    column.computed = Some(Arc::new(ComputedColumn {
        spec_index,
        formula,
        template,
        css_formula,
        compute_total_using_formula: spec.compute_total_using_formula,
        apply_template_on_total: spec.apply_template_on_total,
        apply_alignment_on_title: spec.apply_alignment_on_title,
        apply_alignment_on_total: spec.apply_alignment_on_total,
    }));

    CompiledColumn {
        spec_index,
        column,
        custom_position: spec.custom_column_position,
    }
}

/// Compiles every enabled computed column and the line filter.
pub fn compile_columns(params: &VisParams, context: SplitColContext) -> CompiledColumns {
    let mut errors = Vec::new();
    let columns = params
        .enabled_computed_columns()
        .map(|(index, spec)| compile_column(index, spec, &context, &mut errors))
        .collect();

    let line_filter = if params.lines_computed_filter.trim().is_empty() {
        None
    } else {
        compile_attributed(
            &params.lines_computed_filter,
            &context,
            None,
            LINE_FILTER_LABEL,
            &mut errors,
        )
    };

    CompiledColumns {
        context,
        columns,
        line_filter,
        errors,
    }
}

/// Keeps compiled formulas until the configuration or the layout changes.
#[derive(Debug, Default)]
pub struct FormulaCache {
    key: Option<(SplitColContext, Vec<ComputedColumnSpec>, String)>,
    compiled: Option<Arc<CompiledColumns>>,
}

impl FormulaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&mut self, params: &VisParams, context: SplitColContext) -> Arc<CompiledColumns> {
        let key = (
            context,
            params.computed_columns.clone(),
            params.lines_computed_filter.clone(),
        );
        if let (Some(existing_key), Some(compiled)) = (&self.key, &self.compiled) {
            if *existing_key == key {
                return Arc::clone(compiled);
            }
        }

        debug!(target: "FORMULA", "compiling {} computed columns", params.computed_columns.len());
        let compiled = Arc::new(compile_columns(params, context));
        self.key = Some(key);
        self.compiled = Some(Arc::clone(&compiled));
        compiled
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.compiled = None;
    }
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Runtime formula errors, keeping the first one per source.
#[derive(Debug, Default)]
pub struct ErrorLog {
    errors: Vec<ColumnFormulaError>,
}

impl ErrorLog {
    pub fn record(&mut self, spec_index: Option<usize>, label: &str, error: FormulaError) {
        if self.errors.iter().any(|e| e.spec_index == spec_index) {
            return;
        }
        warn!(target: "FORMULA", "'{}' failed: {}", label, error);
        self.errors.push(ColumnFormulaError {
            spec_index,
            source_label: label.to_string(),
            error,
        });
    }

    pub fn extend(&mut self, errors: &[ColumnFormulaError]) {
        for e in errors {
            self.record(e.spec_index, &e.source_label, e.error.clone());
        }
    }

    pub fn into_errors(self) -> Vec<ColumnFormulaError> {
        self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Adds every compiled computed column to `leaf`.
pub fn add_computed_columns(
    leaf: &mut LeafTable,
    compiled: &CompiledColumns,
    total_hits: f64,
    formatters: &FormatterCache,
    errors: &mut ErrorLog,
) {
    let mut placed: FxHashMap<usize, usize> = FxHashMap::default();
    for spec in &compiled.columns {
        add_computed_column(leaf, spec, total_hits, formatters, errors, &mut placed);
    }
}

fn add_computed_column(
    leaf: &mut LeafTable,
    spec: &CompiledColumn,
    total_hits: f64,
    formatters: &FormatterCache,
    errors: &mut ErrorLog,
    placed: &mut FxHashMap<usize, usize>,
) {
    let Some(computed) = spec.computed() else {
        return;
    };
    let column = spec.column.clone().with_declared_index(leaf.columns.len());

    let names = leaf.logical_titles();
    let rows = leaf.logical_rows();
    let table = RowTable {
        names: &names,
        rows: &rows,
    };

    let cells: Vec<Cell> = rows
        .iter()
        .zip(&leaf.rows)
        .map(|(values, row)| {
            let ctx = EvalContext::new(values, total_hits).with_table(table);
            let value = match &computed.formula {
                Some(formula) => formula.evaluate(&ctx).unwrap_or_else(|e| {
                    errors.record(Some(spec.spec_index), &column.title, e);
                    CellValue::Null
                }),
                None => CellValue::Null,
            };

            let mut cell = Cell::new(value, column.id.clone());
            if let Some(path) = row.cells.last().map(|c| Arc::clone(&c.filter_path)) {
                cell = cell.with_filter_path(path);
            }
            if let Some(template) = &computed.template {
                let formatted = formatters.format_value(&cell.value, &column);
                cell.rendered = Some(template.render(values, &cell.value, &formatted));
            }
            if let Some(css) = &computed.css_formula {
                match css.evaluate(&ctx) {
                    Ok(CellValue::Null) => {}
                    Ok(value) => cell.css = Some(value.as_text()),
                    Err(e) => errors.record(Some(spec.spec_index), &column.title, e),
                }
            }
            cell
        })
        .collect();

    let position = match spec.custom_position {
        Some(requested) if requested <= leaf.columns.len() => {
            let ties = placed.entry(requested).or_insert(0);
            let position = (requested + *ties).min(leaf.columns.len());
            *ties += 1;
            position
        }
        _ => leaf.columns.len(),
    };

    leaf.columns.insert(position, column);
    for (row, cell) in leaf.rows.iter_mut().zip(cells) {
        row.cells.insert(position, cell);
    }
}

/// Drops rows where the line filter is falsy or fails.
pub fn apply_line_filter(
    leaf: &mut LeafTable,
    filter: &CompiledFormula,
    total_hits: f64,
    errors: &mut ErrorLog,
) {
    let names = leaf.logical_titles();
    let rows = leaf.logical_rows();
    let table = RowTable {
        names: &names,
        rows: &rows,
    };

    let keep: Vec<bool> = rows
        .iter()
        .map(|values| {
            let ctx = EvalContext::new(values, total_hits).with_table(table);
            match filter.evaluate(&ctx) {
                Ok(value) => value.is_truthy(),
                Err(e) => {
                    errors.record(None, LINE_FILTER_LABEL, e);
                    false
                }
            }
        })
        .collect();

    let mut keep = keep.into_iter();
    leaf.rows.retain(|_| keep.next().unwrap_or(false));
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Row, TabifiedResponse};
    use pretty_assertions::assert_eq;

    fn leaf() -> LeafTable {
        let response: TabifiedResponse = serde_json::from_str(
            r#"{
                "columns": [
                    {"id": "c0", "name": "host", "aggregationKind": "bucket"},
                    {"id": "c1", "name": "bytes", "aggregationKind": "metric"},
                    {"id": "c2", "name": "hits", "aggregationKind": "metric"}
                ],
                "rows": [["a", 100, 4], ["b", 30, 0], ["c", 50, 5]],
                "totalHits": 9
            }"#,
        )
        .unwrap();
        response.to_table()
    }

    fn values(row: &Row) -> Vec<CellValue> {
        row.values().cloned().collect()
    }

    #[test]
    fn computed_cells_are_appended_and_failures_stay_local() {
        let mut params = VisParams::default();
        params.computed_columns = vec![ComputedColumnSpec::new("ratio", "col1 / col2")];
        let compiled = compile_columns(&params, SplitColContext::default());

        let mut table = leaf();
        let mut errors = ErrorLog::default();
        add_computed_columns(&mut table, &compiled, 9.0, &FormatterCache::new(), &mut errors);

        assert!(table.is_rectangular());
        assert_eq!(table.columns[3].title, "ratio");
        assert_eq!(table.columns[3].declared_index, 3);
        assert_eq!(table.rows[0].cells[3].value, CellValue::Number(25.0));
        assert_eq!(table.rows[1].cells[3].value, CellValue::Null);
        assert_eq!(table.rows[2].cells[3].value, CellValue::Number(10.0));

        let errors = errors.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].spec_index, Some(0));
        assert_eq!(errors[0].error, FormulaError::DivisionByZero);
    }

    #[test]
    fn later_columns_see_earlier_computed_columns() {
        let mut params = VisParams::default();
        params.computed_columns = vec![
            ComputedColumnSpec::new("double", "col1 * 2"),
            ComputedColumnSpec::new("plus one", "col3 + 1"),
        ];
        let compiled = compile_columns(&params, SplitColContext::default());
        let mut table = leaf();
        add_computed_columns(&mut table, &compiled, 9.0, &FormatterCache::new(), &mut ErrorLog::default());
        assert_eq!(values(&table.rows[0])[4], CellValue::Number(201.0));
    }

    #[test]
    fn custom_positions_splice_and_keep_declared_order_on_ties() {
        let mut params = VisParams::default();
        params.computed_columns = vec![
            ComputedColumnSpec {
                custom_column_position: Some(1),
                ..ComputedColumnSpec::new("first", "1")
            },
            ComputedColumnSpec {
                custom_column_position: Some(1),
                ..ComputedColumnSpec::new("second", "2")
            },
            ComputedColumnSpec {
                custom_column_position: Some(99),
                ..ComputedColumnSpec::new("invalid", "3")
            },
        ];
        let compiled = compile_columns(&params, SplitColContext::default());
        let mut table = leaf();
        add_computed_columns(&mut table, &compiled, 9.0, &FormatterCache::new(), &mut ErrorLog::default());

        let titles: Vec<&str> = table.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["host", "first", "second", "bytes", "hits", "invalid"]);
        assert_eq!(values(&table.rows[0])[1], CellValue::Number(1.0));
        assert!(table.is_rectangular());
    }

    #[test]
    fn spliced_columns_keep_formula_indices_stable() {
        let mut params = VisParams::default();
        params.computed_columns = vec![
            ComputedColumnSpec {
                custom_column_position: Some(0),
                ..ComputedColumnSpec::new("front", "col1 + 0")
            },
            ComputedColumnSpec::new("again", "col1 + 1"),
        ];
        let compiled = compile_columns(&params, SplitColContext::default());
        let mut table = leaf();
        add_computed_columns(&mut table, &compiled, 9.0, &FormatterCache::new(), &mut ErrorLog::default());
        // col1 is still "bytes" after "front" moved to position 0
        assert_eq!(values(&table.rows[0])[4], CellValue::Number(101.0));
    }

    #[test]
    fn templates_and_css_are_stored_on_cells() {
        let mut params = VisParams::default();
        params.computed_columns = vec![ComputedColumnSpec {
            apply_template: true,
            template: "<b>{{col0}}</b>={{value}}".into(),
            cell_computed_css: "col1 > 60 ? 'color: red' : null".into(),
            ..ComputedColumnSpec::new("tpl", "col1")
        }];
        let compiled = compile_columns(&params, SplitColContext::default());
        let mut table = leaf();
        add_computed_columns(&mut table, &compiled, 9.0, &FormatterCache::new(), &mut ErrorLog::default());

        let cell = &table.rows[0].cells[3];
        assert_eq!(cell.rendered.as_deref(), Some("<b>a</b>=100"));
        assert_eq!(cell.css.as_deref(), Some("color: red"));
        assert_eq!(table.rows[1].cells[3].css, None);
    }

    #[test]
    fn compile_errors_are_attributed_and_yield_null_cells() {
        let mut params = VisParams::default();
        params.computed_columns = vec![ComputedColumnSpec::new("broken", "col1 +")];
        let compiled = compile_columns(&params, SplitColContext::default());
        assert_eq!(compiled.errors.len(), 1);
        assert_eq!(compiled.errors[0].source_label, "broken");

        let mut table = leaf();
        add_computed_columns(&mut table, &compiled, 9.0, &FormatterCache::new(), &mut ErrorLog::default());
        assert!(table.rows.iter().all(|r| r.cells[3].value.is_null()));
    }

    #[test]
    fn line_filter_keeps_truthy_rows() {
        let mut params = VisParams::default();
        params.lines_computed_filter = "col2 > 0 && col1 >= 50".into();
        let compiled = compile_columns(&params, SplitColContext::default());
        let mut table = leaf();
        let filter = compiled.line_filter.as_ref().unwrap();
        apply_line_filter(&mut table, filter, 9.0, &mut ErrorLog::default());
        let hosts: Vec<CellValue> = table.rows.iter().map(|r| r.cells[0].value.clone()).collect();
        assert_eq!(hosts, vec![CellValue::from("a"), CellValue::from("c")]);
    }

    #[test]
    fn cache_reuses_until_parameters_change() {
        let mut params = VisParams::default();
        params.computed_columns = vec![ComputedColumnSpec::new("x", "col0")];
        let mut cache = FormulaCache::new();
        let first = cache.get_or_compile(&params, SplitColContext::default());
        let second = cache.get_or_compile(&params, SplitColContext::default());
        assert!(Arc::ptr_eq(&first, &second));

        params.computed_columns[0].formula = "col1".into();
        let third = cache.get_or_compile(&params, SplitColContext::default());
        assert!(!Arc::ptr_eq(&first, &third));
    }
}
