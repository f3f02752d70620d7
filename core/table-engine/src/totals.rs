//! FILENAME: core/table-engine/src/totals.rs
//! Column totals.
//!
//! Totals are accumulated per column with `TotalAccumulator`, so a full
//! export can merge accumulators page by page and finalize once. Finalizing:
//! 1. Every column gets `function` applied to its accumulator
//! 2. Computed columns flagged `compute_total_using_formula` re-run their
//!    formula over the totals row instead (split-generated copies excepted),
//!    in declared order so later formulas see earlier formula totals.
//!    Hidden columns read as null in the totals row
//! 3. Each total is formatted, through the column template when
//!    `apply_template_on_total` is set

use engine::{
    logical_order, CellValue, Column, EvalContext, FormatterCache, LeafTable, TotalAccumulator,
    TotalFunction,
};

use crate::computed::ErrorLog;

/// One accumulator per physical column of `leaf`.
pub fn column_accumulators(leaf: &LeafTable) -> Vec<TotalAccumulator> {
    let mut accumulators = vec![TotalAccumulator::new(); leaf.columns.len()];
    for row in &leaf.rows {
        for (acc, cell) in accumulators.iter_mut().zip(&row.cells) {
            acc.add(&cell.value);
        }
    }
    accumulators
}

/// Sets `total` and `formatted_total` on every column.
pub fn finalize_totals(
    columns: &mut [Column],
    accumulators: &[TotalAccumulator],
    function: TotalFunction,
    total_hits: f64,
    formatters: &FormatterCache,
    errors: &mut ErrorLog,
) {
    for (column, acc) in columns.iter_mut().zip(accumulators) {
        column.total = Some(acc.compute(function));
    }

    // Indexed by declared index; hidden columns leave null gaps
    let width = columns.iter().map(|c| c.declared_index + 1).max().unwrap_or(0);
    let mut totals_row = vec![CellValue::Null; width];
    for column in columns.iter() {
        totals_row[column.declared_index] = column.total.clone().unwrap_or_default();
    }

    for physical in logical_order(columns) {
        let column = &columns[physical];
        let logical = column.declared_index;
        let Some(computed) = column.computed.as_ref() else {
            continue;
        };
        if !computed.compute_total_using_formula || column.is_split_generated() {
            continue;
        }
        let Some(formula) = computed.formula.as_ref() else {
            continue;
        };

        let ctx = EvalContext::new(&totals_row, total_hits);
        let total = formula.evaluate(&ctx).unwrap_or_else(|e| {
            errors.record(Some(computed.spec_index), &column.title, e);
            CellValue::Null
        });
        totals_row[logical] = total.clone();
        columns[physical].total = Some(total);
    }

    for column in columns.iter_mut() {
        let total = column.total.clone().unwrap_or_default();
        let formatted = formatters.format_value(&total, column);
        column.formatted_total = Some(match column.computed.as_ref() {
            Some(computed) if computed.apply_template_on_total => match &computed.template {
                Some(template) => template.render(&totals_row, &total, &formatted),
                None => formatted,
            },
            _ => formatted,
        });
    }
}

/// Computes totals over the rows of one leaf.
pub fn compute_totals(
    leaf: &mut LeafTable,
    function: TotalFunction,
    total_hits: f64,
    formatters: &FormatterCache,
    errors: &mut ErrorLog,
) {
    let accumulators = column_accumulators(leaf);
    finalize_totals(&mut leaf.columns, &accumulators, function, total_hits, formatters, errors);
}
