//! FILENAME: core/pivot-engine/src/reference.rs
//! Backfill cells for computed columns in missing split combinations.
//!
//! When a column-wise split leaves a (row group, split value) pair without a
//! source row, metric cells are filled with zero. Computed cells cannot just
//! be zero: their formula may turn zeros into anything. They are instead
//! derived from a reference row:
//! 1. Start from `ref_row_with_hidden_cols` if the leaf has one (formulas may
//!    reference hidden columns), else from the first data row
//! 2. Zero every metric cell
//! 3. Re-evaluate every computed column in declared order, so computed
//!    columns that read earlier computed columns see re-derived values

use engine::{
    logical_order, logical_values, Cell, CellValue, Column, EvalContext, FormatterCache, LeafTable,
    RowTable,
};
use log::warn;
use rustc_hash::FxHashMap;

/// Backfill cells keyed by computed column id.
#[derive(Debug, Clone, Default)]
pub struct ReferenceRow {
    cells: FxHashMap<String, Cell>,
}

impl ReferenceRow {
    /// Derives backfill cells for every computed column of `leaf`.
    pub fn derive(leaf: &LeafTable, total_hits: f64, formatters: &FormatterCache) -> Self {
        let (columns, cells): (&[Column], &[Cell]) = match &leaf.ref_row_with_hidden_cols {
            Some(reference) => (&reference.columns, &reference.cells),
            None => match leaf.rows.first() {
                Some(row) => (&leaf.columns, &row.cells),
                None => return ReferenceRow::default(),
            },
        };

        let order = logical_order(columns);
        let mut values = logical_values(&order, cells);
        for (position, &physical) in order.iter().enumerate() {
            if columns[physical].is_metric() {
                values[position] = CellValue::Number(0.0);
            }
        }

        // The leaf's rows laid out like the reference; hidden columns read as null
        let names: Vec<String> = order.iter().map(|&p| columns[p].title.clone()).collect();
        let slots: Vec<Option<usize>> = order
            .iter()
            .map(|&p| leaf.column_index(&columns[p].id))
            .collect();
        let rows: Vec<Vec<CellValue>> = leaf
            .rows
            .iter()
            .map(|row| {
                slots
                    .iter()
                    .map(|slot| {
                        slot.and_then(|i| row.cells.get(i))
                            .map_or(CellValue::Null, |c| c.value.clone())
                    })
                    .collect()
            })
            .collect();
        let table = RowTable {
            names: &names,
            rows: &rows,
        };

        let mut derived = FxHashMap::default();
        for (position, &physical) in order.iter().enumerate() {
            let column = &columns[physical];
            let Some(computed) = &column.computed else {
                continue;
            };

            let ctx = EvalContext::new(&values, total_hits).with_table(table);
            let value = match &computed.formula {
                Some(formula) => match formula.evaluate(&ctx) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            target: "PIVOT",
                            "reference value for '{}' failed: {}",
                            column.title,
                            e
                        );
                        CellValue::Null
                    }
                },
                None => CellValue::Null,
            };
            values[position] = value.clone();

            let mut cell = Cell::new(value.clone(), column.id.clone());
            if let Some(template) = &computed.template {
                let formatted = formatters.format_value(&value, column);
                cell.rendered = Some(template.render(&values, &value, &formatted));
            }
            derived.insert(column.id.clone(), cell);
        }

        ReferenceRow { cells: derived }
    }

    /// The backfill cell for a computed column, if it has one.
    pub fn cell(&self, column_id: &str) -> Option<&Cell> {
        self.cells.get(column_id)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
