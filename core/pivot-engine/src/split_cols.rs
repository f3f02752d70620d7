//! FILENAME: core/pivot-engine/src/split_cols.rs
//! Column-wise split: distinct values of the split-cols bucket become columns.
//!
//! The split-cols bucket is always the last bucket, so every column after it
//! is a metric or a computed column. For each leaf:
//! 1. Rows are grouped by the values of all columns before the split column
//!    (first-seen order); each group becomes one output row
//! 2. Every distinct split value (first-seen order) contributes one
//!    generated column per metric, titled `"<value> - <metric>"`, or just
//!    `"<value>"` when there is a single metric
//! 3. Missing (group, value) combinations are backfilled: zero for metrics,
//!    the reference-row value for computed columns

use std::sync::Arc;

use engine::{
    split_cols_index, Cell, CellValue, Column, FilterTerm, FormatterCache, LeafTable, Row,
    TableNode, ValueKey,
};
use log::debug;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::reference::ReferenceRow;

/// Bucket values identifying one output row.
type GroupKey = SmallVec<[ValueKey; 4]>;

struct RowGroup {
    prefix: Vec<Cell>,
    sort: Option<serde_json::Value>,
    /// Metric cells per split value slot.
    by_value: FxHashMap<usize, Vec<Cell>>,
}

/// Splits every leaf of `node` on its split-cols bucket.
pub fn split_cols(node: &mut TableNode, formatters: &FormatterCache, total_hits: f64) {
    node.for_each_leaf_mut(&mut |leaf| split_leaf_cols(leaf, formatters, total_hits));
}

fn split_leaf_cols(leaf: &mut LeafTable, formatters: &FormatterCache, total_hits: f64) {
    let Some(split_index) = split_cols_index(&leaf.columns) else {
        return;
    };

    let split_column = leaf.columns[split_index].clone();
    let metrics: Vec<Column> = leaf.columns[split_index + 1..].to_vec();
    let reference = if metrics.iter().any(Column::is_computed) {
        ReferenceRow::derive(leaf, total_hits, formatters)
    } else {
        ReferenceRow::default()
    };

    let mut value_slots: FxHashMap<ValueKey, usize> = FxHashMap::default();
    let mut split_values: Vec<CellValue> = Vec::new();
    let mut group_slots: FxHashMap<GroupKey, usize> = FxHashMap::default();
    let mut groups: Vec<RowGroup> = Vec::new();

    for row in std::mem::take(&mut leaf.rows) {
        let mut cells = row.cells;
        if cells.len() <= split_index {
            continue;
        }
        let tail = cells.split_off(split_index);
        let mut tail = tail.into_iter();
        let Some(split_cell) = tail.next() else {
            continue;
        };
        let metric_cells: Vec<Cell> = tail.collect();

        let value_slot = *value_slots
            .entry(ValueKey::from(&split_cell.value))
            .or_insert_with(|| {
                split_values.push(split_cell.value.clone());
                split_values.len() - 1
            });

        let key: GroupKey = cells.iter().map(|c| ValueKey::from(&c.value)).collect();
        let group_slot = match group_slots.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push(RowGroup {
                    prefix: cells,
                    sort: row.sort,
                    by_value: FxHashMap::default(),
                });
                group_slots.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[group_slot]
            .by_value
            .entry(value_slot)
            .or_insert(metric_cells);
    }

    let mut columns: Vec<Column> = leaf.columns[..split_index].to_vec();
    for value in &split_values {
        let label = formatters.format_value(value, &split_column);
        for metric in &metrics {
            let mut generated = metric.clone();
            generated.id = generated_id(&metric.id, value);
            generated.title = if metrics.len() == 1 {
                label.clone()
            } else {
                format!("{} - {}", label, metric.title)
            };
            generated.split_value = Some(value.clone());
            generated.split_source_id = Some(metric.id.clone());
            columns.push(generated);
        }
    }

    let rows = groups
        .into_iter()
        .map(|group| {
            let prefix_path: Vec<FilterTerm> = group
                .prefix
                .last()
                .map(|c| c.filter_path().to_vec())
                .unwrap_or_default();
            let mut cells = group.prefix;
            for (slot, value) in split_values.iter().enumerate() {
                match group.by_value.get(&slot) {
                    Some(source) => {
                        for (metric, cell) in metrics.iter().zip(source) {
                            let mut cell = cell.clone();
                            cell.column_id = generated_id(&metric.id, value);
                            cells.push(cell);
                        }
                    }
                    None => {
                        let mut path = prefix_path.clone();
                        path.push(FilterTerm {
                            column_id: split_column.id.clone(),
                            key: value.clone(),
                        });
                        let path: Arc<[FilterTerm]> = Arc::from(path);
                        for metric in &metrics {
                            cells.push(backfill(metric, value, &reference, Arc::clone(&path)));
                        }
                    }
                }
            }
            Row {
                cells,
                sort: group.sort,
            }
        })
        .collect::<Vec<_>>();

    debug!(
        target: "PIVOT",
        "split columns on '{}': {} values, {} rows",
        split_column.title,
        split_values.len(),
        rows.len()
    );

    for (position, column) in columns.iter_mut().enumerate() {
        column.declared_index = position;
    }
    leaf.columns = columns;
    leaf.rows = rows;
}

fn generated_id(metric_id: &str, value: &CellValue) -> String {
    format!("{}::{}", metric_id, value.as_text())
}

fn backfill(
    metric: &Column,
    value: &CellValue,
    reference: &ReferenceRow,
    path: Arc<[FilterTerm]>,
) -> Cell {
    let id = generated_id(&metric.id, value);
    let cell = match reference.cell(&metric.id) {
        Some(cell) if metric.is_computed() => {
            let mut cell = cell.clone();
            cell.column_id = id;
            cell
        }
        _ => Cell::zero(id),
    };
    cell.with_filter_path(path)
}
