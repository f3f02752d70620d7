//! FILENAME: core/table-engine/src/hidden.rs
//! Hidden columns.
//!
//! The hidden list is a comma-separated mix of column indices (declared
//! order, as in `colN`) and column labels. Indices go through the
//! split-cols shift before being mapped to physical positions; labels
//! match column titles directly.

use engine::{logical_order, split_cols_index, LeafTable, RefRow, SplitColContext};
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HiddenColumn {
    Index(usize),
    Label(String),
}

/// Parses `"1,3"`, `"host, 2"` and similar lists. Blank entries are ignored.
pub fn parse_hidden_columns(text: &str) -> Vec<HiddenColumn> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.parse::<usize>() {
            Ok(index) => HiddenColumn::Index(index),
            Err(_) => HiddenColumn::Label(entry.to_string()),
        })
        .collect()
}

/// Physical positions of the hidden columns in `leaf`, ascending.
pub fn hidden_positions(
    leaf: &LeafTable,
    hidden: &[HiddenColumn],
    context: &SplitColContext,
) -> Vec<usize> {
    let order = logical_order(&leaf.columns);
    let mut positions: Vec<usize> = hidden
        .iter()
        .filter_map(|entry| match entry {
            HiddenColumn::Index(index) => order.get(context.real_index(*index)).copied(),
            HiddenColumn::Label(label) => leaf.columns.iter().position(|c| &c.title == label),
        })
        .collect();
    positions.sort_unstable();
    positions.dedup();
    positions
}

/// Removes hidden columns from `leaf`.
///
/// When the leaf still carries a split-cols bucket, its first row is
/// snapshotted (with every column) before removal so that split-cols
/// backfilling can recompute hidden inputs later.
pub fn remove_hidden_columns(leaf: &mut LeafTable, hidden: &[HiddenColumn], context: &SplitColContext) {
    if hidden.is_empty() {
        return;
    }

    if split_cols_index(&leaf.columns).is_some() {
        if let Some(first) = leaf.rows.first() {
            leaf.ref_row_with_hidden_cols = Some(RefRow {
                columns: leaf.columns.clone(),
                cells: first.cells.clone(),
            });
        }
    }

    let positions = hidden_positions(leaf, hidden, context);
    if positions.is_empty() {
        return;
    }
    debug!(target: "PIPELINE", "hiding columns at {:?}", positions);

    for &position in positions.iter().rev() {
        leaf.columns.remove(position);
        for row in &mut leaf.rows {
            if position < row.cells.len() {
                row.cells.remove(position);
            }
        }
    }
}
