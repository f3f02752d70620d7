//! FILENAME: core/engine/src/table.rs
//! PURPOSE: The recursive table structure flowing through the pipeline.
//! CONTEXT: A table is either a leaf (columns + rows) or a group of child
//! tables produced by a row-wise split. All recursive transforms
//! pattern-match on `TableNode` instead of probing for fields.
//!
//! INVARIANT: in every leaf, each row has exactly one cell per column.

use serde::Serialize;

use crate::cell::{Cell, CellValue};
use crate::column::{logical_order, Column};

/// One row of a leaf table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Sort cursor of the source hit, used for search-after pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<serde_json::Value>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells, sort: None }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Non-positional lookup by column id.
    pub fn cell_by_column_id(&self, column_id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.column_id == column_id)
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.cells.iter().map(|c| &c.value)
    }
}

/// A snapshot of the first row taken before hidden columns are removed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefRow {
    #[serde(skip)]
    pub columns: Vec<Column>,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_label: Option<String>,
    #[serde(skip)]
    pub ref_row_with_hidden_cols: Option<RefRow>,
}

impl LeafTable {
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        LeafTable {
            title: None,
            columns,
            rows,
            total_label: None,
            ref_row_with_hidden_cols: None,
        }
    }

    /// Checks the row-width invariant.
    pub fn is_rectangular(&self) -> bool {
        let width = self.columns.len();
        self.rows.iter().all(|r| r.len() == width)
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    /// Every row's values in logical (declared) order, as formulas see them.
    pub fn logical_rows(&self) -> Vec<Vec<CellValue>> {
        let order = logical_order(&self.columns);
        self.rows
            .iter()
            .map(|row| logical_values(&order, &row.cells))
            .collect()
    }

    /// Column titles in logical order.
    pub fn logical_titles(&self) -> Vec<String> {
        logical_order(&self.columns)
            .into_iter()
            .map(|i| self.columns[i].title.clone())
            .collect()
    }
}

/// Picks `cells` in `order`; missing positions read as null.
pub fn logical_values(order: &[usize], cells: &[Cell]) -> Vec<CellValue> {
    order
        .iter()
        .map(|&i| cells.get(i).map(|c| c.value.clone()).unwrap_or_default())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableGroup {
    pub title: String,
    pub key: CellValue,
    pub tables: Vec<TableNode>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TableNode {
    Leaf(LeafTable),
    Group(TableGroup),
}

impl TableNode {
    /// Every leaf, depth first.
    pub fn leaves(&self) -> Vec<&LeafTable> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a LeafTable>) {
        match self {
            TableNode::Leaf(leaf) => out.push(leaf),
            TableNode::Group(group) => {
                for table in &group.tables {
                    table.collect_leaves(out);
                }
            }
        }
    }

    /// Applies `f` to every leaf, depth first.
    pub fn for_each_leaf_mut(&mut self, f: &mut impl FnMut(&mut LeafTable)) {
        match self {
            TableNode::Leaf(leaf) => f(leaf),
            TableNode::Group(group) => {
                for table in &mut group.tables {
                    table.for_each_leaf_mut(f);
                }
            }
        }
    }

    /// Fallible variant of `for_each_leaf_mut`; stops at the first error.
    pub fn try_for_each_leaf_mut<E>(
        &mut self,
        f: &mut impl FnMut(&mut LeafTable) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            TableNode::Leaf(leaf) => f(leaf),
            TableNode::Group(group) => {
                for table in &mut group.tables {
                    table.try_for_each_leaf_mut(f)?;
                }
                Ok(())
            }
        }
    }

    pub fn first_leaf(&self) -> Option<&LeafTable> {
        match self {
            TableNode::Leaf(leaf) => Some(leaf),
            TableNode::Group(group) => group.tables.iter().find_map(TableNode::first_leaf),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            TableNode::Leaf(leaf) => leaf.rows.len(),
            TableNode::Group(group) => group.tables.iter().map(TableNode::row_count).sum(),
        }
    }

    pub fn has_rows(&self) -> bool {
        match self {
            TableNode::Leaf(leaf) => !leaf.rows.is_empty(),
            TableNode::Group(group) => group.tables.iter().any(TableNode::has_rows),
        }
    }

    /// Drops leaves without rows and groups left without children.
    /// Returns false when nothing survives.
    pub fn prune_empty(&mut self) -> bool {
        match self {
            TableNode::Leaf(leaf) => !leaf.rows.is_empty(),
            TableNode::Group(group) => {
                group.tables.retain_mut(TableNode::prune_empty);
                !group.tables.is_empty()
            }
        }
    }

    /// Row-width invariant across all leaves.
    pub fn is_rectangular(&self) -> bool {
        self.leaves().iter().all(|leaf| leaf.is_rectangular())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnKind;

    fn leaf(rows: usize) -> TableNode {
        let columns = vec![Column::new("0", "a", ColumnKind::Bucket)];
        let rows = (0..rows)
            .map(|i| Row::new(vec![Cell::new(CellValue::Number(i as f64), "0")]))
            .collect();
        TableNode::Leaf(LeafTable::new(columns, rows))
    }

    #[test]
    fn prune_drops_empty_children() {
        let mut root = TableNode::Group(TableGroup {
            title: String::new(),
            key: CellValue::Null,
            tables: vec![
                leaf(0),
                TableNode::Group(TableGroup {
                    title: "inner".into(),
                    key: CellValue::Null,
                    tables: vec![leaf(0)],
                }),
                leaf(2),
            ],
        });

        assert!(root.prune_empty());
        assert_eq!(root.leaves().len(), 1);
        assert_eq!(root.row_count(), 2);
    }

    #[test]
    fn prune_reports_fully_empty_tree() {
        let mut root = TableNode::Group(TableGroup {
            title: String::new(),
            key: CellValue::Null,
            tables: vec![leaf(0)],
        });
        assert!(!root.prune_empty());
        assert!(!root.has_rows());
    }

    #[test]
    fn row_lookup_by_column_id() {
        let row = Row::new(vec![
            Cell::new(CellValue::Text("x".into()), "a"),
            Cell::new(CellValue::Number(1.0), "b"),
        ]);
        assert_eq!(
            row.cell_by_column_id("b").map(|c| &c.value),
            Some(&CellValue::Number(1.0))
        );
        assert!(row.cell_by_column_id("z").is_none());
    }
}
