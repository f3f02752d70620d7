//! FILENAME: core/engine/src/tabify.rs
//! PURPOSE: Converts a tabified aggregation response into a leaf table.
//! CONTEXT: The data source delivers `{ columns, rows, totalHits }` with rows
//! as arrays of raw values aligned to the columns. This is the entry point
//! of every refresh cycle and of every page fetched during a full export.
//! Each cell gets its filter path here: the chain of bucket values to its
//! left, shared between the cells of a row.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue, FilterTerm};
use crate::column::{BucketSchema, Column, ColumnKind};
use crate::formatter::FieldFormat;
use crate::table::{LeafTable, Row};

/// A column as declared by the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseColumn {
    pub id: String,
    pub name: String,
    /// Bucket role: `bucket`, `split` or `splitcols`. Ignored for metrics.
    #[serde(default)]
    pub schema: Option<String>,
    pub aggregation_kind: ColumnKind,
    #[serde(default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub format: Option<FieldFormat>,
}

/// A row as delivered: a bare array, or values with a sort cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRow {
    Values(Vec<CellValue>),
    WithSort {
        values: Vec<CellValue>,
        #[serde(default)]
        sort: Option<serde_json::Value>,
    },
}

impl RawRow {
    pub fn values(&self) -> &[CellValue] {
        match self {
            RawRow::Values(values) | RawRow::WithSort { values, .. } => values,
        }
    }

    pub fn sort(&self) -> Option<&serde_json::Value> {
        match self {
            RawRow::Values(_) => None,
            RawRow::WithSort { sort, .. } => sort.as_ref(),
        }
    }
}

/// The tabified response of one query (or one page of it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TabifiedResponse {
    pub columns: Vec<ResponseColumn>,
    #[serde(default)]
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub total_hits: u64,
    /// True when metrics are repeated after every bucket level.
    #[serde(default)]
    pub metrics_at_all_levels: bool,
}

fn parse_schema(schema: Option<&str>) -> BucketSchema {
    match schema.map(|s| s.trim().to_lowercase()) {
        Some(s) if s == "split" => BucketSchema::Split,
        Some(s) if s == "splitcols" || s == "split-cols" || s == "split_cols" => {
            BucketSchema::SplitCols
        }
        _ => BucketSchema::Bucket,
    }
}

impl TabifiedResponse {
    /// Builds the column definitions, declared index = source position.
    pub fn table_columns(&self) -> Vec<Column> {
        self.columns
            .iter()
            .enumerate()
            .map(|(index, source)| {
                let kind = match source.aggregation_kind {
                    ColumnKind::Computed => ColumnKind::Metric,
                    other => other,
                };
                let mut column = Column::new(&source.id, &source.name, kind).with_declared_index(index);
                if kind == ColumnKind::Bucket {
                    column.schema = Some(parse_schema(source.schema.as_deref()));
                }
                column.field_type = source.field_type.clone();
                column.format = source.format.clone().unwrap_or_default();
                column
            })
            .collect()
    }

    /// Builds the rows for `columns`. Short rows are padded with nulls and
    /// long rows truncated so every row matches the column count.
    pub fn table_rows(&self, columns: &[Column]) -> Vec<Row> {
        let width = columns.len();
        self.rows
            .iter()
            .enumerate()
            .map(|(row_index, raw)| {
                let values = raw.values();
                if values.len() != width {
                    warn!(
                        target: "TABIFY",
                        "row {} has {} values for {} columns",
                        row_index,
                        values.len(),
                        width
                    );
                }

                let mut path: Vec<FilterTerm> = Vec::new();
                let mut shared: Arc<[FilterTerm]> = Arc::from(Vec::new());
                let cells = columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let value = values.get(i).cloned().unwrap_or_default();
                        if column.is_bucket() {
                            path.push(FilterTerm {
                                column_id: column.id.clone(),
                                key: value.clone(),
                            });
                            shared = Arc::from(path.clone());
                        }
                        Cell::new(value, column.id.clone()).with_filter_path(Arc::clone(&shared))
                    })
                    .collect();

                Row {
                    cells,
                    sort: raw.sort().cloned(),
                }
            })
            .collect()
    }

    /// Converts the whole response into one leaf table.
    pub fn to_table(&self) -> LeafTable {
        let columns = self.table_columns();
        let rows = self.table_rows(&columns);
        LeafTable::new(columns, rows)
    }

    /// Number of bucket and metric columns.
    pub fn bucket_and_metric_counts(&self) -> (usize, usize) {
        self.columns.iter().fold((0, 0), |(b, m), c| match c.aggregation_kind {
            ColumnKind::Bucket => (b + 1, m),
            _ => (b, m + 1),
        })
    }
}
