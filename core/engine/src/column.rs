//! FILENAME: core/engine/src/column.rs
//! PURPOSE: Column definitions for display tables.
//! CONTEXT: A column is a bucket (grouping dimension), a metric (aggregation
//! result) or a computed column (formula over other columns). Computed
//! columns carry their compiled formula and template. Every column keeps the
//! logical index it was declared at, separately from its physical position,
//! so formulas keep resolving after columns are spliced or removed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;
use crate::formatter::FieldFormat;
use crate::formula::CompiledFormula;
use crate::template::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Bucket,
    Metric,
    Computed,
}

/// The role a bucket column plays in the table layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketSchema {
    /// Regular row bucket.
    #[serde(rename = "bucket")]
    Bucket,
    /// Distinct values become sub-tables.
    #[serde(rename = "split")]
    Split,
    /// Distinct values become generated columns.
    #[serde(rename = "splitcols")]
    SplitCols,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

impl Alignment {
    /// CSS class used by the renderer.
    pub fn css_class(self) -> &'static str {
        match self {
            Alignment::Left => "text-left",
            Alignment::Right => "text-right",
            Alignment::Center => "text-center",
            Alignment::Justify => "text-justify",
        }
    }
}

/// The compiled form of a computed column, shared by every leaf table.
#[derive(Debug, Clone)]
pub struct ComputedColumn {
    /// Position in the list of configured computed columns.
    pub spec_index: usize,
    /// None when the formula failed to compile; cells are then Null.
    pub formula: Option<CompiledFormula>,
    pub template: Option<Template>,
    pub css_formula: Option<CompiledFormula>,
    pub compute_total_using_formula: bool,
    pub apply_template_on_total: bool,
    pub apply_alignment_on_title: bool,
    pub apply_alignment_on_total: bool,
}

/// A column of a leaf table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: String,
    pub title: String,
    pub kind: ColumnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<BucketSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip)]
    pub format: FieldFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    /// Logical index used by `colN` references.
    pub declared_index: usize,
    #[serde(skip)]
    pub computed: Option<Arc<ComputedColumn>>,
    /// Column total, once totals have been computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<CellValue>,
    /// Rendered total (template or formatted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_total: Option<String>,
    /// For columns generated by a column-wise split: the split value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_value: Option<CellValue>,
    /// For columns generated by a column-wise split: the metric column it repeats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_source_id: Option<String>,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: ColumnKind) -> Self {
        Column {
            id: id.into(),
            title: title.into(),
            kind,
            schema: None,
            field_type: None,
            format: FieldFormat::Default,
            alignment: None,
            declared_index: 0,
            computed: None,
            total: None,
            formatted_total: None,
            split_value: None,
            split_source_id: None,
        }
    }

    pub fn with_schema(mut self, schema: BucketSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_declared_index(mut self, index: usize) -> Self {
        self.declared_index = index;
        self
    }

    pub fn is_bucket(&self) -> bool {
        self.kind == ColumnKind::Bucket
    }

    pub fn is_metric(&self) -> bool {
        self.kind == ColumnKind::Metric
    }

    pub fn is_computed(&self) -> bool {
        self.kind == ColumnKind::Computed
    }

    pub fn is_split_cols(&self) -> bool {
        self.schema == Some(BucketSchema::SplitCols)
    }

    pub fn is_split(&self) -> bool {
        self.schema == Some(BucketSchema::Split)
    }

    /// Whether the column was generated by a column-wise split.
    pub fn is_split_generated(&self) -> bool {
        self.split_value.is_some()
    }
}

/// Index of the first split-cols bucket.
pub fn split_cols_index(columns: &[Column]) -> Option<usize> {
    columns.iter().position(Column::is_split_cols)
}

/// Physical positions sorted by declared index.
pub fn logical_order(columns: &[Column]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..columns.len()).collect();
    order.sort_by_key(|&i| columns[i].declared_index);
    order
}
