//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single table cell.
//! CONTEXT: This file contains the `Cell` struct and `CellValue` enum.
//! A cell holds the raw aggregation value, the key used for formatting,
//! the filter path that produced it, and optional rendered output for
//! computed columns (template HTML and computed CSS).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The raw value of an aggregation result.
/// Deserializes directly from JSON scalars (`null`, `true`, `1.5`, `"a"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Attempts to coerce the value to a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Null => None,
        }
    }

    /// Truthiness used by line filters and logical operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Null => false,
            CellValue::Boolean(b) => *b,
            CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
            CellValue::Text(s) => !s.is_empty(),
        }
    }

    /// Plain text form, without any column formatting applied.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

/// Format without unnecessary decimal places.
pub fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// One step of the filter path that leads to a cell: the bucket column and
/// the key of the bucket value on that column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTerm {
    pub column_id: String,
    pub key: CellValue,
}

/// How a cell should be converted to a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// Plain text (filter matching, CSV export).
    Text,
    /// HTML-safe text for the renderer (templates stay raw).
    Html,
}

/// The atomic unit of a table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub value: CellValue,
    /// Key used for formatting and filtering; usually equal to `value`.
    pub key: CellValue,
    /// Id of the column definition this cell belongs to.
    pub column_id: String,
    /// Bucket path (outermost first) built once when the cell is created.
    #[serde(skip_serializing_if = "<[FilterTerm]>::is_empty")]
    pub filter_path: Arc<[FilterTerm]>,
    /// Explicit filter override supplied by the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<serde_json::Value>,
    /// Rendered template output for computed columns (HTML).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<String>,
    /// CSS computed for this cell by the column's css formula.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
}

impl Cell {
    pub fn new(value: CellValue, column_id: impl Into<String>) -> Self {
        Cell {
            key: value.clone(),
            value,
            column_id: column_id.into(),
            filter_path: Arc::from(Vec::new()),
            filters: None,
            rendered: None,
            css: None,
        }
    }

    /// A synthetic zero-valued metric cell.
    pub fn zero(column_id: impl Into<String>) -> Self {
        Cell::new(CellValue::Number(0.0), column_id)
    }

    pub fn with_filter_path(mut self, path: Arc<[FilterTerm]>) -> Self {
        self.filter_path = path;
        self
    }

    /// The bucket path leading to this cell.
    pub fn filter_path(&self) -> &[FilterTerm] {
        &self.filter_path
    }
}
