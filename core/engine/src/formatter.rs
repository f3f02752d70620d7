//! FILENAME: core/engine/src/formatter.rs
//! PURPOSE: Column formatters and the per-run formatter cache.
//! CONTEXT: Every column carries a `FieldFormat`. Turning a cell into text
//! goes through a `CellFormatter` built from that format. Formatters are
//! built lazily and memoized in a `FormatterCache` keyed by column id, which
//! is owned by a single pipeline run (never stored on the column itself).

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, CellValue, ContentType};
use crate::column::Column;
use crate::date_format::{from_epoch_millis, parse_date_text, DatePattern};
use crate::duration_format::DurationFormat;
use crate::number_format::{format_general, NumberPattern};

/// How a column's values are rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "id", rename_all = "lowercase")]
pub enum FieldFormat {
    /// Values as they come, numbers in general format.
    #[default]
    Default,
    Number {
        #[serde(default)]
        pattern: Option<String>,
    },
    String,
    Date {
        #[serde(default)]
        pattern: Option<String>,
    },
    Duration(DurationFormat),
}

/// A ready-to-use formatter for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellFormatter {
    Default,
    Number(NumberPattern),
    String,
    Date(DatePattern),
    Duration(DurationFormat),
}

impl CellFormatter {
    pub fn new(format: &FieldFormat) -> Self {
        match format {
            FieldFormat::Default => CellFormatter::Default,
            FieldFormat::Number { pattern } => {
                CellFormatter::Number(NumberPattern::parse(pattern.as_deref().unwrap_or("")))
            }
            FieldFormat::String => CellFormatter::String,
            FieldFormat::Date { pattern } => {
                CellFormatter::Date(DatePattern::parse(pattern.as_deref().unwrap_or("")))
            }
            FieldFormat::Duration(options) => CellFormatter::Duration(options.clone()),
        }
    }

    /// Formats a value as plain text.
    pub fn format(&self, value: &CellValue) -> String {
        match (self, value) {
            (_, CellValue::Null) => String::new(),
            (CellFormatter::Number(pattern), v) => match v.as_number() {
                Some(n) => pattern.format(n),
                None => v.as_text(),
            },
            (CellFormatter::Date(pattern), CellValue::Number(ms)) => match from_epoch_millis(*ms) {
                Some(date) => pattern.format(&date),
                None => value.as_text(),
            },
            (CellFormatter::Date(pattern), CellValue::Text(s)) => match parse_date_text(s) {
                Some(date) => pattern.format(&date),
                None => s.clone(),
            },
            (CellFormatter::Duration(options), v) => match v.as_number() {
                Some(n) => options.format(n),
                None => v.as_text(),
            },
            (CellFormatter::Default, CellValue::Number(n)) => format_general(*n),
            (_, v) => v.as_text(),
        }
    }
}

/// Escapes text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Memoized formatters keyed by column id, owned by one run.
#[derive(Debug, Default)]
pub struct FormatterCache {
    formatters: RefCell<FxHashMap<String, Rc<CellFormatter>>>,
}

impl FormatterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the formatter for a column, building it on first use.
    pub fn formatter_for(&self, column: &Column) -> Rc<CellFormatter> {
        if let Some(existing) = self.formatters.borrow().get(&column.id) {
            return Rc::clone(existing);
        }
        let formatter = Rc::new(CellFormatter::new(&column.format));
        self.formatters
            .borrow_mut()
            .insert(column.id.clone(), Rc::clone(&formatter));
        formatter
    }

    /// Formats a raw value the way `column` would display it.
    pub fn format_value(&self, value: &CellValue, column: &Column) -> String {
        self.formatter_for(column).format(value)
    }

    /// String conversion of a cell. Deterministic for a given cell/column.
    ///
    /// `Html` returns the rendered template when the column has one, or the
    /// escaped formatted value. `Text` always returns the formatted value.
    pub fn cell_to_string(&self, cell: &Cell, column: &Column, content_type: ContentType) -> String {
        match content_type {
            ContentType::Text => self.format_value(&cell.key, column),
            ContentType::Html => match &cell.rendered {
                Some(html) => html.clone(),
                None => escape_html(&self.format_value(&cell.key, column)),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.formatters.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.formatters.borrow().is_empty()
    }
}
