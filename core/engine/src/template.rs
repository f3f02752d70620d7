//! FILENAME: core/engine/src/template.rs
//! PURPOSE: Handlebars-style templates for computed column cells.
//! CONTEXT: A computed column may render its cells through a template such
//! as `<a href="/item/{{col0}}">{{formattedValue}}</a>`. Double braces
//! insert HTML-escaped text, triple braces insert raw text. Placeholders
//! resolve to `colN` (raw value of column N), `value` (raw computed value)
//! and `formattedValue` (computed value through the column formatter).
//! Unknown names render as empty strings.

use crate::cell::CellValue;
use crate::formatter::escape_html;
use crate::formula::SplitColContext;

#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    Column(usize),
    Value,
    FormattedValue,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field { placeholder: Placeholder, raw: bool },
}

/// A parsed template, immutable once compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
    referenced: Vec<usize>,
}

impl Template {
    /// Parses `source`, remapping column placeholders through `context`.
    pub fn compile(source: &str, context: &SplitColContext) -> Self {
        let mut segments = Vec::new();
        let mut referenced = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            let raw = rest[open..].starts_with("{{{");
            let (open_len, close) = if raw { (3, "}}}") } else { (2, "}}") };
            let inner_start = open + open_len;
            let Some(close_rel) = rest[inner_start..].find(close) else {
                break;
            };

            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }

            let name = rest[inner_start..inner_start + close_rel].trim();
            let placeholder = resolve_placeholder(name, context);
            if let Placeholder::Column(index) = placeholder {
                if !referenced.contains(&index) {
                    referenced.push(index);
                }
            }
            segments.push(Segment::Field { placeholder, raw });
            rest = &rest[inner_start + close_rel + close.len()..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Template {
            source: source.to_string(),
            segments,
            referenced,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Real column indices the template reads.
    pub fn referenced(&self) -> &[usize] {
        &self.referenced
    }

    /// Renders against a row (logical order) and the computed value.
    pub fn render(&self, row: &[CellValue], value: &CellValue, formatted: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field { placeholder, raw } => {
                    let text = match placeholder {
                        Placeholder::Column(index) => {
                            row.get(*index).map(CellValue::as_text).unwrap_or_default()
                        }
                        Placeholder::Value => value.as_text(),
                        Placeholder::FormattedValue => formatted.to_string(),
                        Placeholder::Unknown(_) => String::new(),
                    };
                    if *raw {
                        out.push_str(&text);
                    } else {
                        out.push_str(&escape_html(&text));
                    }
                }
            }
        }
        out
    }
}

fn resolve_placeholder(name: &str, context: &SplitColContext) -> Placeholder {
    if name == "value" {
        return Placeholder::Value;
    }
    if name == "formattedValue" {
        return Placeholder::FormattedValue;
    }

    let upper = name.to_uppercase();
    let digits = upper
        .strip_prefix("COL[")
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| upper.strip_prefix("COL"));
    match digits.and_then(|d| d.parse::<usize>().ok()) {
        Some(index) => Placeholder::Column(context.real_index(index)),
        None => Placeholder::Unknown(name.to_string()),
    }
}
