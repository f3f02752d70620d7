//! FILENAME: core/export/src/csv.rs
//! CSV assembly for processed tables.
//!
//! Split tables are flattened: each split level becomes a leading column
//! holding the group's formatted value, followed by the leaf columns. The
//! column layout is fixed by the first table seen, so every page of a full
//! export lines up with the same header. Rows are matched to that header by
//! column id; columns a page does not have are written blank.

use encoding_rs::{Encoding, UTF_8};
use engine::{Column, ContentType, FormatterCache, LeafTable, TableNode, TotalAccumulator, TotalFunction};
use table_engine::{finalize_totals, ErrorLog, VisParams};

use crate::error::ExportError;

pub const LINE_END: &str = "\r\n";

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub separator: String,
    pub quote_values: bool,
    pub encoding: &'static Encoding,
    pub with_totals: bool,
    pub total_function: TotalFunction,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            separator: ",".to_string(),
            quote_values: true,
            encoding: UTF_8,
            with_totals: false,
            total_function: TotalFunction::Sum,
        }
    }
}

impl CsvOptions {
    pub fn from_params(params: &VisParams) -> Result<Self, ExportError> {
        let encoding = Encoding::for_label(params.csv_encoding.trim().as_bytes())
            .ok_or_else(|| ExportError::Encoding(params.csv_encoding.clone()))?;
        Ok(CsvOptions {
            separator: params.csv_separator.clone(),
            quote_values: params.csv_quote_values,
            encoding,
            with_totals: params.csv_export_with_total,
            total_function: params.total_func,
        })
    }

    /// Encodes text in the configured character encoding.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (bytes, _, _) = self.encoding.encode(text);
        bytes.into_owned()
    }
}

/// Quotes a value when it holds any non-alphanumeric character, doubling
/// embedded quotes.
pub fn escape_cell(value: &str, quote_values: bool) -> String {
    if quote_values && value.chars().any(|c| !c.is_ascii_alphanumeric()) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `<export title or table title>.csv`
pub fn export_file_name(params: &VisParams, table_title: Option<&str>) -> String {
    let stem = params
        .export_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or(table_title.map(str::trim).filter(|t| !t.is_empty()))
        .unwrap_or("table");
    format!("{}.csv", stem)
}

// ============================================================================
// FLATTENING
// ============================================================================

/// A leaf with the formatted values of the split groups above it.
struct FlatLeaf<'a> {
    keys: Vec<String>,
    leaf: &'a LeafTable,
}

fn flatten<'a>(node: &'a TableNode, parent_title: Option<&str>, keys: &mut Vec<String>, out: &mut Vec<FlatLeaf<'a>>) {
    match node {
        TableNode::Leaf(leaf) => out.push(FlatLeaf {
            keys: keys.clone(),
            leaf,
        }),
        TableNode::Group(group) if group.key.is_null() => {
            for table in &group.tables {
                flatten(table, Some(group.title.as_str()), keys, out);
            }
        }
        TableNode::Group(group) => {
            let suffix = parent_title.map(|t| format!(": {}", t)).unwrap_or_default();
            let value = group
                .title
                .strip_suffix(&suffix)
                .filter(|_| !suffix.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| group.key.as_text());
            keys.push(value);
            for table in &group.tables {
                flatten(table, None, keys, out);
            }
            keys.pop();
        }
    }
}

/// Titles of the split levels along the first path of the tree.
fn split_titles(node: &TableNode) -> Vec<String> {
    let mut titles = Vec::new();
    let mut current = node;
    loop {
        match current {
            TableNode::Leaf(_) => return titles,
            TableNode::Group(group) => {
                if group.key.is_null() {
                    titles.push(group.title.clone());
                }
                match group.tables.first() {
                    Some(first) => current = first,
                    None => return titles,
                }
            }
        }
    }
}

// ============================================================================
// ASSEMBLER
// ============================================================================

/// Builds CSV text for one export, possibly over many pages.
#[derive(Debug)]
pub struct CsvAssembler {
    options: CsvOptions,
    split_titles: Vec<String>,
    columns: Vec<Column>,
    accumulators: Vec<TotalAccumulator>,
    rows_written: usize,
}

impl CsvAssembler {
    pub fn new(options: CsvOptions) -> Self {
        CsvAssembler {
            options,
            split_titles: Vec::new(),
            columns: Vec::new(),
            accumulators: Vec::new(),
            rows_written: 0,
        }
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    pub fn has_layout(&self) -> bool {
        !self.columns.is_empty() || !self.split_titles.is_empty()
    }

    /// Fixes the column layout from the first processed table.
    pub fn set_layout(&mut self, node: &TableNode) {
        self.split_titles = split_titles(node);
        self.columns = node
            .first_leaf()
            .map(|leaf| leaf.columns.clone())
            .unwrap_or_default();
        self.accumulators = vec![TotalAccumulator::new(); self.columns.len()];
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn line(&self, cells: impl IntoIterator<Item = String>) -> String {
        let mut line = cells
            .into_iter()
            .map(|c| escape_cell(&c, self.options.quote_values))
            .collect::<Vec<_>>()
            .join(&self.options.separator);
        line.push_str(LINE_END);
        line
    }

    pub fn header(&self) -> String {
        self.line(
            self.split_titles
                .iter()
                .cloned()
                .chain(self.columns.iter().map(|c| c.title.clone())),
        )
    }

    /// Rows of every leaf of `node`, accumulating totals on the way.
    pub fn rows(&mut self, node: &TableNode, formatters: &FormatterCache) -> String {
        let mut leaves = Vec::new();
        flatten(node, None, &mut Vec::new(), &mut leaves);

        let mut out = String::new();
        for flat in &leaves {
            let positions: Vec<Option<usize>> = self
                .columns
                .iter()
                .map(|c| flat.leaf.column_index(&c.id))
                .collect();

            for row in &flat.leaf.rows {
                let mut cells = flat.keys.clone();
                cells.resize(self.split_titles.len(), String::new());
                for (slot, position) in positions.iter().enumerate() {
                    let text = match position.and_then(|p| row.cells.get(p).map(|cell| (p, cell))) {
                        Some((p, cell)) => {
                            self.accumulators[slot].add(&cell.value);
                            formatters.cell_to_string(cell, &flat.leaf.columns[p], ContentType::Text)
                        }
                        None => String::new(),
                    };
                    cells.push(text);
                }
                out.push_str(&self.line(cells));
                self.rows_written += 1;
            }
        }
        out
    }

    /// The totals row; blank under split columns and columns without a total.
    pub fn totals(&self, total_hits: f64, formatters: &FormatterCache) -> String {
        let mut columns = self.columns.clone();
        let mut errors = ErrorLog::default();
        finalize_totals(
            &mut columns,
            &self.accumulators,
            self.options.total_function,
            total_hits,
            formatters,
            &mut errors,
        );
        self.line(
            std::iter::repeat(String::new())
                .take(self.split_titles.len())
                .chain(columns.iter().map(|c| c.formatted_total.clone().unwrap_or_default())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_like_a_spreadsheet_expects() {
        assert_eq!(escape_cell(r#"He said "hi", ok"#, true), r#""He said ""hi"", ok""#);
        assert_eq!(escape_cell("plain123", true), "plain123");
        assert_eq!(escape_cell("two words", true), "\"two words\"");
        assert_eq!(escape_cell("two words", false), "two words");
        assert_eq!(escape_cell("", true), "");
    }

    #[test]
    fn options_reject_unknown_encodings() {
        let mut params = VisParams::default();
        params.csv_encoding = "klingon".into();
        assert!(matches!(CsvOptions::from_params(&params), Err(ExportError::Encoding(_))));

        params.csv_encoding = "windows-1252".into();
        let options = CsvOptions::from_params(&params).unwrap();
        assert_eq!(options.encode("é"), vec![0xE9]);
    }

    #[test]
    fn file_name_prefers_the_export_title() {
        let mut params = VisParams::default();
        assert_eq!(export_file_name(&params, Some("Traffic")), "Traffic.csv");
        assert_eq!(export_file_name(&params, None), "table.csv");
        params.export_title = Some("report".into());
        assert_eq!(export_file_name(&params, Some("Traffic")), "report.csv");
    }
}
