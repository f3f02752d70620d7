//! FILENAME: core/table-engine/src/view.rs
//! The display model produced by a refresh cycle and its rendering.
//!
//! `DisplayTable` is what the pipeline hands to the view: the processed
//! table tree (None when there are no hits), the per-column formula errors
//! and the container hints. `render` turns it into plain, serializable
//! header/row/total strings for any front end.

use std::rc::Rc;

use engine::{Column, ContentType, FormatterCache, LeafTable, TableNode};
use serde::Serialize;

use crate::error::ColumnFormulaError;
use crate::highlight::Highlighter;

/// Flags the view applies to its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerHints {
    /// Every leaf fits on one page.
    pub hide_pagination: bool,
    /// Set when there is nothing to export.
    pub hide_export_links: bool,
}

impl ContainerHints {
    pub fn classes(&self) -> Vec<&'static str> {
        let mut classes = Vec::new();
        if self.hide_pagination {
            classes.push("hide-pagination");
        }
        if self.hide_export_links {
            classes.push("hide-export-links");
        }
        classes
    }
}

#[derive(Debug, Clone)]
pub struct DisplayTable {
    /// None renders the empty state.
    pub table: Option<TableNode>,
    pub total_hits: u64,
    pub hints: ContainerHints,
    pub formula_errors: Vec<ColumnFormulaError>,
    pub show_total: bool,
    /// Set when filter matches should be highlighted.
    pub highlight_results: bool,
    pub highlighter: Option<Highlighter>,
    pub formatters: Rc<FormatterCache>,
}

impl DisplayTable {
    /// The empty state: zero hits.
    pub fn empty(total_hits: u64) -> Self {
        DisplayTable {
            table: None,
            total_hits,
            hints: ContainerHints {
                hide_pagination: true,
                hide_export_links: true,
            },
            formula_errors: Vec::new(),
            show_total: false,
            highlight_results: false,
            highlighter: None,
            formatters: Rc::new(FormatterCache::new()),
        }
    }

    pub fn has_some_rows(&self) -> bool {
        self.table.as_ref().is_some_and(TableNode::has_rows)
    }

    pub fn is_empty_state(&self) -> bool {
        self.table.is_none()
    }

    /// Recomputes hints for the current rows and page size.
    pub fn update_hints(&mut self, per_page: usize) {
        let per_page = per_page.max(1);
        let fits = self.table.as_ref().map_or(true, |table| {
            table.leaves().iter().all(|leaf| leaf.rows.len() <= per_page)
        });
        self.hints = ContainerHints {
            hide_pagination: fits,
            hide_export_links: !self.has_some_rows(),
        };
    }

    pub fn render(&self) -> RenderedView {
        let renderer = CellRenderer {
            formatters: &self.formatters,
            highlighter: if self.highlight_results {
                self.highlighter.as_ref()
            } else {
                None
            },
        };
        let mut tables = Vec::new();
        if let Some(table) = &self.table {
            collect_rendered(table, &[], &renderer, self.show_total, &mut tables);
        }
        RenderedView {
            tables,
            classes: self.hints.classes(),
            errors: self.formula_errors.iter().map(ToString::to_string).collect(),
            empty: self.table.is_none(),
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedHeader {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedCell {
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTable {
    /// Titles of the enclosing split groups, outermost first.
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headers: Vec<RenderedHeader>,
    pub rows: Vec<Vec<RenderedCell>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Vec<RenderedCell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedView {
    pub tables: Vec<RenderedTable>,
    pub classes: Vec<&'static str>,
    pub errors: Vec<String>,
    pub empty: bool,
}

/// Turns cells into HTML through the run's formatters.
pub struct CellRenderer<'a> {
    pub formatters: &'a FormatterCache,
    pub highlighter: Option<&'a Highlighter>,
}

impl CellRenderer<'_> {
    pub fn cell_html(&self, cell: &engine::Cell, column: &Column) -> String {
        let html = self.formatters.cell_to_string(cell, column, ContentType::Html);
        match self.highlighter {
            Some(h) => h.highlight(&html),
            None => html,
        }
    }

    fn header(&self, column: &Column) -> RenderedHeader {
        let aligned = column
            .computed
            .as_ref()
            .map_or(true, |c| c.apply_alignment_on_title);
        RenderedHeader {
            title: column.title.clone(),
            class: column.alignment.filter(|_| aligned).map(|a| a.css_class()),
        }
    }

    fn total(&self, column: &Column) -> RenderedCell {
        let aligned = column
            .computed
            .as_ref()
            .map_or(true, |c| c.apply_alignment_on_total);
        RenderedCell {
            html: column.formatted_total.clone().unwrap_or_default(),
            class: column.alignment.filter(|_| aligned).map(|a| a.css_class()),
            style: None,
        }
    }

    pub fn leaf(&self, leaf: &LeafTable, groups: &[String], show_total: bool) -> RenderedTable {
        let rows = leaf
            .rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .zip(&leaf.columns)
                    .map(|(cell, column)| RenderedCell {
                        html: self.cell_html(cell, column),
                        class: column.alignment.map(|a| a.css_class()),
                        style: cell.css.clone(),
                    })
                    .collect()
            })
            .collect();

        let totals = show_total.then(|| leaf.columns.iter().map(|c| self.total(c)).collect());

        RenderedTable {
            groups: groups.to_vec(),
            title: leaf.title.clone(),
            headers: leaf.columns.iter().map(|c| self.header(c)).collect(),
            rows,
            total_label: if show_total {
                leaf.total_label.clone()
            } else {
                None
            },
            totals,
        }
    }
}

fn collect_rendered(
    node: &TableNode,
    groups: &[String],
    renderer: &CellRenderer<'_>,
    show_total: bool,
    out: &mut Vec<RenderedTable>,
) {
    match node {
        TableNode::Leaf(leaf) => out.push(renderer.leaf(leaf, groups, show_total)),
        TableNode::Group(group) => {
            let mut path = groups.to_vec();
            path.push(group.title.clone());
            for table in &group.tables {
                collect_rendered(table, &path, renderer, show_total, out);
            }
        }
    }
}
