//! FILENAME: core/table-engine/src/filter_bar.rs
//! Free-text filtering of the processed table.
//!
//! A row matches when every term is contained in the display text of at
//! least one of its cells. Filtering always starts from the unfiltered
//! base table, which is never modified.

use engine::{ContentType, FormatterCache, LeafTable, Row, TableNode};
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterBar {
    terms: Vec<String>,
    case_sensitive: bool,
}

impl FilterBar {
    /// Builds the filter from the input text. With `terms_separately`,
    /// whitespace-separated words are independent terms; otherwise the
    /// whole trimmed input is a single term.
    pub fn new(text: &str, case_sensitive: bool, terms_separately: bool) -> Self {
        let normalize = |term: &str| {
            if case_sensitive {
                term.to_string()
            } else {
                term.to_lowercase()
            }
        };
        let terms = if terms_separately {
            text.split_whitespace().map(normalize).collect()
        } else {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![normalize(trimmed)]
            }
        };
        FilterBar {
            terms,
            case_sensitive,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// True when every term appears in one of `cells`.
    pub fn matches_texts(&self, cells: &[String]) -> bool {
        let cells: Vec<String> = if self.case_sensitive {
            cells.to_vec()
        } else {
            cells.iter().map(|c| c.to_lowercase()).collect()
        };
        self.terms
            .iter()
            .all(|term| cells.iter().any(|cell| cell.contains(term.as_str())))
    }

    fn row_matches(&self, row: &Row, leaf: &LeafTable, formatters: &FormatterCache) -> bool {
        let texts: Vec<String> = row
            .cells
            .iter()
            .zip(&leaf.columns)
            .map(|(cell, column)| formatters.cell_to_string(cell, column, ContentType::Text))
            .collect();
        self.matches_texts(&texts)
    }

    /// Returns a filtered copy of `base`. Groups left without matching rows
    /// are dropped; a bare leaf is kept with zero rows.
    pub fn apply(&self, base: &TableNode, formatters: &FormatterCache) -> TableNode {
        let mut filtered = base.clone();
        if self.is_empty() {
            return filtered;
        }

        filtered.for_each_leaf_mut(&mut |leaf| {
            let table: &LeafTable = leaf;
            let keep: Vec<bool> = table
                .rows
                .iter()
                .map(|row| self.row_matches(row, table, formatters))
                .collect();
            let mut keep = keep.into_iter();
            leaf.rows.retain(|_| keep.next().unwrap_or(false));
        });
        filtered.prune_empty();

        debug!(
            target: "FILTER",
            "{:?} kept {} of {} rows",
            self.terms,
            filtered.row_count(),
            base.row_count()
        );
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_input_matches_everything() {
        let bar = FilterBar::new("   ", false, true);
        assert!(bar.is_empty());
        assert!(bar.matches_texts(&texts(&["anything"])));
    }

    #[test]
    fn separate_terms_must_all_match_some_cell() {
        let bar = FilterBar::new("paris 42", false, true);
        assert!(bar.matches_texts(&texts(&["Paris", "42 visits"])));
        assert!(!bar.matches_texts(&texts(&["Paris", "12 visits"])));
    }

    #[test]
    fn whole_phrase_when_terms_are_not_separate() {
        let bar = FilterBar::new("new york", false, false);
        assert!(bar.matches_texts(&texts(&["New York City"])));
        assert!(!bar.matches_texts(&texts(&["New", "York"])));
    }

    #[test]
    fn case_sensitivity_is_honored() {
        let sensitive = FilterBar::new("Paris", true, false);
        assert!(!sensitive.matches_texts(&texts(&["paris"])));
        assert!(sensitive.matches_texts(&texts(&["Paris"])));

        let insensitive = FilterBar::new("PARIS", false, false);
        assert!(insensitive.matches_texts(&texts(&["paris"])));
    }
}
