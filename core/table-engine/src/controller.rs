//! FILENAME: core/table-engine/src/controller.rs
//! Stateful host for refresh cycles and filter-bar input.
//!
//! The controller owns the parameters, the formula cache and the last
//! unfiltered display table. Each refresh rebuilds the base table; filter
//! input re-runs only the filter-bar stage on a copy of that base.

use engine::TabifiedResponse;
use log::{error, info};

use crate::computed::FormulaCache;
use crate::definition::VisParams;
use crate::pipeline::TablePipeline;
use crate::error::ConfigurationError;
use crate::filter_bar::FilterBar;
use crate::highlight::Highlighter;
use crate::view::DisplayTable;

/// User-facing notifications, without repeating the same error on every
/// refresh.
#[derive(Debug, Default)]
pub struct Notifier {
    last_error: Option<ConfigurationError>,
    messages: Vec<String>,
}

impl Notifier {
    /// Records an error; returns false when it was already being shown.
    pub fn notify_error(&mut self, err: &ConfigurationError) -> bool {
        if self.last_error.as_ref() == Some(err) {
            return false;
        }
        error!(target: "PIPELINE", "{}", err);
        self.last_error = Some(err.clone());
        self.messages.push(err.to_string());
        true
    }

    /// A successful cycle; the next error is shown again.
    pub fn clear(&mut self) {
        self.last_error = None;
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

#[derive(Debug, Default)]
pub struct TableController {
    params: VisParams,
    cache: FormulaCache,
    notifier: Notifier,
    base: Option<DisplayTable>,
    view: Option<DisplayTable>,
    filter_text: String,
}

impl TableController {
    pub fn new(params: VisParams) -> Self {
        TableController {
            params,
            ..Default::default()
        }
    }

    pub fn params(&self) -> &VisParams {
        &self.params
    }

    /// Replaces the parameters; compiled formulas are discarded.
    pub fn set_params(&mut self, params: VisParams) {
        self.params = params;
        self.cache.clear();
    }

    /// Runs a refresh cycle. On a configuration error the error is notified
    /// and the view of the last successful refresh stays in place.
    pub fn refresh(&mut self, response: &TabifiedResponse) -> Result<&DisplayTable, ConfigurationError> {
        match TablePipeline::new(&self.params, &mut self.cache).run(response) {
            Ok(display) => {
                self.notifier.clear();
                let view = self.filtered(&display);
                self.base = Some(display);
                Ok(&*self.view.insert(view))
            }
            Err(err) => {
                self.notifier.notify_error(&err);
                Err(err)
            }
        }
    }

    /// Filters the last base table with new input.
    pub fn set_filter(&mut self, text: &str) -> Option<&DisplayTable> {
        self.filter_text = text.to_string();
        self.view = self.base.as_ref().map(|base| self.filtered(base));
        self.view.as_ref()
    }

    fn filtered(&self, base: &DisplayTable) -> DisplayTable {
        let bar = if self.params.show_filter_bar {
            FilterBar::new(
                &self.filter_text,
                self.params.filter_case_sensitive,
                self.params.filter_terms_separately,
            )
        } else {
            FilterBar::default()
        };
        if bar.is_empty() {
            return base.clone();
        }

        let mut view = base.clone();
        view.table = base.table.as_ref().map(|t| bar.apply(t, &base.formatters));
        view.highlighter = if base.highlight_results {
            Highlighter::new(&bar)
        } else {
            None
        };
        view.update_hints(self.params.per_page);
        info!(
            target: "FILTER",
            "filter {:?}: {} rows",
            self.filter_text,
            view.table.as_ref().map_or(0, |t| t.row_count())
        );
        view
    }

    pub fn view(&self) -> Option<&DisplayTable> {
        self.view.as_ref()
    }

    /// The unfiltered table of the last successful refresh.
    pub fn base(&self) -> Option<&DisplayTable> {
        self.base.as_ref()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifier_shows_an_error_once_until_cleared() {
        let mut notifier = Notifier::default();
        assert!(notifier.notify_error(&ConfigurationError::SplitColsNotLast));
        assert!(!notifier.notify_error(&ConfigurationError::SplitColsNotLast));
        notifier.clear();
        assert!(notifier.notify_error(&ConfigurationError::SplitColsNotLast));
        assert_eq!(notifier.messages().len(), 2);
    }
}
