//! FILENAME: core/table-engine/src/definition.rs
//! Table Definition - The serializable visualization parameters.
//!
//! This module contains all the types needed to DESCRIBE an enhanced table.
//! These structures are designed to be:
//! - Deserialized from partial JSON (every field has a default)
//! - Immutable snapshots of user intent for one refresh cycle
//!
//! The formula-bearing parts (computed columns, line filter) are compiled
//! separately by `computed` and cached across cycles.

use serde::{Deserialize, Serialize};

use engine::date_format::DEFAULT_DATE_PATTERN;
use engine::number_format::DEFAULT_NUMBER_PATTERN;
use engine::{Alignment, DurationFormat, DurationUnit, FieldFormat, TotalFunction};

/// Default max rows per page fetch during a full export.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 10_000;

// ============================================================================
// COMPUTED COLUMNS
// ============================================================================

/// How a computed column formats its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    #[default]
    Number,
    String,
    Date,
    Duration,
}

/// A user-configured computed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedColumnSpec {
    pub label: String,
    pub formula: String,
    pub compute_total_using_formula: bool,
    pub format: FormatKind,
    /// Number pattern, e.g. `0,0.[000]` or `0.00%`.
    pub pattern: String,
    pub date_pattern: String,
    pub duration_input_format: DurationUnit,
    pub duration_output_format: String,
    pub duration_output_precision: usize,
    pub duration_show_suffix: bool,
    pub duration_use_short_suffix: bool,
    pub duration_include_space_with_suffix: bool,
    pub alignment: Alignment,
    pub apply_alignment_on_title: bool,
    pub apply_alignment_on_total: bool,
    pub apply_template: bool,
    pub apply_template_on_total: bool,
    pub template: String,
    /// Formula evaluated per cell; its text result becomes the cell CSS.
    pub cell_computed_css: String,
    /// Physical position to splice the column at, instead of appending.
    pub custom_column_position: Option<usize>,
    pub enabled: bool,
}

impl Default for ComputedColumnSpec {
    fn default() -> Self {
        ComputedColumnSpec {
            label: "Value".to_string(),
            formula: "col0".to_string(),
            compute_total_using_formula: false,
            format: FormatKind::Number,
            pattern: DEFAULT_NUMBER_PATTERN.to_string(),
            date_pattern: DEFAULT_DATE_PATTERN.to_string(),
            duration_input_format: DurationUnit::Seconds,
            duration_output_format: "humanize".to_string(),
            duration_output_precision: 0,
            duration_show_suffix: false,
            duration_use_short_suffix: false,
            duration_include_space_with_suffix: true,
            alignment: Alignment::Left,
            apply_alignment_on_title: true,
            apply_alignment_on_total: true,
            apply_template: false,
            apply_template_on_total: true,
            template: "{{value}}".to_string(),
            cell_computed_css: String::new(),
            custom_column_position: None,
            enabled: true,
        }
    }
}

impl ComputedColumnSpec {
    pub fn new(label: impl Into<String>, formula: impl Into<String>) -> Self {
        ComputedColumnSpec {
            label: label.into(),
            formula: formula.into(),
            ..Default::default()
        }
    }

    /// The field format derived from the format kind and its options.
    pub fn field_format(&self) -> FieldFormat {
        match self.format {
            FormatKind::Number => FieldFormat::Number {
                pattern: Some(self.pattern.clone()),
            },
            FormatKind::String => FieldFormat::String,
            FormatKind::Date => FieldFormat::Date {
                pattern: Some(self.date_pattern.clone()),
            },
            FormatKind::Duration => FieldFormat::Duration(DurationFormat {
                input_format: self.duration_input_format,
                output_format: self.duration_output_format.clone(),
                output_precision: self.duration_output_precision,
                show_suffix: self.duration_show_suffix,
                use_short_suffix: self.duration_use_short_suffix,
                include_space_with_suffix: self.duration_include_space_with_suffix,
            }),
        }
    }
}

// ============================================================================
// MAIN PARAMETERS STRUCT
// ============================================================================

/// The complete set of visualization parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisParams {
    pub computed_columns: Vec<ComputedColumnSpec>,
    /// Boolean formula; rows where it is falsy are dropped.
    pub lines_computed_filter: String,
    /// Comma-separated column indices or labels.
    pub hidden_columns: String,
    pub computed_cols_per_split_col: bool,

    pub show_total: bool,
    pub total_func: TotalFunction,
    pub total_label: String,

    pub show_filter_bar: bool,
    pub filter_case_sensitive: bool,
    pub filter_terms_separately: bool,
    pub filter_highlight_results: bool,
    pub filter_bar_hideable: bool,
    pub filter_as_you_type: bool,
    pub filter_bar_width: String,

    pub csv_export_with_total: bool,
    pub csv_full_export: bool,
    pub csv_encoding: String,
    pub csv_separator: String,
    pub csv_quote_values: bool,
    pub csv_max_page_size: usize,
    /// File name stem for exports; falls back to the table title.
    pub export_title: Option<String>,

    pub per_page: usize,
}

impl Default for VisParams {
    fn default() -> Self {
        VisParams {
            computed_columns: Vec::new(),
            lines_computed_filter: String::new(),
            hidden_columns: String::new(),
            computed_cols_per_split_col: false,
            show_total: false,
            total_func: TotalFunction::Sum,
            total_label: String::new(),
            show_filter_bar: false,
            filter_case_sensitive: false,
            filter_terms_separately: false,
            filter_highlight_results: false,
            filter_bar_hideable: false,
            filter_as_you_type: false,
            filter_bar_width: "25%".to_string(),
            csv_export_with_total: false,
            csv_full_export: false,
            csv_encoding: "utf-8".to_string(),
            csv_separator: ",".to_string(),
            csv_quote_values: true,
            csv_max_page_size: DEFAULT_MAX_PAGE_SIZE,
            export_title: None,
            per_page: 10,
        }
    }
}

impl VisParams {
    /// Enabled computed columns with their position in the configured list.
    pub fn enabled_computed_columns(&self) -> impl Iterator<Item = (usize, &ComputedColumnSpec)> {
        self.computed_columns
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.enabled)
    }

    pub fn highlight_enabled(&self) -> bool {
        self.show_filter_bar && self.filter_highlight_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let params: VisParams = serde_json::from_str(
            r#"{
                "computedColumns": [{"label": "Ratio", "formula": "col1 / col2", "format": "duration"}],
                "hiddenColumns": "1,3",
                "totalFunc": "avg",
                "perPage": 25
            }"#,
        )
        .unwrap();

        assert_eq!(params.hidden_columns, "1,3");
        assert_eq!(params.total_func, TotalFunction::Avg);
        assert_eq!(params.per_page, 25);
        assert_eq!(params.csv_separator, ",");
        assert_eq!(params.csv_max_page_size, DEFAULT_MAX_PAGE_SIZE);

        let spec = &params.computed_columns[0];
        assert!(spec.enabled);
        assert_eq!(spec.pattern, DEFAULT_NUMBER_PATTERN);
        assert!(matches!(spec.field_format(), FieldFormat::Duration(_)));
    }

    #[test]
    fn disabled_columns_are_skipped_but_keep_their_index() {
        let mut params = VisParams::default();
        params.computed_columns = vec![
            ComputedColumnSpec::new("a", "col0"),
            ComputedColumnSpec {
                enabled: false,
                ..ComputedColumnSpec::new("b", "col0")
            },
            ComputedColumnSpec::new("c", "col0"),
        ];
        let indices: Vec<usize> = params.enabled_computed_columns().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 2]);
    }
}
