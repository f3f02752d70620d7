//! FILENAME: core/engine/src/row_filter.rs
//! PURPOSE: Filter specs and aggregate actions for the `rowval` function.
//! CONTEXT: `rowval(target, action, fallback, filter)` aggregates the target
//! column over every row of the current table that satisfies `filter`.
//!
//! FILTER SPEC (JSON):
//! - object: every condition must hold, e.g. `{"col0": true, "col2": "EU"}`
//! - array of objects: any one object must hold
//!
//! CONDITION VALUES:
//! - `true`        candidate column equals the base row's same column
//! - `false`       candidate column differs from the base row's same column
//! - `"base.colM"` candidate column equals base row column M
//! - `"row.colM"`  candidate column equals the candidate's own column M
//! - anything else: candidate column equals that literal
//!
//! Keys and `colM` references accept `colN` or a column title.

use serde_json::Value as Json;

use crate::cell::CellValue;
use crate::error::FormulaError;
use crate::evaluator::values_equal;
use crate::formula::SplitColContext;
use crate::value_key::compare_values;

/// A column reference inside a filter spec or a rowval target.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSelector {
    /// Real (already remapped) index.
    Index(usize),
    Name(String),
}

impl ColumnSelector {
    /// Parses `colN` / `col[N]` or falls back to a title.
    pub fn parse(text: &str, context: &SplitColContext) -> Self {
        let upper = text.trim().to_uppercase();
        let digits = upper
            .strip_prefix("COL[")
            .and_then(|s| s.strip_suffix(']'))
            .or_else(|| upper.strip_prefix("COL"));
        match digits.and_then(|d| d.parse::<usize>().ok()) {
            Some(index) => ColumnSelector::Index(context.real_index(index)),
            None => ColumnSelector::Name(text.trim().to_string()),
        }
    }

    /// Resolves to a position in a row, using `names` for titles.
    pub fn resolve(&self, names: &[String]) -> Option<usize> {
        match self {
            ColumnSelector::Index(index) => Some(*index),
            ColumnSelector::Name(name) => names.iter().position(|n| n == name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expected {
    SameAsBase,
    DifferentFromBase,
    Base(ColumnSelector),
    Row(ColumnSelector),
    Literal(CellValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: ColumnSelector,
    pub expected: Expected,
}

/// A parsed filter spec: any of the groups, each group all of its conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFilter {
    groups: Vec<Vec<Condition>>,
}

impl RowFilter {
    /// Parses a JSON filter spec. Malformed input is an error.
    pub fn parse(text: &str, context: &SplitColContext) -> Result<Self, FormulaError> {
        if text.trim().is_empty() {
            return Ok(RowFilter { groups: vec![Vec::new()] });
        }
        let json: Json = serde_json::from_str(text)
            .map_err(|e| FormulaError::InvalidRowFilter(e.to_string()))?;

        let groups = match json {
            Json::Object(_) => vec![parse_group(&json, context)?],
            Json::Array(items) => items
                .iter()
                .map(|item| parse_group(item, context))
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(FormulaError::InvalidRowFilter(format!(
                    "expected an object or an array, found {}",
                    other
                )))
            }
        };
        Ok(RowFilter { groups })
    }

    /// Whether `candidate` satisfies the filter relative to `base`.
    pub fn matches(&self, base: &[CellValue], candidate: &[CellValue], names: &[String]) -> bool {
        self.groups
            .iter()
            .any(|group| group.iter().all(|c| condition_holds(c, base, candidate, names)))
    }
}

fn parse_group(json: &Json, context: &SplitColContext) -> Result<Vec<Condition>, FormulaError> {
    let Json::Object(map) = json else {
        return Err(FormulaError::InvalidRowFilter(format!(
            "expected an object, found {}",
            json
        )));
    };

    map.iter()
        .map(|(key, value)| {
            let expected = match value {
                Json::Bool(true) => Expected::SameAsBase,
                Json::Bool(false) => Expected::DifferentFromBase,
                Json::String(s) => {
                    if let Some(rest) = s.strip_prefix("base.") {
                        Expected::Base(ColumnSelector::parse(rest, context))
                    } else if let Some(rest) = s.strip_prefix("row.") {
                        Expected::Row(ColumnSelector::parse(rest, context))
                    } else {
                        Expected::Literal(CellValue::Text(s.clone()))
                    }
                }
                Json::Number(n) => Expected::Literal(CellValue::Number(n.as_f64().unwrap_or(f64::NAN))),
                Json::Null => Expected::Literal(CellValue::Null),
                other => {
                    return Err(FormulaError::InvalidRowFilter(format!(
                        "unsupported condition value for '{}': {}",
                        key, other
                    )))
                }
            };
            Ok(Condition {
                column: ColumnSelector::parse(key, context),
                expected,
            })
        })
        .collect()
}

fn lookup<'a>(row: &'a [CellValue], selector: &ColumnSelector, names: &[String]) -> Option<&'a CellValue> {
    selector.resolve(names).and_then(|i| row.get(i))
}

fn condition_holds(
    condition: &Condition,
    base: &[CellValue],
    candidate: &[CellValue],
    names: &[String],
) -> bool {
    let Some(actual) = lookup(candidate, &condition.column, names) else {
        return false;
    };

    match &condition.expected {
        Expected::SameAsBase => lookup(base, &condition.column, names)
            .is_some_and(|b| values_equal(actual, b)),
        Expected::DifferentFromBase => lookup(base, &condition.column, names)
            .is_some_and(|b| !values_equal(actual, b)),
        Expected::Base(selector) => {
            lookup(base, selector, names).is_some_and(|b| values_equal(actual, b))
        }
        Expected::Row(selector) => {
            lookup(candidate, selector, names).is_some_and(|r| values_equal(actual, r))
        }
        Expected::Literal(value) => values_equal(actual, value),
    }
}

/// Supported aggregate actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    First,
    Last,
    Sum,
    Avg,
    Min,
    Max,
}

impl RowAction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "first" => Some(RowAction::First),
            "last" => Some(RowAction::Last),
            "sum" => Some(RowAction::Sum),
            "avg" | "average" => Some(RowAction::Avg),
            "min" => Some(RowAction::Min),
            "max" => Some(RowAction::Max),
            _ => None,
        }
    }

    /// Aggregates the target values of the qualifying rows, in row order.
    ///
    /// sum/avg skip nulls and non-numbers; min/max skip nulls and use the
    /// total value ordering (Null < Number < Text < Boolean). When nothing
    /// qualifies the fallback is returned.
    pub fn aggregate<'a>(
        self,
        values: impl Iterator<Item = &'a CellValue>,
        fallback: CellValue,
    ) -> CellValue {
        match self {
            RowAction::First => values.into_iter().next().cloned().unwrap_or(fallback),
            RowAction::Last => values.last().cloned().unwrap_or(fallback),
            RowAction::Sum | RowAction::Avg => {
                let mut sum = 0.0;
                let mut count = 0usize;
                for value in values {
                    if let CellValue::Number(n) = value {
                        sum += n;
                        count += 1;
                    }
                }
                match (self, count) {
                    (_, 0) => fallback,
                    (RowAction::Avg, _) => CellValue::Number(sum / count as f64),
                    _ => CellValue::Number(sum),
                }
            }
            RowAction::Min | RowAction::Max => {
                let mut result: Option<&CellValue> = None;
                for value in values.filter(|v| !v.is_null()) {
                    let replace = match result {
                        None => true,
                        Some(current) => {
                            let ordering = compare_values(value, current);
                            if self == RowAction::Min {
                                ordering.is_lt()
                            } else {
                                ordering.is_gt()
                            }
                        }
                    };
                    if replace {
                        result = Some(value);
                    }
                }
                result.cloned().unwrap_or(fallback)
            }
        }
    }
}
