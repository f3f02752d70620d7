//! FILENAME: core/engine/src/value_key.rs
//! PURPOSE: Hashable, totally ordered keys for cell values.
//! CONTEXT: Grouping rows by bucket value (split table, split cols) and the
//! min/max aggregate actions both need values that can be hashed and
//! compared across types. `ValueKey` interns a `CellValue` into such a form
//! without coercing non-string values to strings.
//!
//! ORDERING: Null < Number < Text < Boolean. Numbers compare numerically
//! (NaN equals NaN), text compares by code point.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// Wrapper around f64 that implements Eq and Hash for use as HashMap keys.
/// NaN values are treated as equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrderedFloat(pub f64);

impl PartialEq for OrderedFloat {
    fn eq(&self, other: &Self) -> bool {
        if self.0.is_nan() && other.0.is_nan() {
            true
        } else {
            self.0 == other.0
        }
    }
}

impl Eq for OrderedFloat {}

impl Hash for OrderedFloat {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.0.is_nan() {
            u64::MAX.hash(state);
        } else if self.0 == 0.0 {
            // -0.0 and 0.0 compare equal so they must hash equal
            0u64.hash(state);
        } else {
            self.0.to_bits().hash(state);
        }
    }
}

impl OrderedFloat {
    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

/// An interned cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Number(OrderedFloat),
    Text(String),
    Boolean(bool),
}

impl From<&CellValue> for ValueKey {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Null => ValueKey::Null,
            CellValue::Number(n) => ValueKey::Number(OrderedFloat(*n)),
            CellValue::Text(s) => ValueKey::Text(s.clone()),
            CellValue::Boolean(b) => ValueKey::Boolean(*b),
        }
    }
}

impl From<&ValueKey> for CellValue {
    fn from(key: &ValueKey) -> Self {
        match key {
            ValueKey::Null => CellValue::Null,
            ValueKey::Number(n) => CellValue::Number(n.0),
            ValueKey::Text(s) => CellValue::Text(s.clone()),
            ValueKey::Boolean(b) => CellValue::Boolean(*b),
        }
    }
}

impl Ord for ValueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_keys(self, other)
    }
}

impl PartialOrd for ValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn rank(key: &ValueKey) -> u8 {
    match key {
        ValueKey::Null => 0,
        ValueKey::Number(_) => 1,
        ValueKey::Text(_) => 2,
        ValueKey::Boolean(_) => 3,
    }
}

fn compare_keys(a: &ValueKey, b: &ValueKey) -> Ordering {
    match (a, b) {
        (ValueKey::Number(na), ValueKey::Number(nb)) => {
            if na == nb {
                Ordering::Equal
            } else if na.0.is_nan() {
                Ordering::Less
            } else if nb.0.is_nan() {
                Ordering::Greater
            } else {
                na.0.partial_cmp(&nb.0).unwrap_or(Ordering::Equal)
            }
        }
        (ValueKey::Text(ta), ValueKey::Text(tb)) => ta.cmp(tb),
        (ValueKey::Boolean(ba), ValueKey::Boolean(bb)) => ba.cmp(bb),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Compares two cell values with the total ordering above.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    compare_keys(&ValueKey::from(a), &ValueKey::from(b))
}
