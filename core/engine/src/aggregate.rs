//! FILENAME: core/engine/src/aggregate.rs
//! PURPOSE: Column total accumulation (sum, avg, min, max, count).
//! CONTEXT: Totals are computed per leaf table for the total row and
//! accumulated page by page during a full CSV export. The accumulator is
//! mergeable so both uses share one implementation.

use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

/// The function used for the total row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalFunction {
    #[default]
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl TotalFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "sum" => Some(TotalFunction::Sum),
            "avg" | "average" => Some(TotalFunction::Avg),
            "min" => Some(TotalFunction::Min),
            "max" => Some(TotalFunction::Max),
            "count" => Some(TotalFunction::Count),
            _ => None,
        }
    }
}

/// Running aggregate for one column.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TotalAccumulator {
    pub sum: f64,
    /// Every row seen, whatever its value.
    pub count: u64,
    pub count_numbers: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl TotalAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one cell value. Non-numeric values only increment the count.
    pub fn add(&mut self, value: &CellValue) {
        match value {
            CellValue::Number(n) if n.is_finite() => self.add_number(*n),
            _ => self.count += 1,
        }
    }

    pub fn add_number(&mut self, value: f64) {
        self.count += 1;
        self.count_numbers += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &TotalAccumulator) {
        self.sum += other.sum;
        self.count += other.count;
        self.count_numbers += other.count_numbers;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    /// Computes the final total. Empty numeric input yields Null except for count.
    pub fn compute(&self, function: TotalFunction) -> CellValue {
        match function {
            TotalFunction::Count => CellValue::Number(self.count as f64),
            _ if self.count_numbers == 0 => CellValue::Null,
            TotalFunction::Sum => CellValue::Number(self.sum),
            TotalFunction::Avg => CellValue::Number(self.sum / self.count_numbers as f64),
            TotalFunction::Min => self.min.map_or(CellValue::Null, CellValue::Number),
            TotalFunction::Max => self.max.map_or(CellValue::Null, CellValue::Number),
        }
    }
}

impl<'a> FromIterator<&'a CellValue> for TotalAccumulator {
    fn from_iter<I: IntoIterator<Item = &'a CellValue>>(iter: I) -> Self {
        let mut acc = TotalAccumulator::new();
        for value in iter {
            acc.add(value);
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Vec<CellValue> {
        vec![
            CellValue::Number(4.0),
            CellValue::Text("x".into()),
            CellValue::Number(-2.0),
            CellValue::Null,
            CellValue::Number(10.0),
        ]
    }

    #[test]
    fn computes_each_function() {
        let acc: TotalAccumulator = values().iter().collect();
        assert_eq!(acc.compute(TotalFunction::Sum), CellValue::Number(12.0));
        assert_eq!(acc.compute(TotalFunction::Avg), CellValue::Number(4.0));
        assert_eq!(acc.compute(TotalFunction::Min), CellValue::Number(-2.0));
        assert_eq!(acc.compute(TotalFunction::Max), CellValue::Number(10.0));
        assert_eq!(acc.compute(TotalFunction::Count), CellValue::Number(5.0));
    }

    #[test]
    fn no_numbers_gives_null_totals() {
        let acc: TotalAccumulator = [CellValue::Text("a".into())].iter().collect();
        assert_eq!(acc.compute(TotalFunction::Sum), CellValue::Null);
        assert_eq!(acc.compute(TotalFunction::Count), CellValue::Number(1.0));
    }

    #[test]
    fn merge_matches_single_pass() {
        let all = values();
        let single: TotalAccumulator = all.iter().collect();
        let mut first: TotalAccumulator = all[..2].iter().collect();
        let second: TotalAccumulator = all[2..].iter().collect();
        first.merge(&second);
        assert_eq!(first, single);
    }

    #[test]
    fn parses_names() {
        assert_eq!(TotalFunction::parse("AVG"), Some(TotalFunction::Avg));
        assert_eq!(TotalFunction::parse("median"), None);
    }
}
