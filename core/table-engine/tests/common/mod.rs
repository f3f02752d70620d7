//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for table pipeline integration tests.

#![allow(dead_code)]

use engine::{CellValue, TabifiedResponse};
use table_engine::{ComputedColumnSpec, DisplayTable, TableController, VisParams};

/// Test harness wrapping a controller and the response it refreshes with.
pub struct TestHarness {
    pub controller: TableController,
    pub response: TabifiedResponse,
}

impl TestHarness {
    /// Create a harness with default parameters and the sample response.
    pub fn new() -> Self {
        Self::with_params(VisParams::default())
    }

    pub fn with_params(params: VisParams) -> Self {
        TestHarness {
            controller: TableController::new(params),
            response: sample_response(),
        }
    }

    pub fn with_response(mut self, response: TabifiedResponse) -> Self {
        self.response = response;
        self
    }

    /// Runs a refresh cycle and returns the resulting view.
    pub fn refresh(&mut self) -> Option<&DisplayTable> {
        self.controller.refresh(&self.response).ok()
    }

    /// Raw values of every row of every leaf, in display order.
    pub fn values(&self) -> Vec<Vec<CellValue>> {
        let Some(view) = self.controller.view() else {
            return Vec::new();
        };
        let Some(table) = &view.table else {
            return Vec::new();
        };
        table
            .leaves()
            .iter()
            .flat_map(|leaf| leaf.rows.iter().map(|r| r.values().cloned().collect()))
            .collect()
    }

    /// Column titles of the first leaf.
    pub fn titles(&self) -> Vec<String> {
        self.controller
            .view()
            .and_then(|v| v.table.as_ref())
            .and_then(|t| t.first_leaf())
            .map(|leaf| leaf.columns.iter().map(|c| c.title.clone()).collect())
            .unwrap_or_default()
    }
}

pub fn response(json: &str) -> TabifiedResponse {
    serde_json::from_str(json).expect("fixture response")
}

/// Five columns: country, city, hits, bytes, users.
pub fn sample_response() -> TabifiedResponse {
    response(
        r#"{
            "columns": [
                {"id": "col-0", "name": "country", "aggregationKind": "bucket"},
                {"id": "col-1", "name": "city", "aggregationKind": "bucket"},
                {"id": "col-2", "name": "hits", "aggregationKind": "metric"},
                {"id": "col-3", "name": "bytes", "aggregationKind": "metric"},
                {"id": "col-4", "name": "users", "aggregationKind": "metric"}
            ],
            "rows": [
                ["France", "Paris", 10, 1000, 3],
                ["France", "Lyon", 20, 500, 5],
                ["Germany", "Berlin", 0, 250, 0],
                ["Spain", "Madrid", 5, 750, 2]
            ],
            "totalHits": 35
        }"#,
    )
}

/// country (split-cols, last bucket) after city, one metric.
pub fn split_cols_response() -> TabifiedResponse {
    response(
        r#"{
            "columns": [
                {"id": "col-0", "name": "city", "aggregationKind": "bucket"},
                {"id": "col-1", "name": "os", "aggregationKind": "bucket", "schema": "splitcols"},
                {"id": "col-2", "name": "hits", "aggregationKind": "metric"}
            ],
            "rows": [
                ["Paris", "linux", 4],
                ["Paris", "mac", 6],
                ["Lyon", "linux", 1]
            ],
            "totalHits": 11
        }"#,
    )
}

pub fn spec(label: &str, formula: &str) -> ComputedColumnSpec {
    ComputedColumnSpec::new(label, formula)
}

pub fn t(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

pub fn n(v: f64) -> CellValue {
    CellValue::Number(v)
}
