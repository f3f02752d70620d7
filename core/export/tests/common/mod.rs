//! FILENAME: tests/common/mod.rs
//! Page sources, sinks and fixtures for export integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use engine::{CellValue, RawRow, TabifiedResponse};
use export::{ExportError, ExportSink, Page, PageRequest, PageSource};
use tokio_util::sync::CancellationToken;

/// Serves pages out of a fixed list of rows, recording every request.
pub struct VecSource {
    pub rows: Vec<RawRow>,
    pub offset: usize,
    pub total_hits: u64,
    pub requests: Vec<PageRequest>,
    /// Cancelled while serving this (1-based) request.
    pub cancel_on: Option<(usize, CancellationToken)>,
    /// Fails this (1-based) request.
    pub fail_on: Option<usize>,
}

impl VecSource {
    /// Serves `rows`, starting after the `loaded` rows already shown.
    pub fn new(rows: Vec<RawRow>, loaded: usize) -> Self {
        VecSource {
            total_hits: rows.len() as u64,
            rows,
            offset: loaded,
            requests: Vec::new(),
            cancel_on: None,
            fail_on: None,
        }
    }
}

#[async_trait]
impl PageSource for VecSource {
    async fn fetch_page(&mut self, request: PageRequest) -> Result<Page, ExportError> {
        self.requests.push(request.clone());
        let n = self.requests.len();
        if let Some((at, token)) = &self.cancel_on {
            if *at == n {
                token.cancel();
            }
        }
        if self.fail_on == Some(n) {
            return Err(ExportError::Source("connection reset".into()));
        }

        let end = (self.offset + request.size).min(self.rows.len());
        let rows = self.rows[self.offset..end].to_vec();
        self.offset = end;
        Ok(Page {
            rows,
            total_hits: self.total_hits,
            last_sort_cursor: None,
        })
    }
}

/// Accepts `allowed_writes` writes, then fails.
#[derive(Default)]
pub struct FailingSink {
    pub allowed_writes: usize,
    pub writes: usize,
    pub aborted: bool,
    pub closed: bool,
}

#[async_trait]
impl ExportSink for FailingSink {
    async fn open(&mut self, _file_name: &str, _size_hint: u64) -> Result<(), ExportError> {
        Ok(())
    }

    async fn write(&mut self, _bytes: &[u8]) -> Result<(), ExportError> {
        if self.writes == self.allowed_writes {
            return Err(ExportError::Write("disk full".into()));
        }
        self.writes += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ExportError> {
        self.closed = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.aborted = true;
    }
}

/// One bucket (`id`) and one metric (`hits`), `count` rows with a sort
/// cursor each.
pub fn numbered_rows(count: usize) -> Vec<RawRow> {
    (0..count)
        .map(|i| RawRow::WithSort {
            values: vec![CellValue::Number(i as f64), CellValue::Number(1.0)],
            sort: Some(serde_json::json!([i])),
        })
        .collect()
}

/// The first `loaded` rows of `rows` as the loaded response.
pub fn numbered_response(rows: &[RawRow], loaded: usize) -> TabifiedResponse {
    let mut response: TabifiedResponse = serde_json::from_str(
        r#"{
            "columns": [
                {"id": "col-0", "name": "id", "aggregationKind": "bucket"},
                {"id": "col-1", "name": "hits", "aggregationKind": "metric"}
            ]
        }"#,
    )
    .expect("fixture response");
    response.rows = rows[..loaded].to_vec();
    response.total_hits = rows.len() as u64;
    response
}

/// Four rows of country, city, hits, bytes.
pub fn sample_rows() -> Vec<RawRow> {
    serde_json::from_str(
        r#"[
            {"values": ["France", "Paris", 10, 1000], "sort": [1]},
            {"values": ["France", "Lyon", 20, 500], "sort": [2]},
            {"values": ["Germany", "Berlin", 0, 250], "sort": [3]},
            {"values": ["Spain", "Madrid", 5, 750], "sort": [4]}
        ]"#,
    )
    .expect("fixture rows")
}

pub fn sample_response(loaded: usize) -> TabifiedResponse {
    let rows = sample_rows();
    let mut response: TabifiedResponse = serde_json::from_str(
        r#"{
            "columns": [
                {"id": "col-0", "name": "country", "aggregationKind": "bucket"},
                {"id": "col-1", "name": "city", "aggregationKind": "bucket"},
                {"id": "col-2", "name": "hits", "aggregationKind": "metric"},
                {"id": "col-3", "name": "bytes", "aggregationKind": "metric"}
            ]
        }"#,
    )
    .expect("fixture response");
    response.total_hits = rows.len() as u64;
    response.rows = rows[..loaded].to_vec();
    response
}

pub fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .split("\r\n")
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
