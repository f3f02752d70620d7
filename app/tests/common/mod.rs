//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for command-line host integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use app_lib::{ExportArgs, InputArgs, RenderArgs};
use tempfile::TempDir;

/// A scratch directory holding the input files of one test.
pub struct TestHarness {
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a harness with the sample response written to `response.json`.
    pub fn new() -> Self {
        let harness = TestHarness {
            dir: tempfile::tempdir().expect("temp dir"),
        };
        harness.write("response.json", SAMPLE_RESPONSE);
        harness
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn with_params(self, json: &str) -> Self {
        self.write("params.json", json);
        self
    }

    pub fn input(&self) -> InputArgs {
        let params = self.path("params.json");
        InputArgs {
            response: self.path("response.json"),
            params: params.exists().then_some(params),
            filter: None,
        }
    }

    pub fn render_args(&self) -> RenderArgs {
        RenderArgs {
            input: self.input(),
            output: None,
            pretty: false,
        }
    }

    pub fn export_args(&self) -> ExportArgs {
        ExportArgs {
            input: self.input(),
            full: false,
            pages: None,
            out_dir: self.dir.path().to_path_buf(),
            page_size: None,
            encoding: None,
        }
    }

    pub fn read_lines(&self, path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .expect("read output")
            .split("\r\n")
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Two of four hits loaded: country, city, hits.
pub const SAMPLE_RESPONSE: &str = r#"{
    "columns": [
        {"id": "col-0", "name": "country", "aggregationKind": "bucket"},
        {"id": "col-1", "name": "city", "aggregationKind": "bucket"},
        {"id": "col-2", "name": "hits", "aggregationKind": "metric"}
    ],
    "rows": [
        {"values": ["France", "Paris", 10], "sort": [1]},
        {"values": ["France", "Lyon", 20], "sort": [2]}
    ],
    "totalHits": 4
}"#;

/// The two remaining hits, in one page.
pub const SAMPLE_PAGES: &str = r#"[
    {
        "rows": [
            {"values": ["Germany", "Berlin", 0], "sort": [3]},
            {"values": ["Spain", "Madrid", 5], "sort": [4]}
        ],
        "totalHits": 4
    }
]"#;
