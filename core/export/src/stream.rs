//! FILENAME: core/export/src/stream.rs
//! Bounded and full (paginated) CSV export.
//!
//! A bounded export writes the rows already loaded in one save. A full
//! export streams every hit of the query:
//! 1. The loaded response goes through the pipeline; header + rows form the
//!    first buffer
//! 2. The sink is opened with a size estimate of
//!    `buffer_len * total_hits / loaded_rows`
//! 3. Pages of at most `csv_max_page_size` rows are fetched after the last
//!    sort cursor, pushed through the pipeline without header and written,
//!    until no hits remain
//! 4. The totals row, if requested, closes the file
//!
//! Each fetch and the sink opening are suspension points. Cancellation or a
//! failed write aborts the sink; nothing is left half-closed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use engine::{FormatterCache, RawRow, TabifiedResponse};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use table_engine::{DisplayTable, FormulaCache, TablePipeline, VisParams};

use crate::csv::{export_file_name, CsvAssembler, CsvOptions};
use crate::error::ExportError;

// ============================================================================
// PAGINATION CONTRACT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// Sort cursor of the last row already exported.
    pub search_after: Option<serde_json::Value>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub last_sort_cursor: Option<serde_json::Value>,
}

/// Fetches further pages of the query being exported.
#[async_trait]
pub trait PageSource: Send {
    async fn fetch_page(&mut self, request: PageRequest) -> Result<Page, ExportError>;
}

/// Destination of the exported bytes.
#[async_trait]
pub trait ExportSink: Send {
    async fn open(&mut self, file_name: &str, size_hint: u64) -> Result<(), ExportError>;
    async fn write(&mut self, bytes: &[u8]) -> Result<(), ExportError>;
    async fn close(&mut self) -> Result<(), ExportError>;
    /// Releases the stream without completing it.
    async fn abort(&mut self);
}

// ============================================================================
// SINKS
// ============================================================================

/// Collects the export in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub file_name: Option<String>,
    pub size_hint: Option<u64>,
    pub data: Vec<u8>,
    pub writes: usize,
    pub closed: bool,
    pub aborted: bool,
}

#[async_trait]
impl ExportSink for MemorySink {
    async fn open(&mut self, file_name: &str, size_hint: u64) -> Result<(), ExportError> {
        self.file_name = Some(file_name.to_string());
        self.size_hint = Some(size_hint);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.data.extend_from_slice(bytes);
        self.writes += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ExportError> {
        self.closed = true;
        Ok(())
    }

    async fn abort(&mut self) {
        self.aborted = true;
        self.data.clear();
    }
}

/// Writes the export into a directory; an aborted export leaves no file.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    path: Option<PathBuf>,
    file: Option<File>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileSink {
            dir: dir.into(),
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl ExportSink for FileSink {
    async fn open(&mut self, file_name: &str, size_hint: u64) -> Result<(), ExportError> {
        let path = self.dir.join(file_name);
        let file = File::create(&path).await?;
        debug!(target: "EXPORT", "opened {} (estimated {} bytes)", path.display(), size_hint);
        self.path = Some(path);
        self.file = Some(file);
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ExportError::Write("stream is not open".to_string()))?;
        file.write_all(bytes)
            .await
            .map_err(|e| ExportError::Write(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ExportError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }

    async fn abort(&mut self) {
        self.file = None;
        if let Some(path) = self.path.take() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(target: "EXPORT", "could not remove {}: {}", path.display(), e);
            }
        }
    }
}

// ============================================================================
// BOUNDED EXPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct CsvFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Serializes the rows of a display table in one buffer.
pub fn export_display(display: &DisplayTable, params: &VisParams) -> Result<CsvFile, ExportError> {
    let options = CsvOptions::from_params(params)?;
    let mut assembler = CsvAssembler::new(options);
    let mut text = String::new();

    let title = display
        .table
        .as_ref()
        .and_then(|t| t.first_leaf())
        .and_then(|leaf| leaf.title.clone());

    if let Some(table) = &display.table {
        assembler.set_layout(table);
        text.push_str(&assembler.header());
        text.push_str(&assembler.rows(table, &display.formatters));
        if assembler.options().with_totals {
            text.push_str(&assembler.totals(display.total_hits as f64, &display.formatters));
        }
    }

    info!(target: "EXPORT", "bounded export: {} rows", assembler.rows_written());
    Ok(CsvFile {
        file_name: export_file_name(params, title.as_deref()),
        bytes: assembler.options().encode(&text),
    })
}

/// Saves a bounded export through a sink.
pub async fn save_display<S: ExportSink>(
    display: &DisplayTable,
    params: &VisParams,
    sink: &mut S,
) -> Result<CsvFile, ExportError> {
    let file = export_display(display, params)?;
    sink.open(&file.file_name, file.bytes.len() as u64).await?;
    if let Err(e) = sink.write(&file.bytes).await {
        sink.abort().await;
        return Err(e);
    }
    sink.close().await?;
    Ok(file)
}

// ============================================================================
// FULL EXPORT
// ============================================================================

/// Cursor and counters owned by one full export.
#[derive(Debug, Clone)]
pub struct ExportState {
    pub total_hits: u64,
    pub search_after: Option<serde_json::Value>,
    pub remaining: u64,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub file_name: String,
    pub rows_written: usize,
    pub pages_fetched: usize,
    pub estimated_size: u64,
}

pub struct FullExport<'a, P: PageSource, S: ExportSink> {
    params: &'a VisParams,
    initial: &'a TabifiedResponse,
    source: P,
    sink: S,
    cancel: CancellationToken,
    title: Option<String>,
}

impl<'a, P: PageSource, S: ExportSink> FullExport<'a, P, S> {
    pub fn new(params: &'a VisParams, initial: &'a TabifiedResponse, source: P, sink: S) -> Self {
        FullExport {
            params,
            initial,
            source,
            sink,
            cancel: CancellationToken::new(),
            title: None,
        }
    }

    /// Shares a cancellation token with the caller.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs the export to completion, cancellation or the first failure.
    pub async fn run(&mut self) -> Result<ExportSummary, ExportError> {
        match self.stream().await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                warn!(target: "EXPORT", "full export aborted: {}", e);
                self.sink.abort().await;
                Err(e)
            }
        }
    }

    async fn stream(&mut self) -> Result<ExportSummary, ExportError> {
        let params = self.params;
        let mut cache = FormulaCache::new();
        let mut assembler = CsvAssembler::new(CsvOptions::from_params(params)?);

        let first = render_page(params, &mut cache, &mut assembler, self.initial)?;
        let loaded = self.initial.rows.len() as u64;
        let mut state = ExportState {
            total_hits: self.initial.total_hits,
            search_after: self.initial.rows.last().and_then(RawRow::sort).cloned(),
            remaining: self.initial.total_hits.saturating_sub(loaded),
            cancel: self.cancel.clone(),
        };

        let first_bytes = assembler.options().encode(&first);
        let estimated_size = if loaded == 0 {
            first_bytes.len() as u64
        } else {
            first_bytes.len() as u64 * state.total_hits / loaded
        };
        let file_name = export_file_name(params, self.title.as_deref());

        self.check_cancelled(&state)?;
        self.sink.open(&file_name, estimated_size).await?;
        self.check_cancelled(&state)?;
        self.sink.write(&first_bytes).await?;
        info!(
            target: "EXPORT",
            "full export of {} hits to {} (estimated {} bytes)",
            state.total_hits,
            file_name,
            estimated_size
        );

        let page_size = params.csv_max_page_size.max(1) as u64;
        let mut pages_fetched = 0;
        while state.remaining > 0 {
            self.check_cancelled(&state)?;
            let request = PageRequest {
                search_after: state.search_after.clone(),
                size: state.remaining.min(page_size) as usize,
            };
            debug!(target: "EXPORT", "fetching {} rows, {} remaining", request.size, state.remaining);
            let page = self.source.fetch_page(request).await?;
            pages_fetched += 1;
            self.check_cancelled(&state)?;

            if page.rows.is_empty() {
                warn!(target: "EXPORT", "source ran dry with {} hits remaining", state.remaining);
                break;
            }

            let received = page.rows.len() as u64;
            state.search_after = page
                .last_sort_cursor
                .clone()
                .or_else(|| page.rows.last().and_then(RawRow::sort).cloned());
            let response = TabifiedResponse {
                columns: self.initial.columns.clone(),
                rows: page.rows,
                total_hits: page.total_hits.max(state.total_hits),
                metrics_at_all_levels: self.initial.metrics_at_all_levels,
            };
            let text = render_page(params, &mut cache, &mut assembler, &response)?;
            self.sink.write(&assembler.options().encode(&text)).await?;
            state.remaining = state.remaining.saturating_sub(received);
        }

        if assembler.options().with_totals && assembler.has_layout() {
            let totals = assembler.totals(state.total_hits as f64, &FormatterCache::new());
            self.sink.write(&assembler.options().encode(&totals)).await?;
        }
        self.sink.close().await?;

        info!(
            target: "EXPORT",
            "full export done: {} rows in {} pages",
            assembler.rows_written(),
            pages_fetched
        );
        Ok(ExportSummary {
            file_name,
            rows_written: assembler.rows_written(),
            pages_fetched,
            estimated_size,
        })
    }

    fn check_cancelled(&self, state: &ExportState) -> Result<(), ExportError> {
        if state.cancel.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Runs one response through the pipeline and returns its CSV text. The
/// first response also fixes the layout and contributes the header.
fn render_page(
    params: &VisParams,
    cache: &mut FormulaCache,
    assembler: &mut CsvAssembler,
    response: &TabifiedResponse,
) -> Result<String, ExportError> {
    let formatters = FormatterCache::new();
    let processed = TablePipeline::new(params, cache).process(response, &formatters, false)?;
    let Some(table) = processed.table else {
        return Ok(String::new());
    };

    let mut text = String::new();
    if !assembler.has_layout() {
        assembler.set_layout(&table);
        text.push_str(&assembler.header());
    }
    text.push_str(&assembler.rows(&table, &formatters));
    Ok(text)
}
