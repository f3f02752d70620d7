//! FILENAME: app/src/commands/export.rs
// PURPOSE: The `export` command: bounded or full CSV export to a directory.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use engine::RawRow;
use export::{save_display, ExportError, FileSink, FullExport, Page, PageRequest, PageSource};
use table_engine::TableController;
use tokio_util::sync::CancellationToken;

use crate::cli::ExportArgs;
use crate::commands::refresh;
use crate::config::{export_params, load_pages, load_response};
use crate::error::AppError;
use crate::{log_debug, log_enter_info, log_exit_info};

/// Serves the rows of a page file through the pagination contract. Rows
/// are re-cut to the requested page size.
pub struct PageFileSource {
    rows: VecDeque<RawRow>,
    total_hits: u64,
}

impl PageFileSource {
    pub fn new(pages: Vec<Page>) -> Self {
        let total_hits = pages.iter().map(|p| p.total_hits).max().unwrap_or(0);
        PageFileSource {
            rows: pages.into_iter().flat_map(|p| p.rows).collect(),
            total_hits,
        }
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        Ok(Self::new(load_pages(path)?))
    }

    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl PageSource for PageFileSource {
    async fn fetch_page(&mut self, request: PageRequest) -> Result<Page, ExportError> {
        let take = request.size.min(self.rows.len());
        let rows: Vec<RawRow> = self.rows.drain(..take).collect();
        log_debug!(
            "CMD",
            "page after {:?}: {} rows, {} left",
            request.search_after,
            rows.len(),
            self.rows.len()
        );
        Ok(Page {
            last_sort_cursor: rows.last().and_then(RawRow::sort).cloned(),
            rows,
            total_hits: self.total_hits,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub rows_written: usize,
}

pub async fn run_export(args: &ExportArgs, cancel: CancellationToken) -> Result<ExportOutcome, AppError> {
    log_enter_info!("CMD", "export", "{:?} full={}", args.input.response, args.full);

    let params = export_params(args)?;
    let response = load_response(&args.input.response)?;

    let outcome = if params.csv_full_export {
        let pages = args
            .pages
            .as_deref()
            .ok_or_else(|| AppError::Configuration("a full export needs --pages".to_string()))?;
        let source = PageFileSource::load(pages)?;
        let mut full = FullExport::new(&params, &response, source, FileSink::new(&args.out_dir))
            .with_cancel(cancel);
        let summary = full.run().await?;
        ExportOutcome {
            path: args.out_dir.join(&summary.file_name),
            rows_written: summary.rows_written,
        }
    } else {
        let mut controller = TableController::new(params.clone());
        let display = refresh(&mut controller, &response, args.input.filter.as_deref())?;
        let rows_written = display.table.as_ref().map_or(0, |t| t.row_count());
        let mut sink = FileSink::new(&args.out_dir);
        let file = save_display(display, &params, &mut sink).await?;
        ExportOutcome {
            path: args.out_dir.join(file.file_name),
            rows_written,
        }
    };

    log_exit_info!("CMD", "export", "{} rows to {:?}", outcome.rows_written, outcome.path);
    Ok(outcome)
}
