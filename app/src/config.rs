//! FILENAME: app/src/config.rs
// PURPOSE: Loading responses, parameters and page files.

use std::path::Path;

use engine::TabifiedResponse;
use export::Page;
use serde::de::DeserializeOwned;
use table_engine::{parse_params, PipelineError, VisParams};

use crate::cli::{ExportArgs, InputArgs};
use crate::error::AppError;
use crate::log_debug;

fn read_text(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    serde_json::from_str(&read_text(path)?).map_err(|source| AppError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parameters from a file, or the defaults.
pub fn load_params(path: Option<&Path>) -> Result<VisParams, AppError> {
    let Some(path) = path else {
        return Ok(VisParams::default());
    };
    match parse_params(&read_text(path)?) {
        Ok(params) => {
            log_debug!("CONFIG", "loaded parameters from {:?}", path);
            Ok(params)
        }
        Err(PipelineError::Json(source)) => Err(AppError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) => Err(e.into()),
    }
}

pub fn load_response(path: &Path) -> Result<TabifiedResponse, AppError> {
    let response: TabifiedResponse = read_json(path)?;
    log_debug!(
        "CONFIG",
        "loaded response from {:?}: {} columns, {} rows, {} hits",
        path,
        response.columns.len(),
        response.rows.len(),
        response.total_hits
    );
    Ok(response)
}

pub fn load_pages(path: &Path) -> Result<Vec<Page>, AppError> {
    read_json(path)
}

/// Parameters for a command, with command-line overrides applied.
pub fn params_for(input: &InputArgs) -> Result<VisParams, AppError> {
    let mut params = load_params(input.params.as_deref())?;
    if input.filter.is_some() {
        params.show_filter_bar = true;
    }
    Ok(params)
}

pub fn export_params(args: &ExportArgs) -> Result<VisParams, AppError> {
    let mut params = params_for(&args.input)?;
    if let Some(size) = args.page_size {
        params.csv_max_page_size = size;
    }
    if let Some(encoding) = &args.encoding {
        params.csv_encoding = encoding.clone();
    }
    if args.full {
        params.csv_full_export = true;
    }
    Ok(params)
}
