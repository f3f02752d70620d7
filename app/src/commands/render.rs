//! FILENAME: app/src/commands/render.rs
// PURPOSE: The `render` command: pipeline output as JSON.

use std::io::Write;
use std::path::Path;

use table_engine::{RenderedView, TableController};

use crate::cli::RenderArgs;
use crate::commands::refresh;
use crate::config::{load_response, params_for};
use crate::error::AppError;
use crate::{log_enter_info, log_exit_info, log_warn};

pub fn render(args: &RenderArgs) -> Result<RenderedView, AppError> {
    log_enter_info!("CMD", "render", "{:?}", args.input.response);

    let params = params_for(&args.input)?;
    let response = load_response(&args.input.response)?;
    let mut controller = TableController::new(params);
    let view = refresh(&mut controller, &response, args.input.filter.as_deref())?;
    let rendered = view.render();

    for error in &rendered.errors {
        log_warn!("CMD", "formula error: {}", error);
    }
    log_exit_info!(
        "CMD",
        "render",
        "{} tables, {} rows",
        rendered.tables.len(),
        rendered.tables.iter().map(|t| t.rows.len()).sum::<usize>()
    );
    Ok(rendered)
}

/// Writes the rendered view to `output`, or stdout.
pub fn write_view(rendered: &RenderedView, output: Option<&Path>, pretty: bool) -> Result<(), AppError> {
    let json = if pretty {
        serde_json::to_string_pretty(rendered)
    } else {
        serde_json::to_string(rendered)
    }
    .map_err(|e| AppError::Runtime(e.to_string()))?;

    match output {
        Some(path) => std::fs::write(path, json)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
