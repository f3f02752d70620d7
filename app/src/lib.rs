//! FILENAME: app/src/lib.rs
// PURPOSE: Command-line host for the enhanced table pipeline.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

use clap::Parser;
use tokio_util::sync::CancellationToken;

pub use cli::{Cli, Command, ExportArgs, InputArgs, LogLevelArg, RenderArgs};
pub use error::AppError;

/// Parses the process arguments and runs the selected command.
pub fn run() -> Result<(), AppError> {
    run_with(Cli::parse())
}

pub fn run_with(cli: Cli) -> Result<(), AppError> {
    logging::init(cli.log_level.into(), cli.log_file.as_deref())?;
    log_info!("APP", "enhanced-table {}", env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Command::Render(args) => {
            let rendered = commands::render::render(args)?;
            commands::render::write_view(&rendered, args.output.as_deref(), args.pretty)?;
        }
        Command::Export(args) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| AppError::Runtime(e.to_string()))?;
            let outcome = runtime.block_on(async {
                let cancel = CancellationToken::new();
                let interrupt = cancel_on_ctrl_c(cancel.clone());
                let result = commands::export::run_export(args, cancel).await;
                interrupt.abort();
                result
            })?;
            println!("{}", outcome.path.display());
        }
    }
    Ok(())
}

/// Cancels `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log_warn!("APP", "interrupted, cancelling export");
            token.cancel();
        }
    })
}
