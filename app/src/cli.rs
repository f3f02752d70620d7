//! FILENAME: app/src/cli.rs
// PURPOSE: Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "enhanced-table",
    version,
    about = "Render and export enhanced tables from tabified query responses"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level for the unified log.
    #[arg(long = "log-level", value_enum, default_value_t = LogLevelArg::Info, global = true)]
    pub log_level: LogLevelArg,

    /// Mirror log lines to a file.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline and print the rendered table as JSON.
    Render(RenderArgs),

    /// Write the table as CSV.
    Export(ExportArgs),
}

/// Inputs shared by every command.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Tabified response JSON (`columns`, `rows`, `totalHits`).
    #[arg(long, value_name = "PATH")]
    pub response: PathBuf,

    /// Visualization parameters JSON; missing fields take their defaults.
    #[arg(long, value_name = "PATH")]
    pub params: Option<PathBuf>,

    /// Filter bar input. Turns the filter bar on.
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write the JSON here instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Export every hit, fetching further pages from `--pages`.
    #[arg(long)]
    pub full: bool,

    /// JSON array of pages (`rows`, `totalHits`, `lastSortCursor`) served in
    /// order after the loaded rows.
    #[arg(long, value_name = "PATH")]
    pub pages: Option<PathBuf>,

    /// Directory the CSV file is written to.
    #[arg(long = "out-dir", value_name = "DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Overrides `csvMaxPageSize`.
    #[arg(long = "page-size")]
    pub page_size: Option<usize>,

    /// Overrides `csvEncoding`.
    #[arg(long)]
    pub encoding: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Off => LevelFilter::Off,
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_export() {
        let cli = Cli::try_parse_from([
            "enhanced-table",
            "export",
            "--response",
            "r.json",
            "--full",
            "--pages",
            "p.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevelArg::Debug);
        match cli.command {
            Command::Export(args) => {
                assert!(args.full);
                assert_eq!(args.out_dir, PathBuf::from("."));
                assert_eq!(args.pages, Some(PathBuf::from("p.json")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn response_is_required() {
        assert!(Cli::try_parse_from(["enhanced-table", "render"]).is_err());
    }
}
