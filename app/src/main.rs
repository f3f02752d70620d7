//! FILENAME: app/src/main.rs
// PURPOSE: Command-line entry point.
// FORMAT: seq|level|category|message on stderr, command output on stdout

fn main() {
    if let Err(e) = app_lib::run() {
        app_lib::log_error!("APP", "{}", e);
        std::process::exit(1);
    }
}
